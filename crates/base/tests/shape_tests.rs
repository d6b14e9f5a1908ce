use base::{ShapeError, Vec2, byte_count, element_count, nhwc_channels, nhwc_size};

#[test]
fn test_element_count_scalar() {
    assert_eq!(element_count(&[]).unwrap(), 1);
    assert_eq!(element_count(&[1, 513, 513, 3]).unwrap(), 789_507);
}

#[test]
fn test_element_count_overflow() {
    assert_eq!(element_count(&[usize::MAX, 2]), Err(ShapeError::Overflow));
}

#[test]
fn test_byte_count() {
    assert_eq!(byte_count(&[1, 4, 4, 3], 4).unwrap(), 192);
    assert_eq!(byte_count(&[usize::MAX], 2), Err(ShapeError::Overflow));
}

#[test]
fn test_nhwc_size() {
    assert_eq!(nhwc_size(&[1, 257, 513, 3]).unwrap(), Vec2::new(513, 257));
    // class map outputs drop the channel axis
    assert_eq!(nhwc_size(&[1, 8, 16]).unwrap(), Vec2::new(16, 8));
    assert_eq!(
        nhwc_size(&[1, 8]),
        Err(ShapeError::Rank { needed: 3, got: 2 })
    );
}

#[test]
fn test_nhwc_channels() {
    assert_eq!(nhwc_channels(&[1, 4, 4, 3]), 3);
    assert_eq!(nhwc_channels(&[1, 4, 4]), 1);
}
