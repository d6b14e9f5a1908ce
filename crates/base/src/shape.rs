use {crate::Vec2, std::fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Overflow,
    Rank { needed: usize, got: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Overflow => write!(f, "shape dimensions overflow when multiplied"),
            ShapeError::Rank { needed, got } => {
                write!(f, "shape has {got} dimensions, needs at least {needed}")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// Number of elements described by `shape`. An empty shape is a scalar.
pub fn element_count(shape: &[usize]) -> Result<usize, ShapeError> {
    shape.iter().try_fold(1usize, |product, &dim| {
        product.checked_mul(dim).ok_or(ShapeError::Overflow)
    })
}

/// Bytes needed for `shape` with elements of `element_size` bytes.
pub fn byte_count(shape: &[usize], element_size: usize) -> Result<usize, ShapeError> {
    element_count(shape)?
        .checked_mul(element_size)
        .ok_or(ShapeError::Overflow)
}

/// Width and height of an NHWC shape.
pub fn nhwc_size(shape: &[usize]) -> Result<Vec2<usize>, ShapeError> {
    match shape {
        [_, h, w, ..] => Ok(Vec2::new(*w, *h)),
        _ => Err(ShapeError::Rank {
            needed: 3,
            got: shape.len(),
        }),
    }
}

/// Channel count of an NHWC shape, 1 when the channel axis is absent.
pub fn nhwc_channels(shape: &[usize]) -> usize {
    shape.get(3).copied().unwrap_or(1)
}
