use {
    crate::{ClassMap, SegmentError},
    frame::{CHANNELS, FrameBuffer},
};

/// Synthetic color of class `id`: `(10 id, 20 id, 30 id)` modulo 256.
pub fn class_color(id: i32) -> [u8; 3] {
    [
        id.wrapping_mul(10) as u8,
        id.wrapping_mul(20) as u8,
        id.wrapping_mul(30) as u8,
    ]
}

/// Highest class map index read for an `in_w` by `in_h` map.
///
/// Rows are strided by `in_h`, so non-square maps read outside their last
/// row or skip cells.
fn max_index(in_w: usize, in_h: usize) -> usize {
    (in_h - 1) * in_h + (in_w - 1)
}

/// Blends the color of each pixel's class over `frame` in place.
///
/// `frame` is packed RGB8 of `out_w` by `out_h`, `classes` an `in_w` by
/// `in_h` map scaled over it by nearest cell. `alpha` weighs the original
/// pixel: 1 keeps the frame, 0 paints the flat class colors.
///
/// # Panics
/// When a size is zero, `alpha` is outside `[0, 1]`, `frame` is shorter than
/// `out_w * out_h * 3`, or `classes` is too short for the map size.
pub fn blend_segmentation_mask(
    frame: &mut [u8],
    classes: &[i32],
    in_w: usize,
    in_h: usize,
    out_w: usize,
    out_h: usize,
    alpha: f32,
) {
    assert!(
        in_w > 0 && in_h > 0 && out_w > 0 && out_h > 0,
        "empty size: map {in_w}x{in_h}, frame {out_w}x{out_h}"
    );
    assert!((0.0..=1.0).contains(&alpha), "alpha {alpha} outside [0, 1]");
    assert!(
        frame.len() >= out_w * out_h * CHANNELS,
        "frame holds {} bytes, {out_w}x{out_h} RGB needs {}",
        frame.len(),
        out_w * out_h * CHANNELS
    );
    assert!(
        max_index(in_w, in_h) < classes.len(),
        "class map of {} entries too short for {in_w}x{in_h}",
        classes.len()
    );

    let a = (alpha * 255.0).round() as u32;
    let sa = 255 - a;
    for h in 0..out_h {
        let sh = h * in_h / out_h;
        let row = &mut frame[h * out_w * CHANNELS..(h + 1) * out_w * CHANNELS];
        for (w, pixel) in row.chunks_exact_mut(CHANNELS).enumerate() {
            let sw = w * in_w / out_w;
            let color = class_color(classes[sh * in_h + sw]);
            for (value, mask) in pixel.iter_mut().zip(color) {
                *value = ((*value as u32 * a + mask as u32 * sa + 127) / 255) as u8;
            }
        }
    }
}

/// Paints class maps over frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationRenderer {
    alpha: f32,
}

impl SegmentationRenderer {
    pub const DEFAULT_ALPHA: f32 = 0.4;

    pub fn new(alpha: f32) -> Result<Self, SegmentError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(SegmentError::Config(format!("alpha {alpha} outside [0, 1]")));
        }
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Blends `map` over the whole of `frame`, whatever its resolution.
    pub fn render(&self, frame: &mut FrameBuffer, map: &ClassMap) -> Result<(), SegmentError> {
        if map.width == 0 || map.height == 0 {
            return Err(SegmentError::InvalidShape(format!(
                "class map is {}x{}",
                map.width, map.height
            )));
        }
        if max_index(map.width, map.height) >= map.classes.len() {
            return Err(SegmentError::InvalidShape(format!(
                "class map of {} entries too short for {}x{}",
                map.classes.len(),
                map.width,
                map.height
            )));
        }
        if frame.size.is_empty() {
            return Ok(());
        }
        let (out_w, out_h) = (frame.width(), frame.height());
        blend_segmentation_mask(
            &mut frame.data,
            &map.classes,
            map.width,
            map.height,
            out_w,
            out_h,
            self.alpha,
        );
        Ok(())
    }
}

impl Default for SegmentationRenderer {
    fn default() -> Self {
        Self {
            alpha: Self::DEFAULT_ALPHA,
        }
    }
}
