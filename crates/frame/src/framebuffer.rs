use {
    crate::FrameError,
    base::{Vec2, byte_count},
    crates_image::{RgbImage, imageops::FilterType},
};

/// Bytes per pixel; frames are always packed RGB8.
pub const CHANNELS: usize = 3;

/// Dense RGB8 pixel buffer, rows top to bottom, `size.x * 3` bytes per row.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub size: Vec2<usize>,
    pub data: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(size: Vec2<usize>, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = byte_count(&[size.y, size.x], CHANNELS)?;
        if data.len() != expected {
            return Err(FrameError::Layout {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    /// Frame with every pixel set to `rgb`.
    pub fn filled(size: Vec2<usize>, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(size.area() * CHANNELS)
            .collect();
        Self { size, data }
    }

    pub fn width(&self) -> usize {
        self.size.x
    }

    pub fn height(&self) -> usize {
        self.size.y
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.size.x + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.size.x + x) * CHANNELS;
        self.data[i..i + CHANNELS].copy_from_slice(&rgb);
    }

    /// Resample to `size` with a triangle (bilinear) filter.
    pub fn resize(&self, size: Vec2<usize>) -> Result<FrameBuffer, FrameError> {
        if size == self.size {
            return Ok(self.clone());
        }
        let image = self.to_rgb_image()?;
        let resized =
            crates_image::imageops::resize(&image, size.x as u32, size.y as u32, FilterType::Triangle);
        FrameBuffer::new(size, resized.into_raw())
    }

    pub(crate) fn to_rgb_image(&self) -> Result<RgbImage, FrameError> {
        RgbImage::from_raw(self.size.x as u32, self.size.y as u32, self.data.clone()).ok_or(
            FrameError::Layout {
                expected: self.size.area() * CHANNELS,
                got: self.data.len(),
            },
        )
    }

    pub(crate) fn from_rgb_image(image: RgbImage) -> Result<FrameBuffer, FrameError> {
        let (width, height) = image.dimensions();
        FrameBuffer::new(Vec2::new(width as usize, height as usize), image.into_raw())
    }
}
