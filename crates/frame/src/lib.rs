//! Frame I/O for the segmentation tools.
//!
//! Wraps the `image` crate: decode any supported file into a packed RGB8
//! [`FrameBuffer`], resample it, and encode it back to disk. The encoder is
//! picked from the output file extension.

pub mod error;
pub mod framebuffer;

pub use error::FrameError;
pub use crates_image::ImageFormat;
pub use framebuffer::{CHANNELS, FrameBuffer};

use {
    crates_image::ImageEncoder,
    std::path::{Path, PathBuf},
};

/// JPEG quality used by [`save_frame`].
pub const JPEG_QUALITY: u8 = 90;

/// Decodes an image from memory, converting whatever layout it has to RGB8.
pub fn decode_frame(data: &[u8]) -> Result<FrameBuffer, FrameError> {
    let image = crates_image::load_from_memory(data)?;
    FrameBuffer::from_rgb_image(image.to_rgb8())
}

pub fn load_frame_blocking(path: &Path) -> Result<FrameBuffer, FrameError> {
    let bytes = std::fs::read(path)
        .map_err(|e| FrameError::Io(format!("{}: {}", path.display(), e)))?;
    decode_frame(&bytes)
}

/// Encodes a frame in `format`.
pub fn encode_frame(frame: &FrameBuffer, format: ImageFormat) -> Result<Vec<u8>, FrameError> {
    let (width, height) = (frame.width() as u32, frame.height() as u32);
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            crates_image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
                .write_image(&frame.data, width, height, crates_image::ExtendedColorType::Rgb8)
                .map_err(|e| FrameError::Encode(e.to_string()))?;
        }
        other => {
            let image = frame.to_rgb_image()?;
            image
                .write_to(&mut std::io::Cursor::new(&mut buffer), other)
                .map_err(|e| FrameError::Encode(e.to_string()))?;
        }
    }
    Ok(buffer)
}

pub fn save_frame_blocking(frame: &FrameBuffer, path: &Path) -> Result<(), FrameError> {
    let format = ImageFormat::from_path(path).map_err(|_| {
        FrameError::Encode(format!("unsupported output extension: {}", path.display()))
    })?;
    let bytes = encode_frame(frame, format)?;
    std::fs::write(path, bytes).map_err(|e| FrameError::Io(format!("{}: {}", path.display(), e)))
}

/// Reads and decodes an image file on tokio's blocking thread pool.
pub async fn load_frame(path: impl Into<PathBuf>) -> Result<FrameBuffer, FrameError> {
    let path = path.into();
    tokio::task::spawn_blocking(move || load_frame_blocking(&path))
        .await
        .map_err(|e| FrameError::Decode(e.to_string()))?
}

/// Encodes and writes a frame on tokio's blocking thread pool.
pub async fn save_frame(frame: FrameBuffer, path: impl Into<PathBuf>) -> Result<(), FrameError> {
    let path = path.into();
    tokio::task::spawn_blocking(move || save_frame_blocking(&frame, &path))
        .await
        .map_err(|e| FrameError::Encode(e.to_string()))?
}
