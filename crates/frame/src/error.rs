use std::fmt;

#[derive(Debug)]
pub enum FrameError {
    Decode(String),
    Encode(String),
    Io(String),
    Layout { expected: usize, got: usize },
    Shape(base::ShapeError),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Decode(msg) => write!(f, "decode error: {msg}"),
            FrameError::Encode(msg) => write!(f, "encode error: {msg}"),
            FrameError::Io(msg) => write!(f, "io error: {msg}"),
            FrameError::Layout { expected, got } => {
                write!(f, "frame layout error: expected {expected} bytes, got {got}")
            }
            FrameError::Shape(err) => write!(f, "frame shape error: {err}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<crates_image::ImageError> for FrameError {
    fn from(err: crates_image::ImageError) -> Self {
        FrameError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Io(err.to_string())
    }
}

impl From<base::ShapeError> for FrameError {
    fn from(err: base::ShapeError) -> Self {
        FrameError::Shape(err)
    }
}
