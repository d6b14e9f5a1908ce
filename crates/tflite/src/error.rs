use std::fmt;

/// Error type for TFLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum TfLiteError {
    /// The runtime shared library could not be opened.
    Library(String),
    /// A required symbol is missing from the runtime library.
    Symbol(String),
    /// An experimental entry point is not exported by this runtime build.
    Unsupported(String),
    /// A call returned something other than `kTfLiteOk`.
    Status { call: &'static str, status: i32 },
    /// A constructor returned null.
    Null(&'static str),
    InvalidPath(String),
    IndexOutOfRange { index: usize, count: usize },
}

impl fmt::Display for TfLiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TfLiteError::Library(msg) => write!(f, "failed to load TFLite runtime: {msg}"),
            TfLiteError::Symbol(msg) => write!(f, "failed to resolve TFLite symbol: {msg}"),
            TfLiteError::Unsupported(name) => {
                write!(f, "TFLite runtime does not export {name}")
            }
            TfLiteError::Status { call, status } => {
                write!(f, "{call} failed with status {status}")
            }
            TfLiteError::Null(call) => write!(f, "{call} returned null"),
            TfLiteError::InvalidPath(path) => write!(f, "invalid path: {path}"),
            TfLiteError::IndexOutOfRange { index, count } => {
                write!(f, "tensor index {index} out of range ({count} tensors)")
            }
        }
    }
}

impl std::error::Error for TfLiteError {}

pub type Result<T> = std::result::Result<T, TfLiteError>;

pub(crate) fn check_status(call: &'static str, status: crate::ffi::TfLiteStatus) -> Result<()> {
    if status == crate::ffi::TFLITE_OK {
        Ok(())
    } else {
        Err(TfLiteError::Status { call, status })
    }
}
