//! Minimal binding of the TensorFlow Lite C API.
//!
//! The runtime is opened at run time with `libloading` instead of being
//! linked, so binaries build on hosts without TFLite installed. Experimental
//! entry points (delegate application, custom tensor allocation) are optional
//! and reported as [`TfLiteError::Unsupported`] when missing.

pub mod error;
pub mod ffi;
pub mod interpreter;
pub mod model;
mod tflite;

pub use error::{Result, TfLiteError};
pub use interpreter::{Interpreter, TensorRef};
pub use model::Model;
pub use tflite::{DEFAULT_LIBRARY, TfLite};
