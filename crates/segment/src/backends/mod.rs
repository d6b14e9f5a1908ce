pub mod tflite;

pub use self::tflite::TfLiteRuntime;
