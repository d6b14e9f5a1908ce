use {
    crate::{TfLite, error::TfLiteError, ffi},
    std::{ffi::CString, path::Path, sync::Arc},
};

/// Flatbuffer model loaded from disk.
pub struct Model {
    pub(crate) tflite: Arc<TfLite>,
    pub(crate) handle: *mut ffi::TfLiteModel,
}

unsafe impl Send for Model {}

impl Model {
    pub fn from_file(tflite: &Arc<TfLite>, path: impl AsRef<Path>) -> Result<Self, TfLiteError> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| TfLiteError::InvalidPath(path.display().to_string()))?;
        let c_path =
            CString::new(path_str).map_err(|_| TfLiteError::InvalidPath(path_str.to_string()))?;
        let handle = unsafe { (tflite.model_create_from_file)(c_path.as_ptr()) };
        if handle.is_null() {
            return Err(TfLiteError::Null("TfLiteModelCreateFromFile"));
        }
        Ok(Model {
            tflite: Arc::clone(tflite),
            handle,
        })
    }

    pub fn tflite(&self) -> &Arc<TfLite> {
        &self.tflite
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { (self.tflite.model_delete)(self.handle) };
        }
    }
}
