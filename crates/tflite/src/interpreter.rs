use {
    crate::{
        Model, TfLite,
        error::{TfLiteError, check_status},
        ffi,
    },
    std::{
        ffi::{CStr, c_void},
        ptr::NonNull,
        sync::Arc,
    },
};

/// Borrowed view of one interpreter tensor.
#[derive(Clone, Copy)]
pub struct TensorRef<'a> {
    tflite: &'a TfLite,
    tensor: *const ffi::TfLiteTensor,
}

impl<'a> TensorRef<'a> {
    pub fn name(&self) -> String {
        let ptr = unsafe { (self.tflite.tensor_name)(self.tensor) };
        if ptr.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
        }
    }

    pub fn element_type(&self) -> ffi::TfLiteType {
        unsafe { (self.tflite.tensor_type)(self.tensor) }
    }

    pub fn shape(&self) -> Vec<usize> {
        let ndim = unsafe { (self.tflite.tensor_num_dims)(self.tensor) }.max(0);
        (0..ndim)
            .map(|i| unsafe { (self.tflite.tensor_dim)(self.tensor, i) }.max(0) as usize)
            .collect()
    }

    pub fn byte_size(&self) -> usize {
        unsafe { (self.tflite.tensor_byte_size)(self.tensor) }
    }

    pub fn quantization(&self) -> ffi::TfLiteQuantizationParams {
        unsafe { (self.tflite.tensor_quantization_params)(self.tensor) }
    }

    /// Tensor payload, or an empty slice before allocation.
    pub fn data(&self) -> &'a [u8] {
        let ptr = unsafe { (self.tflite.tensor_data)(self.tensor) } as *const u8;
        if ptr.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(ptr, self.byte_size()) }
        }
    }
}

/// TFLite interpreter over a loaded model.
pub struct Interpreter {
    tflite: Arc<TfLite>,
    handle: *mut ffi::TfLiteInterpreter,
}

unsafe impl Send for Interpreter {}

impl Interpreter {
    /// Builds the interpreter. `num_threads` of `None` keeps the runtime default.
    pub fn new(model: &Model, num_threads: Option<usize>) -> Result<Self, TfLiteError> {
        let tflite = Arc::clone(&model.tflite);
        let options = unsafe { (tflite.interpreter_options_create)() };
        if options.is_null() {
            return Err(TfLiteError::Null("TfLiteInterpreterOptionsCreate"));
        }
        if let Some(threads) = num_threads {
            unsafe { (tflite.interpreter_options_set_num_threads)(options, threads as i32) };
        }
        let handle = unsafe { (tflite.interpreter_create)(model.handle, options) };
        unsafe { (tflite.interpreter_options_delete)(options) };
        if handle.is_null() {
            return Err(TfLiteError::Null("TfLiteInterpreterCreate"));
        }
        Ok(Interpreter { tflite, handle })
    }

    pub fn input_count(&self) -> usize {
        unsafe { (self.tflite.interpreter_get_input_tensor_count)(self.handle) }.max(0) as usize
    }

    pub fn output_count(&self) -> usize {
        unsafe { (self.tflite.interpreter_get_output_tensor_count)(self.handle) }.max(0) as usize
    }

    pub fn input(&self, index: usize) -> Result<TensorRef<'_>, TfLiteError> {
        let count = self.input_count();
        if index >= count {
            return Err(TfLiteError::IndexOutOfRange { index, count });
        }
        let tensor =
            unsafe { (self.tflite.interpreter_get_input_tensor)(self.handle, index as i32) };
        self.tensor_ref(tensor as *const _, "TfLiteInterpreterGetInputTensor")
    }

    pub fn output(&self, index: usize) -> Result<TensorRef<'_>, TfLiteError> {
        let count = self.output_count();
        if index >= count {
            return Err(TfLiteError::IndexOutOfRange { index, count });
        }
        let tensor =
            unsafe { (self.tflite.interpreter_get_output_tensor)(self.handle, index as i32) };
        self.tensor_ref(tensor, "TfLiteInterpreterGetOutputTensor")
    }

    fn tensor_ref(
        &self,
        tensor: *const ffi::TfLiteTensor,
        call: &'static str,
    ) -> Result<TensorRef<'_>, TfLiteError> {
        if tensor.is_null() {
            return Err(TfLiteError::Null(call));
        }
        Ok(TensorRef {
            tflite: &self.tflite,
            tensor,
        })
    }

    /// Mutable payload of input `index`.
    pub fn input_data_mut(&mut self, index: usize) -> Result<&mut [u8], TfLiteError> {
        let tensor = self.input(index)?;
        let len = tensor.byte_size();
        let ptr = unsafe { (self.tflite.tensor_data)(tensor.tensor) } as *mut u8;
        if ptr.is_null() {
            return Err(TfLiteError::Null("TfLiteTensorData"));
        }
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
    }

    pub fn allocate_tensors(&mut self) -> Result<(), TfLiteError> {
        let status = unsafe { (self.tflite.interpreter_allocate_tensors)(self.handle) };
        check_status("TfLiteInterpreterAllocateTensors", status)
    }

    pub fn invoke(&mut self) -> Result<(), TfLiteError> {
        let status = unsafe { (self.tflite.interpreter_invoke)(self.handle) };
        check_status("TfLiteInterpreterInvoke", status)
    }

    /// Hands the supported part of the graph to `delegate`.
    ///
    /// # Safety
    /// `delegate` must be a live delegate that outlives this interpreter.
    pub unsafe fn modify_graph_with_delegate(
        &mut self,
        delegate: *mut ffi::TfLiteDelegate,
    ) -> Result<(), TfLiteError> {
        let modify = self.tflite.interpreter_modify_graph_with_delegate.ok_or_else(|| {
            TfLiteError::Unsupported(ffi::symbol_name(
                ffi::SYM_INTERPRETER_MODIFY_GRAPH_WITH_DELEGATE,
            ))
        })?;
        let status = unsafe { modify(self.handle, delegate) };
        check_status("TfLiteInterpreterModifyGraphWithDelegate", status)
    }

    /// Graph-wide tensor index of input `index`.
    pub fn input_tensor_index(&self, index: usize) -> Result<i32, TfLiteError> {
        let indices = self.tflite.interpreter_input_tensor_indices.ok_or_else(|| {
            TfLiteError::Unsupported(ffi::symbol_name(ffi::SYM_INTERPRETER_INPUT_TENSOR_INDICES))
        })?;
        let count = self.input_count();
        self.tensor_index(unsafe { indices(self.handle) }, index, count)
    }

    /// Graph-wide tensor index of output `index`.
    pub fn output_tensor_index(&self, index: usize) -> Result<i32, TfLiteError> {
        let indices = self.tflite.interpreter_output_tensor_indices.ok_or_else(|| {
            TfLiteError::Unsupported(ffi::symbol_name(ffi::SYM_INTERPRETER_OUTPUT_TENSOR_INDICES))
        })?;
        let count = self.output_count();
        self.tensor_index(unsafe { indices(self.handle) }, index, count)
    }

    fn tensor_index(&self, indices: *const i32, index: usize, count: usize) -> Result<i32, TfLiteError> {
        if index >= count {
            return Err(TfLiteError::IndexOutOfRange { index, count });
        }
        if indices.is_null() {
            return Err(TfLiteError::Null("TfLiteInterpreterTensorIndices"));
        }
        Ok(unsafe { *indices.add(index) })
    }

    /// Points tensor `tensor_index` at caller-owned memory.
    ///
    /// # Safety
    /// `data` must stay valid for `bytes` bytes until the interpreter is dropped.
    pub unsafe fn set_custom_allocation(
        &mut self,
        tensor_index: i32,
        data: NonNull<u8>,
        bytes: usize,
    ) -> Result<(), TfLiteError> {
        let set = self.tflite.interpreter_set_custom_allocation_for_tensor.ok_or_else(|| {
            TfLiteError::Unsupported(ffi::symbol_name(
                ffi::SYM_INTERPRETER_SET_CUSTOM_ALLOCATION_FOR_TENSOR,
            ))
        })?;
        let allocation = ffi::TfLiteCustomAllocation {
            data: data.as_ptr() as *mut c_void,
            bytes,
        };
        let status = unsafe {
            set(
                self.handle,
                tensor_index,
                &allocation,
                ffi::CUSTOM_ALLOCATION_FLAGS_NONE,
            )
        };
        check_status("TfLiteInterpreterSetCustomAllocationForTensor", status)
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { (self.tflite.interpreter_delete)(self.handle) };
        }
    }
}
