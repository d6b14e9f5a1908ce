use {
    crate::{error::TfLiteError, ffi},
    libloading::Library,
    std::{ffi::OsStr, sync::Arc},
};

/// Default runtime library name on Linux targets.
pub const DEFAULT_LIBRARY: &str = "libtensorflowlite_c.so";

/// Handle to a loaded TFLite C runtime.
///
/// Holds the library open for as long as any model or interpreter created
/// from it is alive; those keep an `Arc<TfLite>`.
pub struct TfLite {
    _library: Library,
    pub(crate) model_create_from_file: ffi::ModelCreateFromFileFn,
    pub(crate) model_delete: ffi::ModelDeleteFn,
    pub(crate) interpreter_options_create: ffi::InterpreterOptionsCreateFn,
    pub(crate) interpreter_options_delete: ffi::InterpreterOptionsDeleteFn,
    pub(crate) interpreter_options_set_num_threads: ffi::InterpreterOptionsSetNumThreadsFn,
    pub(crate) interpreter_create: ffi::InterpreterCreateFn,
    pub(crate) interpreter_delete: ffi::InterpreterDeleteFn,
    pub(crate) interpreter_get_input_tensor_count: ffi::InterpreterGetTensorCountFn,
    pub(crate) interpreter_get_output_tensor_count: ffi::InterpreterGetTensorCountFn,
    pub(crate) interpreter_get_input_tensor: ffi::InterpreterGetInputTensorFn,
    pub(crate) interpreter_get_output_tensor: ffi::InterpreterGetOutputTensorFn,
    pub(crate) interpreter_allocate_tensors: ffi::InterpreterAllocateTensorsFn,
    pub(crate) interpreter_invoke: ffi::InterpreterInvokeFn,
    pub(crate) tensor_type: ffi::TensorTypeFn,
    pub(crate) tensor_num_dims: ffi::TensorNumDimsFn,
    pub(crate) tensor_dim: ffi::TensorDimFn,
    pub(crate) tensor_byte_size: ffi::TensorByteSizeFn,
    pub(crate) tensor_data: ffi::TensorDataFn,
    pub(crate) tensor_name: ffi::TensorNameFn,
    pub(crate) tensor_quantization_params: ffi::TensorQuantizationParamsFn,
    // experimental, absent from some builds
    pub(crate) interpreter_modify_graph_with_delegate:
        Option<ffi::InterpreterModifyGraphWithDelegateFn>,
    pub(crate) interpreter_set_custom_allocation_for_tensor:
        Option<ffi::InterpreterSetCustomAllocationForTensorFn>,
    pub(crate) interpreter_input_tensor_indices: Option<ffi::InterpreterTensorIndicesFn>,
    pub(crate) interpreter_output_tensor_indices: Option<ffi::InterpreterTensorIndicesFn>,
}

impl std::fmt::Debug for TfLite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfLite")
            .field(
                "modify_graph_with_delegate",
                &self.interpreter_modify_graph_with_delegate.is_some(),
            )
            .field(
                "custom_allocation",
                &self.interpreter_set_custom_allocation_for_tensor.is_some(),
            )
            .finish()
    }
}

impl TfLite {
    /// Opens the runtime library at `path` (a file name is looked up on the
    /// dynamic loader path) and resolves the C API.
    pub fn load(path: impl AsRef<OsStr>) -> Result<Arc<Self>, TfLiteError> {
        let path = path.as_ref();
        // SAFETY: loading the library runs its initializers; the TFLite C
        // runtime has no unusual requirements there.
        let library = unsafe { Library::new(path) }
            .map_err(|e| TfLiteError::Library(format!("{}: {}", path.to_string_lossy(), e)))?;

        Ok(Arc::new(TfLite {
            model_create_from_file: load_symbol(&library, ffi::SYM_MODEL_CREATE_FROM_FILE)?,
            model_delete: load_symbol(&library, ffi::SYM_MODEL_DELETE)?,
            interpreter_options_create: load_symbol(&library, ffi::SYM_INTERPRETER_OPTIONS_CREATE)?,
            interpreter_options_delete: load_symbol(&library, ffi::SYM_INTERPRETER_OPTIONS_DELETE)?,
            interpreter_options_set_num_threads: load_symbol(
                &library,
                ffi::SYM_INTERPRETER_OPTIONS_SET_NUM_THREADS,
            )?,
            interpreter_create: load_symbol(&library, ffi::SYM_INTERPRETER_CREATE)?,
            interpreter_delete: load_symbol(&library, ffi::SYM_INTERPRETER_DELETE)?,
            interpreter_get_input_tensor_count: load_symbol(
                &library,
                ffi::SYM_INTERPRETER_GET_INPUT_TENSOR_COUNT,
            )?,
            interpreter_get_output_tensor_count: load_symbol(
                &library,
                ffi::SYM_INTERPRETER_GET_OUTPUT_TENSOR_COUNT,
            )?,
            interpreter_get_input_tensor: load_symbol(
                &library,
                ffi::SYM_INTERPRETER_GET_INPUT_TENSOR,
            )?,
            interpreter_get_output_tensor: load_symbol(
                &library,
                ffi::SYM_INTERPRETER_GET_OUTPUT_TENSOR,
            )?,
            interpreter_allocate_tensors: load_symbol(
                &library,
                ffi::SYM_INTERPRETER_ALLOCATE_TENSORS,
            )?,
            interpreter_invoke: load_symbol(&library, ffi::SYM_INTERPRETER_INVOKE)?,
            tensor_type: load_symbol(&library, ffi::SYM_TENSOR_TYPE)?,
            tensor_num_dims: load_symbol(&library, ffi::SYM_TENSOR_NUM_DIMS)?,
            tensor_dim: load_symbol(&library, ffi::SYM_TENSOR_DIM)?,
            tensor_byte_size: load_symbol(&library, ffi::SYM_TENSOR_BYTE_SIZE)?,
            tensor_data: load_symbol(&library, ffi::SYM_TENSOR_DATA)?,
            tensor_name: load_symbol(&library, ffi::SYM_TENSOR_NAME)?,
            tensor_quantization_params: load_symbol(
                &library,
                ffi::SYM_TENSOR_QUANTIZATION_PARAMS,
            )?,
            interpreter_modify_graph_with_delegate: load_optional_symbol(
                &library,
                ffi::SYM_INTERPRETER_MODIFY_GRAPH_WITH_DELEGATE,
            ),
            interpreter_set_custom_allocation_for_tensor: load_optional_symbol(
                &library,
                ffi::SYM_INTERPRETER_SET_CUSTOM_ALLOCATION_FOR_TENSOR,
            ),
            interpreter_input_tensor_indices: load_optional_symbol(
                &library,
                ffi::SYM_INTERPRETER_INPUT_TENSOR_INDICES,
            ),
            interpreter_output_tensor_indices: load_optional_symbol(
                &library,
                ffi::SYM_INTERPRETER_OUTPUT_TENSOR_INDICES,
            ),
            _library: library,
        }))
    }

    /// True when the runtime can apply a delegate to an existing interpreter.
    pub fn supports_delegates(&self) -> bool {
        self.interpreter_modify_graph_with_delegate.is_some()
    }

    /// True when the runtime can bind caller-owned tensor buffers.
    pub fn supports_custom_allocation(&self) -> bool {
        self.interpreter_set_custom_allocation_for_tensor.is_some()
            && self.interpreter_input_tensor_indices.is_some()
            && self.interpreter_output_tensor_indices.is_some()
    }
}

fn load_symbol<T: Copy>(library: &Library, name: &'static [u8]) -> Result<T, TfLiteError> {
    // SAFETY: every symbol type in `ffi` matches the C API signature.
    let symbol = unsafe { library.get::<T>(name) }
        .map_err(|e| TfLiteError::Symbol(format!("{}: {}", ffi::symbol_name(name), e)))?;
    Ok(*symbol)
}

fn load_optional_symbol<T: Copy>(library: &Library, name: &'static [u8]) -> Option<T> {
    load_symbol(library, name).ok()
}
