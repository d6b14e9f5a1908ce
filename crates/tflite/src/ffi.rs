use std::ffi::{c_char, c_void};

#[repr(C)]
pub struct TfLiteModel {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TfLiteInterpreterOptions {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TfLiteInterpreter {
    _private: [u8; 0],
}

#[repr(C)]
pub struct TfLiteTensor {
    _private: [u8; 0],
}

/// Opaque delegate created by an accelerator plugin.
#[repr(C)]
pub struct TfLiteDelegate {
    _private: [u8; 0],
}

pub type TfLiteStatus = i32;
pub const TFLITE_OK: TfLiteStatus = 0;

// Kept as a plain integer so unknown codes from newer runtimes stay representable.
pub type TfLiteType = i32;
pub const TFLITE_NO_TYPE: TfLiteType = 0;
pub const TFLITE_FLOAT32: TfLiteType = 1;
pub const TFLITE_INT32: TfLiteType = 2;
pub const TFLITE_UINT8: TfLiteType = 3;
pub const TFLITE_INT64: TfLiteType = 4;
pub const TFLITE_STRING: TfLiteType = 5;
pub const TFLITE_BOOL: TfLiteType = 6;
pub const TFLITE_INT16: TfLiteType = 7;
pub const TFLITE_COMPLEX64: TfLiteType = 8;
pub const TFLITE_INT8: TfLiteType = 9;
pub const TFLITE_FLOAT16: TfLiteType = 10;
pub const TFLITE_FLOAT64: TfLiteType = 11;
pub const TFLITE_COMPLEX128: TfLiteType = 12;
pub const TFLITE_UINT64: TfLiteType = 13;
pub const TFLITE_UINT32: TfLiteType = 16;
pub const TFLITE_UINT16: TfLiteType = 17;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TfLiteQuantizationParams {
    pub scale: f32,
    pub zero_point: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TfLiteCustomAllocation {
    pub data: *mut c_void,
    pub bytes: usize,
}

/// Default flags for `TfLiteInterpreterSetCustomAllocationForTensor`.
pub const CUSTOM_ALLOCATION_FLAGS_NONE: i64 = 0;

// core C API
pub type ModelCreateFromFileFn = unsafe extern "C" fn(*const c_char) -> *mut TfLiteModel;
pub type ModelDeleteFn = unsafe extern "C" fn(*mut TfLiteModel);
pub type InterpreterOptionsCreateFn = unsafe extern "C" fn() -> *mut TfLiteInterpreterOptions;
pub type InterpreterOptionsDeleteFn = unsafe extern "C" fn(*mut TfLiteInterpreterOptions);
pub type InterpreterOptionsSetNumThreadsFn =
    unsafe extern "C" fn(*mut TfLiteInterpreterOptions, i32);
pub type InterpreterCreateFn = unsafe extern "C" fn(
    *const TfLiteModel,
    *const TfLiteInterpreterOptions,
) -> *mut TfLiteInterpreter;
pub type InterpreterDeleteFn = unsafe extern "C" fn(*mut TfLiteInterpreter);
pub type InterpreterGetTensorCountFn = unsafe extern "C" fn(*const TfLiteInterpreter) -> i32;
pub type InterpreterGetInputTensorFn =
    unsafe extern "C" fn(*const TfLiteInterpreter, i32) -> *mut TfLiteTensor;
pub type InterpreterGetOutputTensorFn =
    unsafe extern "C" fn(*const TfLiteInterpreter, i32) -> *const TfLiteTensor;
pub type InterpreterAllocateTensorsFn = unsafe extern "C" fn(*mut TfLiteInterpreter) -> TfLiteStatus;
pub type InterpreterInvokeFn = unsafe extern "C" fn(*mut TfLiteInterpreter) -> TfLiteStatus;
pub type TensorTypeFn = unsafe extern "C" fn(*const TfLiteTensor) -> TfLiteType;
pub type TensorNumDimsFn = unsafe extern "C" fn(*const TfLiteTensor) -> i32;
pub type TensorDimFn = unsafe extern "C" fn(*const TfLiteTensor, i32) -> i32;
pub type TensorByteSizeFn = unsafe extern "C" fn(*const TfLiteTensor) -> usize;
pub type TensorDataFn = unsafe extern "C" fn(*const TfLiteTensor) -> *mut c_void;
pub type TensorNameFn = unsafe extern "C" fn(*const TfLiteTensor) -> *const c_char;
pub type TensorQuantizationParamsFn =
    unsafe extern "C" fn(*const TfLiteTensor) -> TfLiteQuantizationParams;

// experimental C API
pub type InterpreterModifyGraphWithDelegateFn =
    unsafe extern "C" fn(*const TfLiteInterpreter, *mut TfLiteDelegate) -> TfLiteStatus;
pub type InterpreterSetCustomAllocationForTensorFn = unsafe extern "C" fn(
    *mut TfLiteInterpreter,
    i32,
    *const TfLiteCustomAllocation,
    i64,
) -> TfLiteStatus;
pub type InterpreterTensorIndicesFn = unsafe extern "C" fn(*const TfLiteInterpreter) -> *const i32;

pub const SYM_MODEL_CREATE_FROM_FILE: &[u8] = b"TfLiteModelCreateFromFile\0";
pub const SYM_MODEL_DELETE: &[u8] = b"TfLiteModelDelete\0";
pub const SYM_INTERPRETER_OPTIONS_CREATE: &[u8] = b"TfLiteInterpreterOptionsCreate\0";
pub const SYM_INTERPRETER_OPTIONS_DELETE: &[u8] = b"TfLiteInterpreterOptionsDelete\0";
pub const SYM_INTERPRETER_OPTIONS_SET_NUM_THREADS: &[u8] =
    b"TfLiteInterpreterOptionsSetNumThreads\0";
pub const SYM_INTERPRETER_CREATE: &[u8] = b"TfLiteInterpreterCreate\0";
pub const SYM_INTERPRETER_DELETE: &[u8] = b"TfLiteInterpreterDelete\0";
pub const SYM_INTERPRETER_GET_INPUT_TENSOR_COUNT: &[u8] =
    b"TfLiteInterpreterGetInputTensorCount\0";
pub const SYM_INTERPRETER_GET_OUTPUT_TENSOR_COUNT: &[u8] =
    b"TfLiteInterpreterGetOutputTensorCount\0";
pub const SYM_INTERPRETER_GET_INPUT_TENSOR: &[u8] = b"TfLiteInterpreterGetInputTensor\0";
pub const SYM_INTERPRETER_GET_OUTPUT_TENSOR: &[u8] = b"TfLiteInterpreterGetOutputTensor\0";
pub const SYM_INTERPRETER_ALLOCATE_TENSORS: &[u8] = b"TfLiteInterpreterAllocateTensors\0";
pub const SYM_INTERPRETER_INVOKE: &[u8] = b"TfLiteInterpreterInvoke\0";
pub const SYM_TENSOR_TYPE: &[u8] = b"TfLiteTensorType\0";
pub const SYM_TENSOR_NUM_DIMS: &[u8] = b"TfLiteTensorNumDims\0";
pub const SYM_TENSOR_DIM: &[u8] = b"TfLiteTensorDim\0";
pub const SYM_TENSOR_BYTE_SIZE: &[u8] = b"TfLiteTensorByteSize\0";
pub const SYM_TENSOR_DATA: &[u8] = b"TfLiteTensorData\0";
pub const SYM_TENSOR_NAME: &[u8] = b"TfLiteTensorName\0";
pub const SYM_TENSOR_QUANTIZATION_PARAMS: &[u8] = b"TfLiteTensorQuantizationParams\0";
pub const SYM_INTERPRETER_MODIFY_GRAPH_WITH_DELEGATE: &[u8] =
    b"TfLiteInterpreterModifyGraphWithDelegate\0";
pub const SYM_INTERPRETER_SET_CUSTOM_ALLOCATION_FOR_TENSOR: &[u8] =
    b"TfLiteInterpreterSetCustomAllocationForTensor\0";
pub const SYM_INTERPRETER_INPUT_TENSOR_INDICES: &[u8] = b"TfLiteInterpreterInputTensorIndices\0";
pub const SYM_INTERPRETER_OUTPUT_TENSOR_INDICES: &[u8] =
    b"TfLiteInterpreterOutputTensorIndices\0";

/// Returns the symbol name without its trailing NUL, for messages.
pub fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_names_are_nul_terminated() {
        for symbol in [
            SYM_MODEL_CREATE_FROM_FILE,
            SYM_INTERPRETER_INVOKE,
            SYM_TENSOR_QUANTIZATION_PARAMS,
            SYM_INTERPRETER_SET_CUSTOM_ALLOCATION_FOR_TENSOR,
        ] {
            assert_eq!(symbol.last(), Some(&0));
        }
    }

    #[test]
    fn test_symbol_name_strips_nul() {
        assert_eq!(symbol_name(SYM_INTERPRETER_INVOKE), "TfLiteInterpreterInvoke");
    }

    #[test]
    fn test_custom_allocation_layout() {
        assert_eq!(
            std::mem::size_of::<TfLiteCustomAllocation>(),
            2 * std::mem::size_of::<usize>()
        );
        assert_eq!(std::mem::size_of::<TfLiteQuantizationParams>(), 8);
    }
}
