use {
    crate::{
        Delegate, ElementType, Graph, GraphOptions, Model, QuantizationParams, Runtime,
        SegmentError, SlotId, TensorInfo,
    },
    std::{ffi::OsStr, path::Path, ptr::NonNull, sync::Arc},
    tflite::{Interpreter, TensorRef, TfLite, TfLiteError, ffi},
};

pub fn element_type(code: ffi::TfLiteType) -> ElementType {
    match code {
        ffi::TFLITE_FLOAT64 => ElementType::Float64,
        ffi::TFLITE_FLOAT32 => ElementType::Float32,
        ffi::TFLITE_FLOAT16 => ElementType::Float16,
        ffi::TFLITE_INT64 => ElementType::Int64,
        ffi::TFLITE_INT32 => ElementType::Int32,
        ffi::TFLITE_INT16 => ElementType::Int16,
        ffi::TFLITE_INT8 => ElementType::Int8,
        ffi::TFLITE_UINT64 => ElementType::UInt64,
        ffi::TFLITE_UINT32 => ElementType::UInt32,
        ffi::TFLITE_UINT16 => ElementType::UInt16,
        ffi::TFLITE_UINT8 => ElementType::UInt8,
        ffi::TFLITE_BOOL => ElementType::Bool,
        ffi::TFLITE_COMPLEX64 => ElementType::Complex64,
        other => ElementType::Other(other),
    }
}

fn tensor_info(tensor: TensorRef<'_>) -> TensorInfo {
    let params = tensor.quantization();
    // unquantized tensors report a zero scale
    let quantization = (params.scale != 0.0).then_some(QuantizationParams {
        scale: params.scale,
        zero_point: params.zero_point,
    });
    TensorInfo {
        name: tensor.name(),
        shape: tensor.shape(),
        element_type: element_type(tensor.element_type()),
        byte_size: tensor.byte_size(),
        quantization,
    }
}

/// TensorFlow Lite runtime opened from a shared library.
pub struct TfLiteRuntime {
    tflite: Arc<TfLite>,
}

impl TfLiteRuntime {
    pub fn load(library: impl AsRef<OsStr>) -> Result<Self, SegmentError> {
        let tflite = TfLite::load(library).map_err(|e| SegmentError::ModelLoad(e.to_string()))?;
        Ok(Self { tflite })
    }
}

impl Runtime for TfLiteRuntime {
    fn name(&self) -> &str {
        "tflite"
    }

    fn load_model(&self, path: &Path) -> Result<Box<dyn Model>, SegmentError> {
        if !path.is_file() {
            return Err(SegmentError::ModelLoad(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let model = tflite::Model::from_file(&self.tflite, path)
            .map_err(|e| SegmentError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Ok(Box::new(TfLiteModel { model }))
    }
}

struct TfLiteModel {
    model: tflite::Model,
}

impl Model for TfLiteModel {
    fn build_graph(&self, options: &GraphOptions) -> Result<Box<dyn Graph>, SegmentError> {
        let interpreter = Interpreter::new(&self.model, options.num_threads)
            .map_err(|e| SegmentError::GraphBuild(e.to_string()))?;
        let tflite = self.model.tflite();
        Ok(Box::new(TfLiteGraph {
            interpreter,
            delegates: tflite.supports_delegates(),
            custom_allocation: tflite.supports_custom_allocation(),
        }))
    }
}

struct TfLiteGraph {
    interpreter: Interpreter,
    delegates: bool,
    custom_allocation: bool,
}

impl TfLiteGraph {
    fn tensor(&self, slot: SlotId) -> Result<TensorRef<'_>, TfLiteError> {
        match slot {
            SlotId::Input(i) => self.interpreter.input(i),
            SlotId::Output(i) => self.interpreter.output(i),
        }
    }
}

fn shape_error(error: TfLiteError) -> SegmentError {
    SegmentError::InvalidShape(error.to_string())
}

impl Graph for TfLiteGraph {
    fn inputs(&self) -> Result<Vec<TensorInfo>, SegmentError> {
        (0..self.interpreter.input_count())
            .map(|i| self.interpreter.input(i).map(tensor_info).map_err(shape_error))
            .collect()
    }

    fn outputs(&self) -> Result<Vec<TensorInfo>, SegmentError> {
        (0..self.interpreter.output_count())
            .map(|i| self.interpreter.output(i).map(tensor_info).map_err(shape_error))
            .collect()
    }

    fn modify_graph_with_delegate(&mut self, delegate: &Delegate) -> Result<(), SegmentError> {
        if !self.delegates {
            return Err(SegmentError::DelegateLoad(format!(
                "runtime cannot apply the {} delegate: TfLiteInterpreterModifyGraphWithDelegate is missing",
                delegate.backend()
            )));
        }
        let raw = delegate.as_raw() as *mut ffi::TfLiteDelegate;
        // SAFETY: the execution context drops the graph before the delegate.
        unsafe { self.interpreter.modify_graph_with_delegate(raw) }.map_err(|e| {
            SegmentError::DelegateLoad(format!("applying {} delegate: {}", delegate.backend(), e))
        })
    }

    fn allocate_tensors(&mut self) -> Result<(), SegmentError> {
        self.interpreter
            .allocate_tensors()
            .map_err(|e| SegmentError::Allocation(e.to_string()))
    }

    unsafe fn bind_region(
        &mut self,
        slot: SlotId,
        data: NonNull<u8>,
        len: usize,
    ) -> Result<(), SegmentError> {
        if !self.custom_allocation {
            return Err(SegmentError::Allocation(format!(
                "runtime cannot bind {slot} to shared memory: custom tensor allocation is missing"
            )));
        }
        let tensor_index = match slot {
            SlotId::Input(i) => self.interpreter.input_tensor_index(i),
            SlotId::Output(i) => self.interpreter.output_tensor_index(i),
        }
        .map_err(|e| SegmentError::Allocation(e.to_string()))?;
        unsafe { self.interpreter.set_custom_allocation(tensor_index, data, len) }
            .map_err(|e| SegmentError::Allocation(format!("binding {slot}: {e}")))
    }

    fn tensor_data(&self, slot: SlotId) -> Result<&[u8], SegmentError> {
        let tensor = self.tensor(slot).map_err(shape_error)?;
        Ok(tensor.data())
    }

    fn tensor_data_mut(&mut self, slot: SlotId) -> Result<&mut [u8], SegmentError> {
        match slot {
            SlotId::Input(i) => self
                .interpreter
                .input_data_mut(i)
                .map_err(|e| SegmentError::InvalidShape(e.to_string())),
            SlotId::Output(_) => Err(SegmentError::State {
                operation: "write tensor",
                state: format!("{slot} is read-only"),
            }),
        }
    }

    fn invoke(&mut self) -> Result<(), SegmentError> {
        self.interpreter
            .invoke()
            .map_err(|e| SegmentError::Invocation(e.to_string()))
    }

    fn tensor_index(&self, slot: SlotId) -> Option<usize> {
        let index = match slot {
            SlotId::Input(i) => self.interpreter.input_tensor_index(i),
            SlotId::Output(i) => self.interpreter.output_tensor_index(i),
        };
        index.ok().and_then(|index| usize::try_from(index).ok())
    }
}
