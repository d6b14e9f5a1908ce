#![allow(dead_code)]

use segment::*;
use std::{
    collections::BTreeMap,
    ffi::c_void,
    path::Path,
    ptr::NonNull,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

pub const NUM_CLASSES: i32 = 21;

/// Graph-wide tensor index reported for output 0.
pub const FAKE_OUTPUT_TENSOR_BASE: usize = 170;

/// Knobs and counters shared between a fake runtime and the graphs it builds.
#[derive(Clone)]
pub struct FakeConfig {
    pub width: usize,
    pub height: usize,
    pub input_type: ElementType,
    pub output_type: ElementType,
    /// Reported byte size of input 0 instead of the correct one.
    pub input_byte_size: Option<usize>,
    pub fail_invoke: bool,
    pub reject_delegate: bool,
    /// Report no inputs once tensors are allocated.
    pub drop_inputs_on_allocation: bool,
    pub invocations: Arc<AtomicUsize>,
    pub delegates: Arc<Mutex<Vec<String>>>,
    pub bound_slots: Arc<Mutex<Vec<SlotId>>>,
    pub num_threads: Arc<Mutex<Option<usize>>>,
}

impl FakeConfig {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            input_type: ElementType::Float32,
            output_type: ElementType::Int32,
            input_byte_size: None,
            fail_invoke: false,
            reject_delegate: false,
            drop_inputs_on_allocation: false,
            invocations: Arc::new(AtomicUsize::new(0)),
            delegates: Arc::new(Mutex::new(Vec::new())),
            bound_slots: Arc::new(Mutex::new(Vec::new())),
            num_threads: Arc::new(Mutex::new(None)),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

/// Accepts any `*.tflite` path and builds graphs with one NHWC input and
/// one class id output of the same spatial size.
pub struct FakeRuntime {
    pub config: FakeConfig,
}

impl FakeRuntime {
    pub fn new(config: FakeConfig) -> Self {
        Self { config }
    }
}

impl Runtime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    fn load_model(&self, path: &Path) -> Result<Box<dyn Model>, SegmentError> {
        if path.extension().and_then(|e| e.to_str()) != Some("tflite") {
            return Err(SegmentError::ModelLoad(format!(
                "{} is not a model",
                path.display()
            )));
        }
        Ok(Box::new(FakeModel {
            config: self.config.clone(),
        }))
    }
}

struct FakeModel {
    config: FakeConfig,
}

impl Model for FakeModel {
    fn build_graph(&self, options: &GraphOptions) -> Result<Box<dyn Graph>, SegmentError> {
        *self.config.num_threads.lock().unwrap() = options.num_threads;
        Ok(Box::new(FakeGraph {
            config: self.config.clone(),
            allocated: false,
            owned: BTreeMap::new(),
            bound: BTreeMap::new(),
        }))
    }
}

struct FakeGraph {
    config: FakeConfig,
    allocated: bool,
    owned: BTreeMap<SlotId, Vec<u8>>,
    bound: BTreeMap<SlotId, (NonNull<u8>, usize)>,
}

impl FakeGraph {
    fn input_info(&self) -> TensorInfo {
        let shape = vec![1, self.config.height, self.config.width, 3];
        let element_size = self.config.input_type.size().unwrap_or(1);
        TensorInfo {
            name: "input".to_string(),
            byte_size: self
                .config
                .input_byte_size
                .unwrap_or(shape.iter().product::<usize>() * element_size),
            shape,
            element_type: self.config.input_type,
            quantization: None,
        }
    }

    fn output_info(&self) -> TensorInfo {
        let shape = vec![1, self.config.height, self.config.width];
        let element_size = self.config.output_type.size().unwrap_or(4);
        TensorInfo {
            name: "output".to_string(),
            byte_size: shape.iter().product::<usize>() * element_size,
            shape,
            element_type: self.config.output_type,
            quantization: Some(QuantizationParams {
                scale: 1.0,
                zero_point: 0,
            }),
        }
    }

    fn slot(&self, slot: SlotId) -> Result<&[u8], SegmentError> {
        if let Some((ptr, len)) = self.bound.get(&slot) {
            return Ok(unsafe { std::slice::from_raw_parts(ptr.as_ptr(), *len) });
        }
        self.owned
            .get(&slot)
            .map(|v| v.as_slice())
            .ok_or_else(|| SegmentError::InvalidShape(format!("{slot} not allocated")))
    }

    fn slot_mut(&mut self, slot: SlotId) -> Result<&mut [u8], SegmentError> {
        if let Some((ptr, len)) = self.bound.get(&slot) {
            return Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), *len) });
        }
        self.owned
            .get_mut(&slot)
            .map(|v| v.as_mut_slice())
            .ok_or_else(|| SegmentError::InvalidShape(format!("{slot} not allocated")))
    }
}

impl Graph for FakeGraph {
    fn inputs(&self) -> Result<Vec<TensorInfo>, SegmentError> {
        if self.allocated && self.config.drop_inputs_on_allocation {
            return Ok(Vec::new());
        }
        Ok(vec![self.input_info()])
    }

    fn outputs(&self) -> Result<Vec<TensorInfo>, SegmentError> {
        Ok(vec![self.output_info()])
    }

    fn modify_graph_with_delegate(&mut self, delegate: &Delegate) -> Result<(), SegmentError> {
        if self.config.reject_delegate {
            return Err(SegmentError::DelegateLoad("rejected".to_string()));
        }
        self.config
            .delegates
            .lock()
            .unwrap()
            .push(delegate.backend().to_string());
        Ok(())
    }

    fn allocate_tensors(&mut self) -> Result<(), SegmentError> {
        let input = self.input_info();
        let output = self.output_info();
        self.owned
            .insert(SlotId::Input(0), vec![0; input.byte_size]);
        self.owned
            .insert(SlotId::Output(0), vec![0; output.byte_size]);
        self.allocated = true;
        Ok(())
    }

    unsafe fn bind_region(
        &mut self,
        slot: SlotId,
        data: NonNull<u8>,
        len: usize,
    ) -> Result<(), SegmentError> {
        self.bound.insert(slot, (data, len));
        self.config.bound_slots.lock().unwrap().push(slot);
        Ok(())
    }

    fn tensor_data(&self, slot: SlotId) -> Result<&[u8], SegmentError> {
        self.slot(slot)
    }

    fn tensor_data_mut(&mut self, slot: SlotId) -> Result<&mut [u8], SegmentError> {
        self.slot_mut(slot)
    }

    fn tensor_index(&self, slot: SlotId) -> Option<usize> {
        match slot {
            SlotId::Input(i) => Some(i),
            SlotId::Output(i) => Some(FAKE_OUTPUT_TENSOR_BASE + i),
        }
    }

    fn invoke(&mut self) -> Result<(), SegmentError> {
        if !self.allocated {
            return Err(SegmentError::Invocation("not allocated".to_string()));
        }
        self.config.invocations.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_invoke {
            return Err(SegmentError::Invocation("injected failure".to_string()));
        }
        if self.config.output_type != ElementType::Int32 {
            return Ok(());
        }
        let input = self.slot(SlotId::Input(0))?.to_vec();
        let element_size = self.config.input_type.size().unwrap_or(1);
        let cells = self.config.width * self.config.height;
        let output = self.slot_mut(SlotId::Output(0))?;
        for cell in 0..cells {
            let first = input.get(cell * 3 * element_size).copied().unwrap_or(0) as i32;
            let class = (first + cell as i32) % NUM_CLASSES;
            output[cell * 4..cell * 4 + 4].copy_from_slice(&class.to_ne_bytes());
        }
        Ok(())
    }
}

/// Host allocator that counts calls and can fail after a number of
/// successful allocations.
pub struct CountingAllocator {
    pub allocations: Arc<AtomicUsize>,
    pub frees: Arc<AtomicUsize>,
    pub fail_after: Option<usize>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self {
            allocations: Arc::new(AtomicUsize::new(0)),
            frees: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
        }
    }

    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::new()
        }
    }
}

impl SharedAllocator for CountingAllocator {
    fn name(&self) -> &str {
        "counting"
    }

    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, SegmentError> {
        if let Some(limit) = self.fail_after {
            if self.allocations.load(Ordering::SeqCst) >= limit {
                return Err(SegmentError::Allocation("injected failure".to_string()));
            }
        }
        let ptr = HostAllocator.allocate(size, alignment)?;
        self.allocations.fetch_add(1, Ordering::SeqCst);
        Ok(ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, alignment: usize) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        unsafe { HostAllocator.free(ptr, size, alignment) };
    }
}

struct FakeHandle;

impl DelegateHandle for FakeHandle {
    fn as_raw(&self) -> *mut c_void {
        std::ptr::null_mut()
    }
}

/// In-process backend whose delegates do nothing.
pub struct FakeBackend {
    pub created: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            created: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn create_delegate(&self, _options: &DelegateOptions) -> Result<Delegate, SegmentError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Delegate::new("fake", Box::new(FakeHandle)))
    }
}

/// Context with a model loaded and its graph built.
pub fn built_context(config: &FakeConfig) -> ExecutionContext {
    let runtime = FakeRuntime::new(config.clone());
    let mut context = ExecutionContext::new();
    context
        .load_model(&runtime, Path::new("model.tflite"))
        .expect("load failed");
    context.build_graph().expect("build failed");
    context
}
