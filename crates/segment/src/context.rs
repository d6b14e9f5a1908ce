use {
    crate::{
        ClassMap, DEFAULT_TENSOR_ALIGNMENT, Delegate, ElementType, Graph, GraphOptions,
        HostAllocator, Model, Runtime, SegmentError, SharedAllocator, SlotId, TensorInfo,
        TensorMemoryArena, preprocess,
    },
    base::*,
    frame::FrameBuffer,
    std::{fmt, path::Path},
};

/// Lifecycle of an [`ExecutionContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    ModelLoaded,
    GraphBuilt,
    DelegateAttached,
    TensorsAllocated,
    Ready,
    Invoked,
    Completed,
    Failed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Uninitialized => write!(f, "uninitialized"),
            ContextState::ModelLoaded => write!(f, "model loaded"),
            ContextState::GraphBuilt => write!(f, "graph built"),
            ContextState::DelegateAttached => write!(f, "delegate attached"),
            ContextState::TensorsAllocated => write!(f, "tensors allocated"),
            ContextState::Ready => write!(f, "ready"),
            ContextState::Invoked => write!(f, "invoked"),
            ContextState::Completed => write!(f, "completed"),
            ContextState::Failed => write!(f, "failed"),
        }
    }
}

/// Where tensor buffers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationMode {
    /// Runtime-owned memory.
    #[default]
    Default,
    /// Arena regions from the context's shared allocator, bound to each slot.
    ZeroCopy,
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMode::Default => write!(f, "default"),
            AllocationMode::ZeroCopy => write!(f, "zero-copy"),
        }
    }
}

/// One inference run: model, graph, optional delegate and tensor memory.
pub struct ExecutionContext {
    // drop order: the graph may point into delegate and arena memory
    graph: Option<Box<dyn Graph>>,
    delegate: Option<Delegate>,
    model: Option<Box<dyn Model>>,
    arena: Option<TensorMemoryArena>,
    allocator: Option<Box<dyn SharedAllocator>>,
    state: ContextState,
    num_threads: Option<usize>,
    allocation_mode: AllocationMode,
    verbose: bool,
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            graph: None,
            delegate: None,
            model: None,
            arena: None,
            allocator: None,
            state: ContextState::Uninitialized,
            num_threads: None,
            allocation_mode: AllocationMode::Default,
            verbose: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn inputs(&self) -> &[TensorInfo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TensorInfo] {
        &self.outputs
    }

    pub fn delegate(&self) -> Option<&Delegate> {
        self.delegate.as_ref()
    }

    pub fn arena(&self) -> Option<&TensorMemoryArena> {
        self.arena.as_ref()
    }

    pub fn allocation_mode(&self) -> AllocationMode {
        self.allocation_mode
    }

    pub fn num_threads(&self) -> Option<usize> {
        self.num_threads
    }

    /// Dumps tensor metadata at debug level once the graph is built.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Allocator backing zero-copy regions; the host heap when never set.
    pub fn set_allocator(&mut self, allocator: Box<dyn SharedAllocator>) -> Result<(), SegmentError> {
        self.expect_state(
            "set allocator",
            &[
                ContextState::Uninitialized,
                ContextState::ModelLoaded,
                ContextState::GraphBuilt,
                ContextState::DelegateAttached,
            ],
        )?;
        self.allocator = Some(allocator);
        Ok(())
    }

    /// Thread count is applied when the graph is built and fixed afterwards.
    pub fn set_num_threads(&mut self, num_threads: usize) -> Result<(), SegmentError> {
        self.expect_state(
            "set thread count",
            &[ContextState::Uninitialized, ContextState::ModelLoaded],
        )?;
        if num_threads == 0 {
            return Err(SegmentError::Config("thread count must be at least 1".to_string()));
        }
        self.num_threads = Some(num_threads);
        Ok(())
    }

    pub fn load_model(&mut self, runtime: &dyn Runtime, path: &Path) -> Result<(), SegmentError> {
        self.expect_state("load model", &[ContextState::Uninitialized])?;
        let model = runtime.load_model(path).map_err(|e| self.fail(e))?;
        self.model = Some(model);
        self.state = ContextState::ModelLoaded;
        log_info!("loaded model {} with {}", path.display(), runtime.name());
        Ok(())
    }

    pub fn build_graph(&mut self) -> Result<(), SegmentError> {
        self.expect_state("build graph", &[ContextState::ModelLoaded])?;
        let options = GraphOptions {
            num_threads: self.num_threads,
        };
        let result = match &self.model {
            Some(model) => model.build_graph(&options),
            None => Err(SegmentError::GraphBuild("no model loaded".to_string())),
        };
        let graph = result.map_err(|e| self.fail(e))?;
        let (inputs, outputs) = match (graph.inputs(), graph.outputs()) {
            (Ok(inputs), Ok(outputs)) => (inputs, outputs),
            (Err(e), _) | (_, Err(e)) => return Err(self.fail(e)),
        };
        if inputs.is_empty() || outputs.is_empty() {
            return Err(self.fail(SegmentError::GraphBuild(format!(
                "graph has {} inputs and {} outputs",
                inputs.len(),
                outputs.len()
            ))));
        }
        self.graph = Some(graph);
        self.inputs = inputs;
        self.outputs = outputs;
        self.state = ContextState::GraphBuilt;
        log_info!(
            "built graph: {} inputs, {} outputs",
            self.inputs.len(),
            self.outputs.len()
        );
        if self.verbose {
            self.dump_tensors();
        }
        Ok(())
    }

    fn dump_tensors(&self) {
        for line in self.describe_tensors() {
            log_debug!("{}", line);
        }
    }

    /// Slot counts followed by one line per input and output tensor, with the
    /// graph-wide tensor index when the runtime reports one.
    pub fn describe_tensors(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} inputs, {} outputs",
            self.inputs.len(),
            self.outputs.len()
        )];
        let slots = self
            .inputs
            .iter()
            .enumerate()
            .map(|(i, info)| (SlotId::Input(i), info))
            .chain(
                self.outputs
                    .iter()
                    .enumerate()
                    .map(|(i, info)| (SlotId::Output(i), info)),
            );
        for (slot, info) in slots {
            let index = self.graph.as_ref().and_then(|graph| graph.tensor_index(slot));
            lines.push(match index {
                Some(index) => format!("{slot} (tensor {index}): {info}"),
                None => format!("{slot}: {info}"),
            });
        }
        lines
    }

    /// Hands the graph to an accelerator delegate. Once attached it stays for
    /// the rest of the run.
    pub fn attach_delegate(&mut self, delegate: Delegate) -> Result<(), SegmentError> {
        self.expect_state("attach delegate", &[ContextState::GraphBuilt])?;
        // keep the delegate alive even if the graph rejects it partway
        let delegate = &*self.delegate.insert(delegate);
        let result = match self.graph.as_mut() {
            Some(graph) => graph.modify_graph_with_delegate(delegate),
            None => Err(SegmentError::GraphBuild("no graph built".to_string())),
        };
        let backend = delegate.backend().to_string();
        result.map_err(|e| self.fail(e))?;
        self.state = ContextState::DelegateAttached;
        log_info!("attached {} delegate", backend);
        Ok(())
    }

    pub fn allocate_tensors(&mut self, mode: AllocationMode) -> Result<(), SegmentError> {
        self.expect_state(
            "allocate tensors",
            &[ContextState::GraphBuilt, ContextState::DelegateAttached],
        )?;
        match self.allocate_inner(mode) {
            Ok(()) => {
                self.allocation_mode = mode;
                self.state = ContextState::TensorsAllocated;
                log_info!("allocated tensors ({})", mode);
                Ok(())
            }
            Err(e) => {
                // the graph may hold bindings into the arena, drop it first
                self.graph = None;
                if let Some(mut arena) = self.arena.take() {
                    arena.release_all();
                }
                Err(self.fail(e))
            }
        }
    }

    fn allocate_inner(&mut self, mode: AllocationMode) -> Result<(), SegmentError> {
        let graph = self
            .graph
            .as_mut()
            .ok_or_else(|| SegmentError::Allocation("no graph built".to_string()))?;
        graph.allocate_tensors()?;

        // shapes are final after allocation
        self.inputs = graph.inputs()?;
        self.outputs = graph.outputs()?;
        if let Some(info) = self.inputs.iter().find(|info| !info.element_type.is_image_input()) {
            return Err(SegmentError::UnsupportedInputType(info.element_type));
        }
        for info in self.inputs.iter().chain(self.outputs.iter()) {
            info.validate()?;
        }

        if mode == AllocationMode::ZeroCopy {
            let allocator = self
                .allocator
                .take()
                .unwrap_or_else(|| Box::new(HostAllocator) as Box<dyn SharedAllocator>);
            let arena = self.arena.insert(TensorMemoryArena::new(allocator));
            let slots = (0..self.inputs.len())
                .map(|i| (SlotId::Input(i), self.inputs[i].byte_size))
                .chain((0..self.outputs.len()).map(|i| (SlotId::Output(i), self.outputs[i].byte_size)));
            for (slot, byte_size) in slots {
                let region = arena.acquire(slot, byte_size, DEFAULT_TENSOR_ALIGNMENT)?;
                // SAFETY: the arena outlives the graph (field drop order) and
                // regions are released only after the graph is gone.
                unsafe { graph.bind_region(slot, region.ptr(), region.len())? };
            }
            log_info!(
                "bound {} tensors to {} bytes of {} memory",
                arena.len(),
                arena.total_bytes(),
                arena.allocator_name()
            );
        }
        Ok(())
    }

    /// Normalizes `frame` into input 0 as `(pixel - mean) / scale`.
    ///
    /// The frame must already match the input tensor's spatial size.
    pub fn write_input(&mut self, frame: &FrameBuffer, mean: f32, scale: f32) -> Result<(), SegmentError> {
        self.expect_state(
            "write input",
            &[
                ContextState::TensorsAllocated,
                ContextState::Ready,
                ContextState::Invoked,
            ],
        )?;
        let info = self
            .inputs
            .first()
            .ok_or_else(|| SegmentError::InvalidShape("graph has no inputs".to_string()))?;
        let graph = self
            .graph
            .as_mut()
            .ok_or_else(|| SegmentError::Invocation("no graph built".to_string()))?;
        let data = graph.tensor_data_mut(SlotId::Input(0))?;
        preprocess::fill_input(info, data, frame, mean, scale)?;
        self.state = ContextState::Ready;
        Ok(())
    }

    /// Runs the graph once. On failure the context is unusable.
    pub fn invoke(&mut self) -> Result<(), SegmentError> {
        self.expect_state(
            "invoke",
            &[
                ContextState::TensorsAllocated,
                ContextState::Ready,
                ContextState::Invoked,
            ],
        )?;
        let result = match self.graph.as_mut() {
            Some(graph) => graph.invoke(),
            None => Err(SegmentError::Invocation("no graph built".to_string())),
        };
        result.map_err(|e| self.fail(e))?;
        self.state = ContextState::Invoked;
        Ok(())
    }

    /// Output 0 as per-cell class ids over the input tensor's grid.
    pub fn class_map(&self) -> Result<ClassMap<'_>, SegmentError> {
        self.expect_state("read class map", &[ContextState::Invoked])?;
        let output = self
            .outputs
            .first()
            .ok_or_else(|| SegmentError::InvalidShape("graph has no outputs".to_string()))?;
        if output.element_type != ElementType::Int32 {
            return Err(SegmentError::UnsupportedOutputType(output.element_type));
        }
        let input = self
            .inputs
            .first()
            .ok_or_else(|| SegmentError::InvalidShape("graph has no inputs".to_string()))?;
        let size = preprocess::spatial_size(input)?;
        let graph = self
            .graph
            .as_ref()
            .ok_or_else(|| SegmentError::Invocation("no graph built".to_string()))?;
        let bytes = graph.tensor_data(SlotId::Output(0))?;
        Ok(ClassMap::from_bytes(size.x, size.y, bytes))
    }

    /// Ends the run. Later operations fail with a state error.
    pub fn finish(&mut self) -> Result<(), SegmentError> {
        if matches!(self.state, ContextState::Completed | ContextState::Failed) {
            return Err(SegmentError::State {
                operation: "finish",
                state: self.state.to_string(),
            });
        }
        self.state = ContextState::Completed;
        Ok(())
    }

    fn expect_state(&self, operation: &'static str, allowed: &[ContextState]) -> Result<(), SegmentError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SegmentError::State {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn fail(&mut self, error: SegmentError) -> SegmentError {
        log_error!("{} (context was {})", error, self.state);
        self.state = ContextState::Failed;
        error
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.graph = None;
        if let Some(mut arena) = self.arena.take() {
            let released = arena.release_all();
            if released > 0 {
                log_debug!("released {} tensor regions", released);
            }
        }
    }
}
