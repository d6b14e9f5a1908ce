use {
    crate::{Delegate, SegmentError, SlotId, TensorInfo},
    std::{path::Path, ptr::NonNull},
};

/// Options applied when a graph is built from a model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Worker threads for operator execution, `None` for the runtime default.
    pub num_threads: Option<usize>,
}

/// Neural network runtime that deserializes models.
pub trait Runtime {
    fn name(&self) -> &str;
    fn load_model(&self, path: &Path) -> Result<Box<dyn Model>, SegmentError>;
}

/// Immutable, deserialized network.
pub trait Model {
    fn build_graph(&self, options: &GraphOptions) -> Result<Box<dyn Graph>, SegmentError>;
}

/// Executable graph with its tensor slots.
pub trait Graph {
    fn inputs(&self) -> Result<Vec<TensorInfo>, SegmentError>;
    fn outputs(&self) -> Result<Vec<TensorInfo>, SegmentError>;

    /// Repartitions the graph so that supported nodes run on the delegate.
    fn modify_graph_with_delegate(&mut self, delegate: &Delegate) -> Result<(), SegmentError>;

    fn allocate_tensors(&mut self) -> Result<(), SegmentError>;

    /// Makes `slot` use caller-owned memory instead of runtime memory.
    ///
    /// # Safety
    /// `data` must stay valid for `len` bytes until the graph is dropped.
    unsafe fn bind_region(
        &mut self,
        slot: SlotId,
        data: NonNull<u8>,
        len: usize,
    ) -> Result<(), SegmentError>;

    fn tensor_data(&self, slot: SlotId) -> Result<&[u8], SegmentError>;
    fn tensor_data_mut(&mut self, slot: SlotId) -> Result<&mut [u8], SegmentError>;

    fn invoke(&mut self) -> Result<(), SegmentError>;

    /// Graph-wide index of the tensor behind `slot`, if the runtime exposes it.
    fn tensor_index(&self, _slot: SlotId) -> Option<usize> {
        None
    }
}
