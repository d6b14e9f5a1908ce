//! Semantic segmentation of a single image on an edge device.
//!
//! An [`ExecutionContext`] walks a model through load, graph build, optional
//! delegate attachment, tensor allocation and invocation. [`InferenceRunner`]
//! times the invocations and [`SegmentationRenderer`] blends the resulting
//! class map over the frame.

pub mod arena;
pub use arena::*;

pub mod backends;

pub mod config;
pub use config::*;

pub mod context;
pub use context::*;

pub mod delegate;
pub use delegate::*;

pub mod error;
pub use error::*;

pub mod pipeline;
pub use pipeline::*;

pub mod preprocess;

pub mod render;
pub use render::*;

pub mod runner;
pub use runner::*;

pub mod runtime;
pub use runtime::*;

pub mod types;
pub use types::*;
