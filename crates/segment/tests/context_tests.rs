mod common;

use base::Vec2;
use common::{CountingAllocator, FAKE_OUTPUT_TENSOR_BASE, FakeConfig, FakeRuntime, built_context};
use frame::FrameBuffer;
use segment::*;
use std::{path::Path, sync::atomic::Ordering};

#[test]
fn test_lifecycle_states() {
    let config = FakeConfig::new(4, 4);
    let runtime = FakeRuntime::new(config.clone());
    let mut context = ExecutionContext::new();
    assert_eq!(context.state(), ContextState::Uninitialized);

    context.set_num_threads(2).unwrap();
    context
        .load_model(&runtime, Path::new("model.tflite"))
        .unwrap();
    assert_eq!(context.state(), ContextState::ModelLoaded);
    context.build_graph().unwrap();
    assert_eq!(context.state(), ContextState::GraphBuilt);
    assert_eq!(*config.num_threads.lock().unwrap(), Some(2));
    assert_eq!(context.inputs()[0].shape, vec![1, 4, 4, 3]);

    context.allocate_tensors(AllocationMode::Default).unwrap();
    assert_eq!(context.state(), ContextState::TensorsAllocated);

    let frame = FrameBuffer::filled(Vec2::new(4, 4), [1, 2, 3]);
    context.write_input(&frame, 0.0, 1.0).unwrap();
    assert_eq!(context.state(), ContextState::Ready);

    context.invoke().unwrap();
    assert_eq!(context.state(), ContextState::Invoked);
    {
        let map = context.class_map().unwrap();
        assert_eq!((map.width, map.height), (4, 4));
        assert_eq!(map.classes.len(), 16);
    }

    context.finish().unwrap();
    assert_eq!(context.state(), ContextState::Completed);
    assert!(matches!(context.invoke(), Err(SegmentError::State { .. })));
}

#[test]
fn test_out_of_order_operations() {
    let config = FakeConfig::new(4, 4);
    let mut context = ExecutionContext::new();
    assert!(matches!(context.build_graph(), Err(SegmentError::State { .. })));
    assert!(matches!(
        context.allocate_tensors(AllocationMode::Default),
        Err(SegmentError::State { .. })
    ));
    assert!(matches!(context.invoke(), Err(SegmentError::State { .. })));
    assert!(matches!(context.class_map(), Err(SegmentError::State { .. })));
    // rejected calls leave the state alone
    assert_eq!(context.state(), ContextState::Uninitialized);

    let mut context = built_context(&config);
    assert!(matches!(context.invoke(), Err(SegmentError::State { .. })));
    assert!(matches!(
        context.set_num_threads(4),
        Err(SegmentError::State { .. })
    ));
    assert_eq!(config.invocations(), 0);
}

#[test]
fn test_missing_model() {
    let runtime = FakeRuntime::new(FakeConfig::new(4, 4));
    let mut context = ExecutionContext::new();
    let err = context.load_model(&runtime, Path::new("model.onnx"));
    assert!(matches!(err, Err(SegmentError::ModelLoad(_))));
    assert_eq!(context.state(), ContextState::Failed);
}

#[test]
fn test_byte_size_mismatch_before_invocation() {
    let mut config = FakeConfig::new(4, 4);
    config.input_byte_size = Some(4 * 4 * 3);
    let mut context = built_context(&config);

    let err = context.allocate_tensors(AllocationMode::Default);
    assert!(matches!(err, Err(SegmentError::Allocation(_))));
    assert_eq!(context.state(), ContextState::Failed);
    assert!(matches!(context.invoke(), Err(SegmentError::State { .. })));
    assert_eq!(config.invocations(), 0);
}

#[test]
fn test_zero_copy_binds_every_slot() {
    let config = FakeConfig::new(4, 4);
    let allocator = CountingAllocator::new();
    let (allocations, frees) = (allocator.allocations.clone(), allocator.frees.clone());
    let mut context = built_context(&config);
    context.set_allocator(Box::new(allocator)).unwrap();
    context.allocate_tensors(AllocationMode::ZeroCopy).unwrap();

    assert_eq!(context.allocation_mode(), AllocationMode::ZeroCopy);
    assert_eq!(
        *config.bound_slots.lock().unwrap(),
        vec![SlotId::Input(0), SlotId::Output(0)]
    );
    let arena = context.arena().unwrap();
    assert_eq!(arena.len(), 2);
    assert_eq!(arena.total_bytes(), 4 * 4 * 3 * 4 + 4 * 4 * 4);
    assert_eq!(allocations.load(Ordering::SeqCst), 2);

    drop(context);
    assert_eq!(frees.load(Ordering::SeqCst), 2);
}

#[test]
fn test_zero_copy_failure_releases_acquired() {
    let config = FakeConfig::new(4, 4);
    let allocator = CountingAllocator::failing_after(1);
    let (allocations, frees) = (allocator.allocations.clone(), allocator.frees.clone());
    let mut context = built_context(&config);
    context.set_allocator(Box::new(allocator)).unwrap();

    let err = context.allocate_tensors(AllocationMode::ZeroCopy);
    assert!(matches!(err, Err(SegmentError::Allocation(_))));
    assert_eq!(context.state(), ContextState::Failed);
    assert!(context.arena().is_none());
    assert_eq!(allocations.load(Ordering::SeqCst), 1);
    assert_eq!(frees.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsupported_input_type() {
    let mut config = FakeConfig::new(2, 2);
    config.input_type = ElementType::Int8;
    let mut context = built_context(&config);
    assert!(matches!(
        context.allocate_tensors(AllocationMode::Default),
        Err(SegmentError::UnsupportedInputType(ElementType::Int8))
    ));
    assert_eq!(context.state(), ContextState::Failed);
    let frame = FrameBuffer::filled(Vec2::new(2, 2), [0, 0, 0]);
    assert!(matches!(
        context.write_input(&frame, 127.5, 127.5),
        Err(SegmentError::State { .. })
    ));
}

#[test]
fn test_input_types_rejected_before_size_check() {
    for input_type in [
        ElementType::Float64,
        ElementType::Bool,
        ElementType::UInt16,
        ElementType::Complex64,
        // unmapped runtime code, size unknown
        ElementType::Other(17),
    ] {
        let mut config = FakeConfig::new(2, 2);
        config.input_type = input_type;
        let mut context = built_context(&config);
        let err = context.allocate_tensors(AllocationMode::Default);
        assert!(
            matches!(err, Err(SegmentError::UnsupportedInputType(ty)) if ty == input_type),
            "{input_type}: {err:?}"
        );
        assert_eq!(context.state(), ContextState::Failed);
        assert_eq!(config.invocations(), 0);
    }
}

#[test]
fn test_unsupported_input_type_allocates_no_regions() {
    let mut config = FakeConfig::new(2, 2);
    config.input_type = ElementType::Float64;
    let allocator = CountingAllocator::new();
    let allocations = allocator.allocations.clone();
    let mut context = built_context(&config);
    context.set_allocator(Box::new(allocator)).unwrap();
    assert!(matches!(
        context.allocate_tensors(AllocationMode::ZeroCopy),
        Err(SegmentError::UnsupportedInputType(ElementType::Float64))
    ));
    assert_eq!(allocations.load(Ordering::SeqCst), 0);
    assert!(context.arena().is_none());
}

#[test]
fn test_describe_tensors() {
    let config = FakeConfig::new(4, 4);
    let context = built_context(&config);
    let lines = context.describe_tensors();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "1 inputs, 1 outputs");
    assert!(lines[1].starts_with("input 0 (tensor 0): input: [1, 4, 4, 3] float32"));
    assert!(lines[2].starts_with(&format!(
        "output 0 (tensor {}): output: [1, 4, 4] int32",
        FAKE_OUTPUT_TENSOR_BASE
    )));
    assert!(lines[2].ends_with("scale 1 zero point 0"));

    assert_eq!(ExecutionContext::new().describe_tensors(), vec!["0 inputs, 0 outputs"]);
}

#[test]
fn test_frame_size_must_match_input() {
    let config = FakeConfig::new(4, 4);
    let mut context = built_context(&config);
    context.allocate_tensors(AllocationMode::Default).unwrap();
    let frame = FrameBuffer::filled(Vec2::new(8, 8), [0, 0, 0]);
    assert!(matches!(
        context.write_input(&frame, 0.0, 1.0),
        Err(SegmentError::InvalidShape(_))
    ));
}

#[test]
fn test_unsupported_output_type() {
    let mut config = FakeConfig::new(2, 2);
    config.output_type = ElementType::Float32;
    let mut context = built_context(&config);
    context.allocate_tensors(AllocationMode::Default).unwrap();
    context.invoke().unwrap();
    assert!(matches!(
        context.class_map(),
        Err(SegmentError::UnsupportedOutputType(ElementType::Float32))
    ));
}

#[test]
fn test_invocation_failure_fails_context() {
    let mut config = FakeConfig::new(2, 2);
    config.fail_invoke = true;
    let mut context = built_context(&config);
    context.allocate_tensors(AllocationMode::Default).unwrap();
    assert!(matches!(context.invoke(), Err(SegmentError::Invocation(_))));
    assert_eq!(context.state(), ContextState::Failed);
    assert!(matches!(context.class_map(), Err(SegmentError::State { .. })));
}
