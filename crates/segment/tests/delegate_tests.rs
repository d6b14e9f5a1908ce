mod common;

use common::{FakeBackend, FakeConfig, built_context};
use segment::*;
use std::sync::{Arc, atomic::Ordering};

fn manager_with_fake() -> (DelegateManager, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::new());
    let mut registry = BackendRegistry::new();
    registry.register(backend.clone());
    (DelegateManager::with_registry(registry), backend)
}

#[test]
fn test_load_nonexistent_backend() {
    let mut manager = DelegateManager::new();
    let result = manager.load_backend("/nonexistent/libno_such_delegate.so");
    assert!(matches!(result, Err(SegmentError::DelegateLoad(_))));
    assert!(manager.registry().list().is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn test_library_without_entry_point() {
    // loads fine but exports no tflite_plugin_create_delegate
    let mut manager = DelegateManager::new();
    match manager.load_backend("libc.so.6") {
        Err(SegmentError::DelegateLoad(msg)) => {
            assert!(msg.contains("tflite_plugin_create_delegate"), "{msg}")
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("libc.so.6 accepted as a delegate plugin"),
    }
    assert!(manager.registry().list().is_empty());
}

#[test]
fn test_registered_backend_resolves() {
    let (mut manager, fake) = manager_with_fake();
    let backend = manager.load_backend("fake").unwrap();
    assert_eq!(backend.name(), "fake");
    let delegate = manager
        .create_delegate(&*backend, &DelegateOptions::default())
        .unwrap();
    assert_eq!(delegate.backend(), "fake");
    assert_eq!(fake.created.load(Ordering::SeqCst), 1);
    assert_eq!(manager.registry().list(), vec!["fake"]);
}

#[test]
fn test_attach_after_graph_build() {
    let config = FakeConfig::new(4, 4);
    let mut context = built_context(&config);
    let (mut manager, _) = manager_with_fake();
    let backend = manager.load_backend("fake").unwrap();
    let delegate = manager
        .create_delegate(&*backend, &DelegateOptions::default())
        .unwrap();

    manager.attach(&mut context, delegate).unwrap();
    assert_eq!(context.state(), ContextState::DelegateAttached);
    assert_eq!(context.delegate().map(|d| d.backend()), Some("fake"));
    assert_eq!(*config.delegates.lock().unwrap(), vec!["fake".to_string()]);

    context.allocate_tensors(AllocationMode::Default).unwrap();
    assert_eq!(context.state(), ContextState::TensorsAllocated);
}

#[test]
fn test_attach_after_allocation_rejected() {
    let config = FakeConfig::new(4, 4);
    let mut context = built_context(&config);
    context.allocate_tensors(AllocationMode::Default).unwrap();

    let (manager, backend) = manager_with_fake();
    let delegate = manager
        .create_delegate(&*backend, &DelegateOptions::default())
        .unwrap();
    let err = manager.attach(&mut context, delegate);
    assert!(matches!(
        err,
        Err(SegmentError::State {
            operation: "attach delegate",
            ..
        })
    ));
    assert!(context.delegate().is_none());
    assert!(config.delegates.lock().unwrap().is_empty());
}

#[test]
fn test_second_delegate_rejected() {
    let config = FakeConfig::new(4, 4);
    let mut context = built_context(&config);
    let (manager, backend) = manager_with_fake();
    let options = DelegateOptions::default();

    manager
        .attach(&mut context, manager.create_delegate(&*backend, &options).unwrap())
        .unwrap();
    let err = manager.attach(&mut context, manager.create_delegate(&*backend, &options).unwrap());
    assert!(matches!(err, Err(SegmentError::State { .. })));
    assert_eq!(config.delegates.lock().unwrap().len(), 1);
}

#[test]
fn test_attach_before_graph_rejected() {
    let mut context = ExecutionContext::new();
    let (manager, backend) = manager_with_fake();
    let delegate = manager
        .create_delegate(&*backend, &DelegateOptions::default())
        .unwrap();
    assert!(matches!(
        manager.attach(&mut context, delegate),
        Err(SegmentError::State { .. })
    ));
    assert_eq!(context.state(), ContextState::Uninitialized);
}

#[test]
fn test_rejected_delegate_fails_context() {
    let mut config = FakeConfig::new(4, 4);
    config.reject_delegate = true;
    let mut context = built_context(&config);
    let (manager, backend) = manager_with_fake();
    let delegate = manager
        .create_delegate(&*backend, &DelegateOptions::default())
        .unwrap();
    assert!(matches!(
        manager.attach(&mut context, delegate),
        Err(SegmentError::DelegateLoad(_))
    ));
    assert_eq!(context.state(), ContextState::Failed);
}
