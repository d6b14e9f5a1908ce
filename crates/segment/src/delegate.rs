use {
    crate::{ExecutionContext, SegmentError},
    base::*,
    libloading::Library,
    std::{
        collections::HashMap,
        ffi::{CStr, CString, c_char, c_void},
        fmt,
        path::PathBuf,
        ptr::NonNull,
        sync::Arc,
    },
};

/// Accelerator-owned delegate object.
pub trait DelegateHandle {
    /// Pointer handed to the runtime when the delegate is applied.
    fn as_raw(&self) -> *mut c_void;
}

/// Capability to run part of a graph on an accelerator.
pub struct Delegate {
    backend: String,
    handle: Box<dyn DelegateHandle>,
}

impl Delegate {
    pub fn new(backend: impl Into<String>, handle: Box<dyn DelegateHandle>) -> Self {
        Self {
            backend: backend.into(),
            handle,
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.handle.as_raw()
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("backend", &self.backend)
            .field("handle", &self.handle.as_raw())
            .finish()
    }
}

/// Options passed to a delegate plugin as string key/value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegateOptions {
    pub artifacts_folder: PathBuf,
    pub num_tidl_subgraphs: usize,
    pub debug_level: u32,
    /// Extra keys, passed through untouched. A key that names one of the
    /// typed options replaces it.
    pub extra: Vec<(String, String)>,
}

impl Default for DelegateOptions {
    fn default() -> Self {
        Self {
            artifacts_folder: PathBuf::from("model-artifacts"),
            num_tidl_subgraphs: 16,
            debug_level: 0,
            extra: Vec::new(),
        }
    }
}

impl DelegateOptions {
    pub fn new(artifacts_folder: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_folder: artifacts_folder.into(),
            ..Self::default()
        }
    }

    pub fn with_num_tidl_subgraphs(mut self, count: usize) -> Self {
        self.num_tidl_subgraphs = count;
        self
    }

    pub fn with_debug_level(mut self, level: u32) -> Self {
        self.debug_level = level;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                "artifacts_folder".to_string(),
                self.artifacts_folder.to_string_lossy().into_owned(),
            ),
            (
                "num_tidl_subgraphs".to_string(),
                self.num_tidl_subgraphs.to_string(),
            ),
            ("debug_level".to_string(), self.debug_level.to_string()),
        ];
        for (key, value) in &self.extra {
            match pairs.iter_mut().find(|(k, _)| k == key) {
                Some(pair) => pair.1 = value.clone(),
                None => pairs.push((key.clone(), value.clone())),
            }
        }
        pairs
    }
}

/// Factory for delegates of one accelerator.
pub trait Backend {
    fn name(&self) -> &str;
    fn create_delegate(&self, options: &DelegateOptions) -> Result<Delegate, SegmentError>;
}

pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let name = backend.name().to_string();
        self.backends.insert(name, backend);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

type ReportErrorFn = unsafe extern "C" fn(*const c_char);
type CreateDelegateFn = unsafe extern "C" fn(
    *mut *mut c_char,
    *mut *mut c_char,
    usize,
    Option<ReportErrorFn>,
) -> *mut c_void;
type DestroyDelegateFn = unsafe extern "C" fn(*mut c_void);

unsafe extern "C" fn report_plugin_error(message: *const c_char) {
    if message.is_null() {
        return;
    }
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    log_error!("delegate plugin: {}", message);
}

/// Delegate plugin library exporting `tflite_plugin_create_delegate`.
pub struct PluginBackend {
    name: String,
    library: Arc<Library>,
    create: CreateDelegateFn,
    destroy: Option<DestroyDelegateFn>,
}

impl PluginBackend {
    /// Opens `path` and resolves the plugin entry points.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, SegmentError> {
        let name = name.into();
        let path = path.into();
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            SegmentError::DelegateLoad(format!("cannot open {}: {}", path.display(), e))
        })?;
        let create = unsafe { library.get::<CreateDelegateFn>(b"tflite_plugin_create_delegate\0") }
            .map(|symbol| *symbol)
            .map_err(|e| {
                SegmentError::DelegateLoad(format!(
                    "{} has no tflite_plugin_create_delegate: {}",
                    path.display(),
                    e
                ))
            })?;
        let destroy =
            unsafe { library.get::<DestroyDelegateFn>(b"tflite_plugin_destroy_delegate\0") }
                .map(|symbol| *symbol)
                .ok();
        if destroy.is_none() {
            log_warn!(
                "{} has no tflite_plugin_destroy_delegate, delegates will not be destroyed",
                path.display()
            );
        }
        Ok(Self {
            name,
            library: Arc::new(library),
            create,
            destroy,
        })
    }
}

impl Backend for PluginBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_delegate(&self, options: &DelegateOptions) -> Result<Delegate, SegmentError> {
        let pairs = options.to_pairs();
        let mut keys = Vec::with_capacity(pairs.len());
        let mut values = Vec::with_capacity(pairs.len());
        for (key, value) in &pairs {
            let to_c = |s: &str| {
                CString::new(s).map_err(|_| {
                    SegmentError::DelegateLoad(format!("delegate option {key} contains NUL"))
                })
            };
            keys.push(to_c(key)?);
            values.push(to_c(value)?);
        }
        let mut key_ptrs: Vec<*mut c_char> = keys.iter().map(|k| k.as_ptr() as *mut c_char).collect();
        let mut value_ptrs: Vec<*mut c_char> =
            values.iter().map(|v| v.as_ptr() as *mut c_char).collect();

        let raw = unsafe {
            (self.create)(
                key_ptrs.as_mut_ptr(),
                value_ptrs.as_mut_ptr(),
                pairs.len(),
                Some(report_plugin_error),
            )
        };
        let raw = NonNull::new(raw).ok_or_else(|| {
            SegmentError::DelegateLoad(format!("{} returned no delegate", self.name))
        })?;
        log_info!("created {} delegate with {:?}", self.name, pairs);
        Ok(Delegate::new(
            self.name.clone(),
            Box::new(PluginDelegate {
                raw,
                destroy: self.destroy,
                _library: Arc::clone(&self.library),
            }),
        ))
    }
}

struct PluginDelegate {
    raw: NonNull<c_void>,
    destroy: Option<DestroyDelegateFn>,
    _library: Arc<Library>,
}

impl DelegateHandle for PluginDelegate {
    fn as_raw(&self) -> *mut c_void {
        self.raw.as_ptr()
    }
}

impl Drop for PluginDelegate {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy {
            unsafe { destroy(self.raw.as_ptr()) };
        }
    }
}

/// Resolves accelerator backends and hands their delegates to contexts.
pub struct DelegateManager {
    registry: BackendRegistry,
}

impl DelegateManager {
    pub fn new() -> Self {
        Self::with_registry(BackendRegistry::new())
    }

    pub fn with_registry(registry: BackendRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Looks `name` up in the registry, then falls back to opening it as a
    /// plugin library. Opened plugins are registered for later lookups.
    pub fn load_backend(&mut self, name: &str) -> Result<Arc<dyn Backend>, SegmentError> {
        if let Some(backend) = self.registry.get(name) {
            return Ok(backend);
        }
        let backend: Arc<dyn Backend> = Arc::new(PluginBackend::open(name, name)?);
        self.registry.register(Arc::clone(&backend));
        log_info!("loaded delegate backend {}", name);
        Ok(backend)
    }

    pub fn create_delegate(
        &self,
        backend: &dyn Backend,
        options: &DelegateOptions,
    ) -> Result<Delegate, SegmentError> {
        backend.create_delegate(options)
    }

    /// Attaches `delegate` to a context whose graph is built but not yet allocated.
    pub fn attach(
        &self,
        context: &mut ExecutionContext,
        delegate: Delegate,
    ) -> Result<(), SegmentError> {
        context.attach_delegate(delegate)
    }
}

impl Default for DelegateManager {
    fn default() -> Self {
        Self::new()
    }
}
