use {
    crate::{AllocationMode, DelegateOptions, SegmentError},
    std::path::PathBuf,
};

/// Everything one segmentation run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub image_path: PathBuf,
    pub output_path: PathBuf,
    pub accelerated: bool,
    /// Registered backend name or path of a delegate plugin library.
    pub delegate: String,
    pub device_mem: bool,
    pub artifact_path: PathBuf,
    pub num_threads: Option<usize>,
    pub loop_count: usize,
    pub warmup_runs: usize,
    pub input_mean: f32,
    pub input_std: f32,
    pub alpha: f32,
    pub verbose: bool,
    pub runtime_library: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            image_path: PathBuf::new(),
            output_path: PathBuf::from("segmentation.jpg"),
            accelerated: false,
            delegate: "libtidl_tfl_delegate.so".to_string(),
            device_mem: false,
            artifact_path: PathBuf::from("model-artifacts"),
            num_threads: None,
            loop_count: 1,
            warmup_runs: 2,
            input_mean: 127.5,
            input_std: 127.5,
            alpha: 0.4,
            verbose: false,
            runtime_library: tflite::DEFAULT_LIBRARY.to_string(),
            log_dir: None,
        }
    }
}

impl Settings {
    pub fn new(model_path: impl Into<PathBuf>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            image_path: image_path.into(),
            ..Self::default()
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_accelerated(mut self, accelerated: bool) -> Self {
        self.accelerated = accelerated;
        self
    }

    pub fn with_delegate(mut self, delegate: impl Into<String>) -> Self {
        self.delegate = delegate.into();
        self
    }

    pub fn with_device_mem(mut self, device_mem: bool) -> Self {
        self.device_mem = device_mem;
        self
    }

    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn with_loop_count(mut self, loop_count: usize) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_warmup_runs(mut self, warmup_runs: usize) -> Self {
        self.warmup_runs = warmup_runs;
        self
    }

    pub fn with_input_mean(mut self, mean: f32) -> Self {
        self.input_mean = mean;
        self
    }

    pub fn with_input_std(mut self, std: f32) -> Self {
        self.input_std = std;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_runtime_library(mut self, library: impl Into<String>) -> Self {
        self.runtime_library = library.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn allocation_mode(&self) -> AllocationMode {
        if self.device_mem {
            AllocationMode::ZeroCopy
        } else {
            AllocationMode::Default
        }
    }

    pub fn delegate_options(&self) -> DelegateOptions {
        DelegateOptions::new(&self.artifact_path)
    }

    pub fn validate(&self) -> Result<(), SegmentError> {
        if self.model_path.as_os_str().is_empty() {
            return Err(SegmentError::Config("no model path given".to_string()));
        }
        if self.image_path.as_os_str().is_empty() {
            return Err(SegmentError::Config("no image path given".to_string()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(SegmentError::Config("no output path given".to_string()));
        }
        if self.loop_count == 0 {
            return Err(SegmentError::Config("loop count must be at least 1".to_string()));
        }
        if self.num_threads == Some(0) {
            return Err(SegmentError::Config("thread count must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SegmentError::Config(format!(
                "alpha {} outside [0, 1]",
                self.alpha
            )));
        }
        if self.input_std == 0.0 || !self.input_std.is_finite() {
            return Err(SegmentError::Config(format!(
                "input std {} is not a usable divisor",
                self.input_std
            )));
        }
        if self.accelerated && self.delegate.is_empty() {
            return Err(SegmentError::Config("no delegate given".to_string()));
        }
        Ok(())
    }
}
