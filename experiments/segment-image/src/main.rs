//! segment-image - run a segmentation model on one image and blend the
//! class map over it.

use anyhow::{Context, Result};
use base::*;
use clap::{ArgAction, Parser, builder::BoolishValueParser};
use segment::{DelegateManager, Settings, backends::TfLiteRuntime, run_pipeline};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "segment-image")]
#[command(about = "Semantic segmentation of a single image with an optional accelerator delegate", long_about = None)]
struct Cli {
    /// TFLite model file
    #[arg(short = 'm', long = "tflite_model", value_name = "MODEL")]
    model: PathBuf,

    /// Input image
    #[arg(short = 'i', long = "image", value_name = "IMAGE")]
    image: PathBuf,

    /// Output image, format taken from the extension
    #[arg(short = 'o', long = "output", default_value = "segmentation.jpg")]
    output: PathBuf,

    /// Offload to the accelerator delegate [0|1]
    #[arg(short = 'a', long = "accelerated", default_value = "0", value_parser = BoolishValueParser::new(), action = ArgAction::Set)]
    accelerated: bool,

    /// Delegate backend name or plugin library
    #[arg(long = "delegate", default_value = "libtidl_tfl_delegate.so")]
    delegate: String,

    /// Bind tensors to accelerator shared memory [0|1]
    #[arg(short = 'd', long = "device_mem", default_value = "0", value_parser = BoolishValueParser::new(), action = ArgAction::Set)]
    device_mem: bool,

    /// Folder with the compiled delegate artifacts
    #[arg(short = 'f', long = "artifact_path", default_value = "model-artifacts")]
    artifact_path: PathBuf,

    /// Timed invocations
    #[arg(short = 'c', long = "count", default_value = "1")]
    count: usize,

    /// Untimed invocations before the timed loop
    #[arg(short = 'w', long = "warmup_runs", default_value = "2")]
    warmup_runs: usize,

    /// Worker threads, runtime default when absent
    #[arg(short = 't', long = "threads")]
    threads: Option<usize>,

    /// Input mean
    #[arg(short = 'b', long = "input_mean", default_value = "127.5")]
    input_mean: f32,

    /// Input standard deviation
    #[arg(short = 's', long = "input_std", default_value = "127.5")]
    input_std: f32,

    /// Weight of the original pixel in the blend, 0 to 1
    #[arg(long = "alpha", default_value = "0.4")]
    alpha: f32,

    /// Print tensor metadata and debug logs [0|1]
    #[arg(short = 'v', long = "verbose", default_value = "0", value_parser = BoolishValueParser::new(), action = ArgAction::Set)]
    verbose: bool,

    /// TFLite C runtime library
    #[arg(long = "runtime_library", default_value = "libtensorflowlite_c.so")]
    runtime_library: String,

    /// Write logs to dated files in this directory instead of stdout
    #[arg(long = "log_dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn into_settings(self) -> Settings {
        let mut settings = Settings::new(self.model, self.image)
            .with_output_path(self.output)
            .with_accelerated(self.accelerated)
            .with_delegate(self.delegate)
            .with_device_mem(self.device_mem)
            .with_artifact_path(self.artifact_path)
            .with_loop_count(self.count)
            .with_warmup_runs(self.warmup_runs)
            .with_input_mean(self.input_mean)
            .with_input_std(self.input_std)
            .with_alpha(self.alpha)
            .with_verbose(self.verbose)
            .with_runtime_library(self.runtime_library);
        if let Some(threads) = self.threads {
            settings = settings.with_num_threads(threads);
        }
        if let Some(dir) = self.log_dir {
            settings = settings.with_log_dir(dir);
        }
        settings
    }
}

async fn run(settings: Settings) -> Result<()> {
    settings.validate()?;
    let runtime = TfLiteRuntime::load(&settings.runtime_library)
        .with_context(|| format!("opening {}", settings.runtime_library))?;
    let mut delegates = DelegateManager::new();

    let report = run_pipeline(&settings, &runtime, &mut delegates, None)
        .await
        .with_context(|| format!("segmenting {}", settings.image_path.display()))?;

    log_info!(
        "model input {}, frame {}, {}",
        report.input_size,
        report.frame_size,
        report.stats
    );
    match &report.output_path {
        Some(path) => log_info!("wrote {}", path.display()),
        None => log_warn!("no output written"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let settings = Cli::parse().into_settings();

    match &settings.log_dir {
        Some(dir) => {
            if let Err(e) = init_file_logger(dir) {
                init_stdout_logger();
                log_warn!("cannot log to {}: {}", dir.display(), e);
            }
        }
        None => init_stdout_logger(),
    }
    set_max_level(if settings.verbose {
        Level::Debug
    } else {
        Level::Info
    });
    log_debug!("{:?}", settings);

    if let Err(e) = run(settings).await {
        log_fatal!("{:#}", e);
    }
}
