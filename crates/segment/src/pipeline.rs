use {
    crate::{
        DelegateManager, ExecutionContext, InferenceRunner, LatencyStats, Runtime, SegmentError,
        SegmentationRenderer, Settings, SharedAllocator, TidlSharedAllocator, preprocess,
    },
    base::*,
    frame::FrameBuffer,
    std::path::PathBuf,
};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub stats: LatencyStats,
    /// Spatial size of the model input.
    pub input_size: Vec2<usize>,
    /// Resolution of the rendered frame.
    pub frame_size: Vec2<usize>,
    /// Where the rendered frame was written, `None` if saving failed.
    pub output_path: Option<PathBuf>,
}

/// Runs the model over `frame` and blends the result into it.
///
/// `allocator` backs zero-copy tensors; when `None` and zero copy is
/// requested, TIDL shared memory is loaded.
pub fn segment_frame(
    settings: &Settings,
    runtime: &dyn Runtime,
    delegates: &mut DelegateManager,
    allocator: Option<Box<dyn SharedAllocator>>,
    frame: &mut FrameBuffer,
) -> Result<(LatencyStats, Vec2<usize>), SegmentError> {
    settings.validate()?;
    let runner = InferenceRunner::new(settings.warmup_runs, settings.loop_count)?;
    let renderer = SegmentationRenderer::new(settings.alpha)?;

    let mut context = ExecutionContext::new();
    context.set_verbose(settings.verbose);
    if let Some(threads) = settings.num_threads {
        context.set_num_threads(threads)?;
    }
    context.load_model(runtime, &settings.model_path)?;
    context.build_graph()?;

    if settings.accelerated {
        let backend = delegates.load_backend(&settings.delegate)?;
        let delegate = delegates.create_delegate(&*backend, &settings.delegate_options())?;
        delegates.attach(&mut context, delegate)?;
    }

    let mode = settings.allocation_mode();
    if settings.device_mem {
        let allocator: Box<dyn SharedAllocator> = match allocator {
            Some(allocator) => allocator,
            None => Box::new(TidlSharedAllocator::load(TidlSharedAllocator::DEFAULT_LIBRARY)?),
        };
        context.set_allocator(allocator)?;
    }
    context.allocate_tensors(mode)?;

    let input = context
        .inputs()
        .first()
        .cloned()
        .ok_or_else(|| SegmentError::InvalidShape("graph has no inputs".to_string()))?;
    let input_size = preprocess::spatial_size(&input)?;
    let fitted = preprocess::fit_frame(frame, &input)?;
    context.write_input(&fitted, settings.input_mean, settings.input_std)?;

    let stats = {
        let outcome = runner.run(&mut context)?;
        renderer.render(frame, &outcome.class_map)?;
        outcome.stats
    };
    context.finish()?;
    log_info!("average time: {:.3} ms", stats.average_millis());
    Ok((stats, input_size))
}

/// Loads the image, segments it and writes the blended result.
///
/// Failing to write the output is reported, not fatal.
pub async fn run_pipeline(
    settings: &Settings,
    runtime: &dyn Runtime,
    delegates: &mut DelegateManager,
    allocator: Option<Box<dyn SharedAllocator>>,
) -> Result<PipelineReport, SegmentError> {
    settings.validate()?;
    let mut image = frame::load_frame(&settings.image_path).await?;
    log_info!("loaded {} ({})", settings.image_path.display(), image.size);

    let (stats, input_size) = segment_frame(settings, runtime, delegates, allocator, &mut image)?;
    let frame_size = image.size;

    let output_path = match frame::save_frame(image, &settings.output_path).await {
        Ok(()) => {
            log_info!("saved {}", settings.output_path.display());
            Some(settings.output_path.clone())
        }
        Err(e) => {
            log_warn!("saving {} failed: {}", settings.output_path.display(), e);
            None
        }
    };

    Ok(PipelineReport {
        stats,
        input_size,
        frame_size,
        output_path,
    })
}
