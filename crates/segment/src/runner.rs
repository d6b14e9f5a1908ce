use {
    crate::{ClassMap, ExecutionContext, SegmentError},
    base::*,
    std::{
        fmt,
        time::{Duration, Instant},
    },
};

/// Wall-clock timing of the timed invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    pub iterations: usize,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl LatencyStats {
    pub fn average(&self) -> Duration {
        if self.iterations == 0 {
            Duration::ZERO
        } else {
            self.total / self.iterations as u32
        }
    }

    /// Total time spent in the timed loop.
    pub fn micros(&self) -> u128 {
        self.total.as_micros()
    }

    pub fn average_millis(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }
}

impl fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} runs, average {:.3} ms (min {:.3} ms, max {:.3} ms)",
            self.iterations,
            self.average_millis(),
            self.min.as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0
        )
    }
}

/// Result of [`InferenceRunner::run`]. The class map borrows the context.
#[derive(Debug)]
pub struct RunOutcome<'a> {
    pub class_map: ClassMap<'a>,
    pub stats: LatencyStats,
}

/// Warmup and timed invocation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceRunner {
    warmup_runs: usize,
    loop_count: usize,
}

impl InferenceRunner {
    pub fn new(warmup_runs: usize, loop_count: usize) -> Result<Self, SegmentError> {
        if loop_count == 0 {
            return Err(SegmentError::Config("loop count must be at least 1".to_string()));
        }
        Ok(Self {
            warmup_runs,
            loop_count,
        })
    }

    pub fn warmup_runs(&self) -> usize {
        self.warmup_runs
    }

    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    /// Runs the warmup invocations untimed, then the timed loop, and reads
    /// the class map produced by the last timed invocation.
    pub fn run<'a>(&self, context: &'a mut ExecutionContext) -> Result<RunOutcome<'a>, SegmentError> {
        for _ in 0..self.warmup_runs {
            context.invoke()?;
        }
        if self.warmup_runs > 0 {
            log_debug!("{} warmup runs done", self.warmup_runs);
        }

        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        let start = Instant::now();
        for _ in 0..self.loop_count {
            let iteration = Instant::now();
            context.invoke()?;
            let elapsed = iteration.elapsed();
            min = min.min(elapsed);
            max = max.max(elapsed);
        }
        let stats = LatencyStats {
            iterations: self.loop_count,
            total: start.elapsed(),
            min,
            max,
        };
        log_info!("inference: {}", stats);

        let context: &'a ExecutionContext = context;
        Ok(RunOutcome {
            class_map: context.class_map()?,
            stats,
        })
    }
}
