//! Acquisition-to-command pipeline
//!
//! Two tokio tasks joined by a bounded sample queue:
//!
//! 1. [`sample_source`] - fixed-rate sampling, drop-on-full enqueue
//! 2. [`command_processor`] - calibration, resolution, hand-off to the sink
//! 3. [`pipeline_handle`] - construction, recalibration, shutdown
//!
//! ```text
//! SampleReader ──► SampleSource ──► [queue] ──► CommandProcessor ──► CommandSink
//!                  (period tick)               (calibrate + resolve)
//! ```
//!
//! Both loops stop cooperatively on a shared cancellation token.

pub mod command_processor;
pub mod pipeline_handle;
pub mod sample_source;

pub use command_processor::{CommandProcessor, ProcessorCommand, ProcessorError};
pub use pipeline_handle::PipelineHandle;
pub use sample_source::{SampleSource, SourceError, TickOutcome};

use crate::channel::{ChannelError, ChannelStats};
use crate::config::ConfigError;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    #[error("Processor error: {0}")]
    ProcessorError(#[from] ProcessorError),

    #[error("Channel error: {0}")]
    ChannelError(#[from] ChannelError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Pipeline is not running: {0}")]
    NotRunning(String),

    #[error("Task failed: {0}")]
    TaskError(String),
}

/// Counters updated by the two tasks
#[derive(Debug, Default)]
pub struct PipelineCounters {
    read_failures: AtomicU64,
    emitted: AtomicU64,
    sink_failures: AtomicU64,
    calibrations: AtomicU64,
}

impl PipelineCounters {
    pub(crate) fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_calibration(&self) {
        self.calibrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, channel: &ChannelStats) -> PipelineStats {
        PipelineStats {
            accepted: channel.accepted(),
            dropped: channel.dropped(),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            calibrations: self.calibrations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Samples queued for the processor
    pub accepted: u64,
    /// Samples rejected because the queue was full
    pub dropped: u64,
    pub read_failures: u64,
    /// Commands the sink accepted
    pub emitted: u64,
    pub sink_failures: u64,
    pub calibrations: u64,
}
