//! Pipeline Handle - owns the two tasks and the objects they share
//!
//! Everything the tasks need (queue halves, calibration, resolver, sink) is
//! built here once and moved into the tasks. The handle keeps only the
//! cancellation token, the recalibration sender and the counters.

use super::command_processor::{
    run_processor_loop, CommandProcessor, ProcessorCommand, ProcessorSettings,
};
use super::sample_source::{SampleSource, SourceSettings};
use super::{PipelineCounters, PipelineError, PipelineStats};
use crate::acquisition::SampleReader;
use crate::channel::{bounded_sample_channel, ChannelStats};
use crate::config::PipelineConfig;
use crate::resolver::DirectionResolver;
use crate::sink::CommandSink;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub struct PipelineHandle {
    token: CancellationToken,
    control_sender: mpsc::Sender<ProcessorCommand>,
    source_task: JoinHandle<()>,
    processor_task: JoinHandle<()>,
    channel_stats: Arc<ChannelStats>,
    counters: Arc<PipelineCounters>,
}

impl PipelineHandle {
    /// Builds the pipeline from `config` and spawns both tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: &PipelineConfig,
        reader: Box<dyn SampleReader>,
        sink: Box<dyn CommandSink>,
    ) -> Result<Self, PipelineError> {
        info!(
            "Initializing pipeline: {} ms period, queue of {}, {} mode",
            config.sampling.period_ms, config.sampling.channel_capacity, config.resolver.mode
        );

        let (producer, consumer) = bounded_sample_channel(config.sampling.channel_capacity)?;
        let channel_stats = producer.stats();
        let counters = Arc::new(PipelineCounters::default());
        let (control_sender, control_receiver) = mpsc::channel(8);
        let token = CancellationToken::new();
        let stats_interval = config.sampling.stats_interval()?;

        let resolver = DirectionResolver::new(
            config.resolver.mode,
            config.resolver.thresholds(),
            config.resolver.polar(),
        );
        let processor = CommandProcessor::create(
            consumer,
            control_receiver,
            resolver,
            config.calibration.button_hold_samples,
            sink,
            ProcessorSettings { stats_interval },
            counters.clone(),
        );

        let source = SampleSource::create(
            reader,
            producer,
            SourceSettings {
                period: config.sampling.period(),
                stats_interval,
            },
            counters.clone(),
        )
        .initialize()?;

        // Consumer first so it is already waiting when the first sample lands
        let processor_token = token.clone();
        let processor_task = tokio::spawn(async move {
            if let Err(e) = run_processor_loop(processor, processor_token).await {
                error!("Command processor terminated with error: {}", e);
            }
        });
        debug!("Command processor task spawned");

        let source_token = token.clone();
        let source_task = tokio::spawn(source.run_sampling_loop(source_token));
        debug!("Sample source task spawned");

        info!("Pipeline running");
        Ok(Self {
            token,
            control_sender,
            source_task,
            processor_task,
            channel_stats,
            counters,
        })
    }

    /// Asks the processor to take the next sample as the new origin
    pub async fn recalibrate(&self) -> Result<(), PipelineError> {
        self.control_sender
            .send(ProcessorCommand::Recalibrate)
            .await
            .map_err(|_| PipelineError::NotRunning("command processor has stopped".to_string()))
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot(&self.channel_stats)
    }

    /// Token that stops both tasks when cancelled
    pub fn stop_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stops both loops, waits for them and returns the final counters
    pub async fn shutdown(self) -> Result<PipelineStats, PipelineError> {
        info!("Shutting down pipeline");
        self.token.cancel();

        self.source_task
            .await
            .map_err(|e| PipelineError::TaskError(format!("sample source: {}", e)))?;
        self.processor_task
            .await
            .map_err(|e| PipelineError::TaskError(format!("command processor: {}", e)))?;

        let stats = self.counters.snapshot(&self.channel_stats);
        info!("Pipeline stopped: {:?}", stats);
        Ok(stats)
    }
}
