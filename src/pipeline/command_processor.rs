//! Consumer side: waits for samples, calibrates, resolves, emits
//!
//! # State Machine
//!
//! ```text
//! Waiting ──sample──► Resolving(RawSample) ──► Emitting(Resolved) ──► Waiting
//!    │
//!    └── Recalibrate request: reset origin, keep waiting
//! ```

use super::PipelineCounters;
use crate::acquisition::RawSample;
use crate::calibration::{ButtonHoldTrigger, CalibrationOrigin, CalibrationState};
use crate::channel::SampleConsumer;
use crate::resolver::{DirectionResolver, ResolvedCommand};
use crate::sink::CommandSink;
use chrono::Local;
use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Out-of-band requests to the running processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorCommand {
    Recalibrate,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("State data missing in {0} state")]
    MissingStateData(&'static str),
}

/// A sample together with the command resolved from it
#[derive(Debug, Clone)]
pub struct Resolved {
    pub sample: RawSample,
    pub origin: CalibrationOrigin,
    pub command: ResolvedCommand,
}

#[derive(Clone, Debug)]
pub struct ProcessorSettings {
    pub stats_interval: chrono::Duration,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            stats_interval: chrono::Duration::seconds(10),
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum ProcessingState {
    Waiting,
    Resolving(RawSample),
    Emitting(Resolved),
}

#[machine]
pub struct CommandProcessor<S: ProcessingState> {
    consumer: SampleConsumer,
    control_receiver: mpsc::Receiver<ProcessorCommand>,
    calibration: CalibrationState,
    hold_trigger: Option<ButtonHoldTrigger>,
    resolver: DirectionResolver,
    sink: Box<dyn CommandSink>,
    settings: ProcessorSettings,
    counters: Arc<PipelineCounters>,
}

/// What ended a wait
pub enum WaitOutcome {
    Sample(CommandProcessor<Resolving>),
    Stopped,
}

impl<S: ProcessingState> CommandProcessor<S> {
    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }
}

impl CommandProcessor<Waiting> {
    pub fn create(
        consumer: SampleConsumer,
        control_receiver: mpsc::Receiver<ProcessorCommand>,
        resolver: DirectionResolver,
        button_hold_samples: u32,
        sink: Box<dyn CommandSink>,
        settings: ProcessorSettings,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        info!(
            "Creating command processor: mode {}, sink '{}', hold trigger {}",
            resolver.mode(),
            sink.name(),
            if button_hold_samples == 0 {
                "disabled".to_string()
            } else {
                format!("{} samples", button_hold_samples)
            }
        );

        Self::new(
            consumer,
            control_receiver,
            CalibrationState::new(),
            ButtonHoldTrigger::new(button_hold_samples),
            resolver,
            sink,
            settings,
            counters,
        )
    }

    /// Suspends until a sample arrives, the token is cancelled, or the
    /// producer goes away. Recalibration requests are handled in place.
    pub async fn wait_for_sample(mut self, token: &CancellationToken) -> WaitOutcome {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Processor wait cancelled");
                    return WaitOutcome::Stopped;
                }
                Some(command) = self.control_receiver.recv() => {
                    self.handle_command(command);
                }
                sample = self.consumer.dequeue() => {
                    return match sample {
                        Some(sample) => {
                            debug!("Dequeued sample #{}", sample.sequence());
                            WaitOutcome::Sample(self.transition_with(sample))
                        }
                        None => {
                            warn!("Sample producer closed the queue");
                            WaitOutcome::Stopped
                        }
                    };
                }
            }
        }
    }

    fn handle_command(&mut self, command: ProcessorCommand) {
        match command {
            ProcessorCommand::Recalibrate => {
                info!("Recalibration requested, next sample becomes the origin");
                self.calibration.reset();
            }
        }
    }
}

impl CommandProcessor<Resolving> {
    pub fn resolve(mut self) -> Result<CommandProcessor<Emitting>, ProcessorError> {
        let sample = match self.get_state_data() {
            Some(sample) => *sample,
            None => return Err(ProcessorError::MissingStateData("Resolving")),
        };

        let calibrations_before = self.calibration.calibrations();
        let origin = self.calibration.observe(&sample);
        if self.calibration.calibrations() != calibrations_before {
            self.counters.record_calibration();
        }

        let command = self.resolver.resolve(&sample, &origin);
        debug!(
            "Sample #{} resolved to {} ({:?} after capture)",
            sample.sequence(),
            command,
            sample.timestamp().elapsed()
        );

        if let Some(trigger) = &mut self.hold_trigger {
            if trigger.update(sample.button_pressed()) {
                info!("Button hold detected, next sample becomes the origin");
                self.calibration.reset();
            }
        }

        Ok(self.transition_with(Resolved {
            sample,
            origin,
            command,
        }))
    }
}

impl CommandProcessor<Emitting> {
    /// Hands the command to the sink. Sink failures are logged and counted.
    pub fn emit(mut self) -> Result<CommandProcessor<Waiting>, ProcessorError> {
        let (command, sequence) = match self.get_state_data() {
            Some(resolved) => (resolved.command, resolved.sample.sequence()),
            None => return Err(ProcessorError::MissingStateData("Emitting")),
        };

        match self.sink.emit(&command) {
            Ok(()) => self.counters.record_emitted(),
            Err(e) => {
                self.counters.record_sink_failure();
                error!(
                    "Sink '{}' rejected command for sample #{}: {}",
                    self.sink.name(),
                    sequence,
                    e
                );
            }
        }

        Ok(self.transition())
    }
}

/// Runs wait/resolve/emit cycles until stopped
pub async fn run_processor_loop(
    mut processor: CommandProcessor<Waiting>,
    token: CancellationToken,
) -> Result<(), ProcessorError> {
    info!("Entering command processor loop");

    let stats_interval = processor.settings().stats_interval;
    let mut cycles: u64 = 0;
    let mut last_stats_time = Local::now();

    loop {
        let resolving = match processor.wait_for_sample(&token).await {
            WaitOutcome::Sample(resolving) => resolving,
            WaitOutcome::Stopped => break,
        };

        processor = resolving.resolve()?.emit()?;
        cycles += 1;

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Processor stats: {} commands in {} seconds ({:.2}/sec)",
                cycles,
                elapsed_seconds,
                cycles as f64 / elapsed_seconds as f64
            );
            cycles = 0;
            last_stats_time = now;
        }
    }

    info!("Command processor loop finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{AxisReading, RawSample};
    use crate::channel::{bounded_sample_channel, SampleProducer};
    use crate::resolver::{DiscreteThresholds, PolarCommand, PolarSettings, ResolverMode};
    use crate::sink::ChannelSink;
    use std::time::Instant;

    struct Fixture {
        producer: SampleProducer,
        control: mpsc::Sender<ProcessorCommand>,
        commands: mpsc::Receiver<ResolvedCommand>,
        counters: Arc<PipelineCounters>,
        processor: CommandProcessor<Waiting>,
    }

    fn fixture(hold_samples: u32) -> Fixture {
        let (producer, consumer) = bounded_sample_channel(16).unwrap();
        let (control, control_receiver) = mpsc::channel(4);
        let (command_tx, commands) = mpsc::channel(16);
        let counters = Arc::new(PipelineCounters::default());
        let resolver = DirectionResolver::new(
            ResolverMode::Polar,
            DiscreteThresholds::default(),
            PolarSettings::default(),
        );
        let processor = CommandProcessor::create(
            consumer,
            control_receiver,
            resolver,
            hold_samples,
            Box::new(ChannelSink::new(command_tx)),
            ProcessorSettings::default(),
            counters.clone(),
        );
        Fixture {
            producer,
            control,
            commands,
            counters,
            processor,
        }
    }

    fn push(producer: &SampleProducer, sequence: u64, x: u16, y: u16, pressed: bool) {
        assert!(producer.try_enqueue(RawSample::new(
            AxisReading::new(x, y, pressed),
            Instant::now(),
            sequence,
        )));
    }

    async fn cycle(
        processor: CommandProcessor<Waiting>,
        token: &CancellationToken,
    ) -> CommandProcessor<Waiting> {
        match processor.wait_for_sample(token).await {
            WaitOutcome::Sample(resolving) => resolving.resolve().unwrap().emit().unwrap(),
            WaitOutcome::Stopped => panic!("processor stopped unexpectedly"),
        }
    }

    fn polar(command: ResolvedCommand) -> PolarCommand {
        match command {
            ResolvedCommand::Polar(polar) => polar,
            other => panic!("expected polar command, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn first_sample_calibrates_then_resolves_relative_to_it() {
        let mut f = fixture(0);
        let token = CancellationToken::new();
        push(&f.producer, 0, 2048, 2048, false);
        push(&f.producer, 1, 2048, 1000, false);

        let processor = cycle(f.processor, &token).await;
        let processor = cycle(processor, &token).await;

        let rest = polar(f.commands.recv().await.unwrap());
        assert_eq!(rest.power_percent, 0);
        assert_eq!(rest.angle_deg, 0.0);

        let pushed = polar(f.commands.recv().await.unwrap());
        assert_eq!(pushed.power_percent, 75);
        assert!((pushed.angle_deg - 270.0).abs() < 1e-9);

        assert_eq!(
            processor.calibration().origin(),
            Some(CalibrationOrigin {
                origin_x: 2048,
                origin_y: 2048
            })
        );
        let stats = f.counters.snapshot(&crate::channel::ChannelStats::default());
        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.calibrations, 1);
    }

    #[tokio::test]
    async fn recalibrate_request_moves_origin_to_next_sample() {
        let f = fixture(0);
        let token = CancellationToken::new();
        push(&f.producer, 0, 1500, 1500, false);
        let processor = cycle(f.processor, &token).await;

        // The request is handled before the queued sample
        f.control.send(ProcessorCommand::Recalibrate).await.unwrap();
        push(&f.producer, 1, 2100, 1900, false);
        let processor = cycle(processor, &token).await;

        assert_eq!(
            processor.calibration().origin(),
            Some(CalibrationOrigin {
                origin_x: 2100,
                origin_y: 1900
            })
        );
        assert_eq!(processor.calibration().calibrations(), 2);
    }

    #[tokio::test]
    async fn button_hold_resets_calibration() {
        let f = fixture(2);
        let token = CancellationToken::new();
        push(&f.producer, 0, 2000, 2000, false);
        push(&f.producer, 1, 2000, 2000, true);
        push(&f.producer, 2, 2000, 2000, true);
        push(&f.producer, 3, 2222, 1888, false);

        let mut processor = f.processor;
        for _ in 0..3 {
            processor = cycle(processor, &token).await;
        }
        assert!(!processor.calibration().is_calibrated());

        let processor = cycle(processor, &token).await;
        assert_eq!(
            processor.calibration().origin(),
            Some(CalibrationOrigin {
                origin_x: 2222,
                origin_y: 1888
            })
        );
    }

    #[tokio::test]
    async fn sink_failure_is_counted_not_fatal() {
        let f = fixture(0);
        let token = CancellationToken::new();
        drop(f.commands);
        push(&f.producer, 0, 2048, 2048, false);
        push(&f.producer, 1, 2048, 2048, false);

        let processor = cycle(f.processor, &token).await;
        let _processor = cycle(processor, &token).await;

        let stats = f.counters.snapshot(&crate::channel::ChannelStats::default());
        assert_eq!(stats.emitted, 0);
        assert_eq!(stats.sink_failures, 2);
    }

    #[tokio::test]
    async fn cancelled_wait_stops() {
        let f = fixture(0);
        let token = CancellationToken::new();
        token.cancel();
        // Pending samples are not consumed once stopped
        push(&f.producer, 0, 2048, 2048, false);
        assert!(matches!(
            f.processor.wait_for_sample(&token).await,
            WaitOutcome::Stopped
        ));
    }

    #[tokio::test]
    async fn closed_queue_stops_loop() {
        let f = fixture(0);
        push(&f.producer, 0, 2048, 2048, false);
        drop(f.producer);

        run_processor_loop(f.processor, CancellationToken::new())
            .await
            .unwrap();
        let stats = f.counters.snapshot(&crate::channel::ChannelStats::default());
        assert_eq!(stats.emitted, 1);
    }
}
