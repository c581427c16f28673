//! Fixed-rate producer
//!
//! Reads the stick once per period and offers the sample to the queue with a
//! zero wait. A full queue drops the sample; a failed read skips the tick.
//! Neither stops the loop.

use super::PipelineCounters;
use crate::acquisition::{AxisReading, RawSample, ReadError, SampleReader, ADC_MAX};
use crate::channel::SampleProducer;
use chrono::Local;
use statum::{machine, state};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct SourceSettings {
    pub period: Duration,
    pub stats_interval: chrono::Duration,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(100),
            stats_interval: chrono::Duration::seconds(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to initialize sample source: {0}")]
    InitializationError(String),
}

/// Result of a single sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Enqueued(u64),
    Dropped(u64),
    /// Consumer is gone; the sample was dropped
    Closed(u64),
    ReadFailed,
}

#[state]
#[derive(Debug, Clone)]
pub enum SourceState {
    Initializing,
    Sampling,
}

#[machine]
pub struct SampleSource<S: SourceState> {
    reader: Box<dyn SampleReader>,
    producer: SampleProducer,
    settings: SourceSettings,
    counters: Arc<PipelineCounters>,
    next_sequence: u64,
}

impl SampleSource<Initializing> {
    pub fn create(
        reader: Box<dyn SampleReader>,
        producer: SampleProducer,
        settings: SourceSettings,
        counters: Arc<PipelineCounters>,
    ) -> Self {
        debug!("Creating sample source with settings: {:?}", settings);
        Self::new(reader, producer, settings, counters, 0)
    }

    pub fn initialize(self) -> Result<SampleSource<Sampling>, SourceError> {
        if self.settings.period.is_zero() {
            return Err(SourceError::InitializationError(
                "sampling period must be greater than zero".to_string(),
            ));
        }

        info!(
            "Sample source ready: reader '{}', period {} ms",
            self.reader.name(),
            self.settings.period.as_millis()
        );
        Ok(self.transition())
    }
}

impl SampleSource<Sampling> {
    /// Reads once and offers the sample to the queue
    pub fn sample_once(&mut self) -> TickOutcome {
        let reading = match self.reader.read().and_then(check_range) {
            Ok(reading) => reading,
            Err(e) => {
                self.counters.record_read_failure();
                warn!("Read from '{}' failed: {}", self.reader.name(), e);
                return TickOutcome::ReadFailed;
            }
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let sample = RawSample::new(reading, Instant::now(), sequence);

        if self.producer.try_enqueue(sample) {
            debug!(
                "Sample #{} queued: x={} y={} button={}",
                sequence, reading.x_raw, reading.y_raw, reading.button_pressed
            );
            TickOutcome::Enqueued(sequence)
        } else if self.producer.is_closed() {
            warn!("Sample queue closed, sample #{} dropped", sequence);
            TickOutcome::Closed(sequence)
        } else {
            warn!("Sample queue full, sample #{} dropped", sequence);
            TickOutcome::Dropped(sequence)
        }
    }

    /// Ticks at the configured period until `token` is cancelled
    pub async fn run_sampling_loop(mut self, token: CancellationToken) {
        info!(
            "Starting sampling loop at {} ms",
            self.settings.period.as_millis()
        );

        let mut ticker = tokio::time::interval(self.settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut ticks: u64 = 0;
        let mut dropped: u64 = 0;
        let mut failed: u64 = 0;
        let mut last_stats_time = Local::now();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Sampling loop stopped after {} samples", self.next_sequence);
                    break;
                }
                _ = ticker.tick() => {}
            }

            if self.producer.is_closed() {
                warn!("Sample consumer is gone, stopping sampling loop");
                break;
            }

            ticks += 1;
            match self.sample_once() {
                TickOutcome::Enqueued(_) => {}
                TickOutcome::Dropped(_) => dropped += 1,
                TickOutcome::ReadFailed => failed += 1,
                TickOutcome::Closed(_) => break,
            }

            let now = Local::now();
            if now - last_stats_time > self.settings.stats_interval {
                info!(
                    "Sampler stats: {} ticks, {} dropped, {} read failures in last {} seconds",
                    ticks,
                    dropped,
                    failed,
                    (now - last_stats_time).num_seconds()
                );
                ticks = 0;
                dropped = 0;
                failed = 0;
                last_stats_time = now;
            }
        }
    }
}

fn check_range(reading: AxisReading) -> Result<AxisReading, ReadError> {
    for (channel, value) in [("x", reading.x_raw), ("y", reading.y_raw)] {
        if value > ADC_MAX {
            return Err(ReadError::OutOfRange {
                channel,
                value,
                max: ADC_MAX,
            });
        }
    }
    Ok(reading)
}
