//! Bounded single-producer/single-consumer sample queue
//!
//! ```text
//! SampleSource ──try_enqueue──► [ capacity N ] ──dequeue──► CommandProcessor
//!                (drop on full)                 (waits)
//! ```
//!
//! The producer never waits: a full queue rejects the newest sample and
//! counts it as dropped. The consumer suspends until a sample arrives.

use crate::acquisition::RawSample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel capacity must be greater than zero")]
    ZeroCapacity,
}

/// Enqueue accounting shared by both halves.
///
/// Every `try_enqueue` call increments exactly one of the two counters.
#[derive(Debug, Default)]
pub struct ChannelStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl ChannelStats {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn attempts(&self) -> u64 {
        self.accepted() + self.dropped()
    }
}

/// Creates a channel with a fixed capacity
pub fn bounded_sample_channel(
    capacity: usize,
) -> Result<(SampleProducer, SampleConsumer), ChannelError> {
    if capacity == 0 {
        return Err(ChannelError::ZeroCapacity);
    }

    let (sender, receiver) = mpsc::channel(capacity);
    let stats = Arc::new(ChannelStats::default());
    debug!("Created sample channel with capacity {}", capacity);

    Ok((
        SampleProducer {
            sender,
            stats: stats.clone(),
        },
        SampleConsumer {
            receiver,
            stats,
        },
    ))
}

pub struct SampleProducer {
    sender: mpsc::Sender<RawSample>,
    stats: Arc<ChannelStats>,
}

impl SampleProducer {
    /// Offers a sample without waiting. Returns whether it was queued.
    pub fn try_enqueue(&self, sample: RawSample) -> bool {
        match self.sender.try_send(sample) {
            Ok(()) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(rejected)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Channel full, rejected sample #{}", rejected.sequence());
                false
            }
            Err(TrySendError::Closed(rejected)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Channel closed, rejected sample #{}", rejected.sequence());
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn stats(&self) -> Arc<ChannelStats> {
        self.stats.clone()
    }
}

pub struct SampleConsumer {
    receiver: mpsc::Receiver<RawSample>,
    stats: Arc<ChannelStats>,
}

impl SampleConsumer {
    /// Waits for the next sample in FIFO order.
    ///
    /// Returns `None` only after the producer is gone and the queue drained.
    pub async fn dequeue(&mut self) -> Option<RawSample> {
        self.receiver.recv().await
    }

    /// Samples currently waiting
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn stats(&self) -> Arc<ChannelStats> {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{AxisReading, RawSample};
    use std::time::Instant;

    fn numbered(sequence: u64) -> RawSample {
        RawSample::new(AxisReading::new(2048, 2048, false), Instant::now(), sequence)
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            bounded_sample_channel(0),
            Err(ChannelError::ZeroCapacity)
        ));
    }

    #[tokio::test]
    async fn dequeues_in_enqueue_order() {
        let (producer, mut consumer) = bounded_sample_channel(8).unwrap();

        for seq in 0..5 {
            assert!(producer.try_enqueue(numbered(seq)));
        }

        for expected in 0..5 {
            let sample = consumer.dequeue().await.unwrap();
            assert_eq!(sample.sequence(), expected);
        }
    }

    #[tokio::test]
    async fn full_channel_drops_newest_and_keeps_accounting() {
        let (producer, mut consumer) = bounded_sample_channel(3).unwrap();

        let accepted: Vec<bool> = (0..7).map(|seq| producer.try_enqueue(numbered(seq))).collect();
        assert_eq!(
            accepted,
            vec![true, true, true, false, false, false, false]
        );

        let stats = consumer.stats();
        assert_eq!(stats.accepted(), 3);
        assert_eq!(stats.dropped(), 4);
        assert_eq!(stats.attempts(), 7);
        assert_eq!(consumer.len(), 3);

        // Oldest accepted samples come out first
        assert_eq!(consumer.dequeue().await.unwrap().sequence(), 0);

        // Freed slot accepts the next attempt
        assert!(producer.try_enqueue(numbered(7)));
        let rest: Vec<u64> = [
            consumer.dequeue().await.unwrap().sequence(),
            consumer.dequeue().await.unwrap().sequence(),
            consumer.dequeue().await.unwrap().sequence(),
        ]
        .to_vec();
        assert_eq!(rest, vec![1, 2, 7]);
        assert_eq!(stats.accepted() + stats.dropped(), 8);
    }

    #[tokio::test]
    async fn dequeue_waits_for_late_sample() {
        let (producer, mut consumer) = bounded_sample_channel(2).unwrap();

        let waiter = tokio::spawn(async move { consumer.dequeue().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        assert!(producer.try_enqueue(numbered(42)));
        let sample = waiter.await.unwrap().unwrap();
        assert_eq!(sample.sequence(), 42);
    }

    #[tokio::test]
    async fn dequeue_drains_then_reports_closed() {
        let (producer, mut consumer) = bounded_sample_channel(2).unwrap();
        assert!(producer.try_enqueue(numbered(1)));
        drop(producer);

        assert_eq!(consumer.dequeue().await.unwrap().sequence(), 1);
        assert!(consumer.dequeue().await.is_none());
    }

    #[test]
    fn enqueue_after_consumer_drop_counts_as_dropped() {
        let (producer, consumer) = bounded_sample_channel(2).unwrap();
        drop(consumer);

        assert!(producer.is_closed());
        assert!(!producer.try_enqueue(numbered(0)));
        assert_eq!(producer.stats().dropped(), 1);
    }
}
