use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::sync::watch;
use tracing::warn;

use crate::api::health::HealthState;
use crate::error::{AppError, Result};
use crate::types::RawSignal;

/// Queue item: the raw signal plus when it was enqueued, for latency stats.
#[derive(Debug)]
pub struct QueuedSignal {
    pub raw: RawSignal,
    pub enqueued_at: Instant,
}

impl QueuedSignal {
    pub fn new(raw: RawSignal) -> Self {
        Self { raw, enqueued_at: Instant::now() }
    }
}

/// Producer side of the bounded ingest queue. Cheap to clone; one per collector.
#[derive(Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<QueuedSignal>,
    timeout: Duration,
    health: Arc<HealthState>,
    shutdown: watch::Receiver<bool>,
}

impl SignalSender {
    pub(crate) fn new(
        tx: mpsc::Sender<QueuedSignal>,
        timeout: Duration,
        health: Arc<HealthState>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self { tx, timeout, health, shutdown }
    }

    /// Waits up to the enqueue timeout for capacity. A signal still without a
    /// slot after that is dropped and counted.
    pub async fn submit(&self, raw: RawSignal) -> Result<()> {
        self.ensure_running()?;
        match self.tx.send_timeout(QueuedSignal::new(raw), self.timeout).await {
            Ok(()) => {
                self.health.inc_accepted();
                Ok(())
            }
            Err(SendTimeoutError::Timeout(item)) => Err(self.dropped(&item.raw, "enqueue timed out")),
            Err(SendTimeoutError::Closed(_)) => Err(AppError::PipelineStopped),
        }
    }

    /// Fails immediately when the queue is full.
    pub fn try_submit(&self, raw: RawSignal) -> Result<()> {
        self.ensure_running()?;
        match self.tx.try_send(QueuedSignal::new(raw)) {
            Ok(()) => {
                self.health.inc_accepted();
                Ok(())
            }
            Err(TrySendError::Full(item)) => Err(self.dropped(&item.raw, "queue at capacity")),
            Err(TrySendError::Closed(_)) => Err(AppError::PipelineStopped),
        }
    }

    /// Signals currently waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn queue_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    fn ensure_running(&self) -> Result<()> {
        if *self.shutdown.borrow() || self.tx.is_closed() {
            return Err(AppError::PipelineStopped);
        }
        Ok(())
    }

    fn dropped(&self, raw: &RawSignal, reason: &str) -> AppError {
        self.health.inc_dropped();
        warn!(source = %raw.source, dropped = self.health.dropped(), "Signal queue full, dropping: {reason}");
        AppError::QueueFull(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn raw(i: usize) -> RawSignal {
        RawSignal {
            content: format!("signal {i}"),
            source: "reddit".to_string(),
            timestamp: Utc::now(),
            engagement_score: 1.0,
            credibility_weight: 0.5,
        }
    }

    fn sender(capacity: usize) -> (SignalSender, mpsc::Receiver<QueuedSignal>, watch::Sender<bool>, Arc<HealthState>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        let health = Arc::new(HealthState::new());
        (SignalSender::new(tx, Duration::from_millis(20), Arc::clone(&health), stop_rx), rx, stop_tx, health)
    }

    #[tokio::test]
    async fn try_submit_fails_fast_when_full() {
        let (sender, _rx, _stop, health) = sender(1);
        assert!(sender.try_submit(raw(0)).is_ok());
        assert!(matches!(sender.try_submit(raw(1)), Err(AppError::QueueFull(_))));
        assert_eq!(health.accepted(), 1);
        assert_eq!(health.dropped(), 1);
        assert_eq!(sender.queue_depth(), 1);
    }

    #[tokio::test]
    async fn submit_times_out_instead_of_blocking() {
        let (sender, _rx, _stop, health) = sender(1);
        sender.submit(raw(0)).await.unwrap();
        let started = Instant::now();
        let result = sender.submit(raw(1)).await;
        assert!(matches!(result, Err(AppError::QueueFull(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(health.dropped(), 1);
    }

    #[tokio::test]
    async fn submit_succeeds_once_space_frees() {
        let (sender, mut rx, _stop, _health) = sender(1);
        sender.submit(raw(0)).await.unwrap();
        assert!(rx.recv().await.is_some());
        assert!(sender.submit(raw(1)).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_after_shutdown() {
        let (sender, _rx, stop, _health) = sender(4);
        stop.send(true).unwrap();
        assert!(matches!(sender.try_submit(raw(0)), Err(AppError::PipelineStopped)));
        assert!(matches!(sender.submit(raw(0)).await, Err(AppError::PipelineStopped)));
    }
}
