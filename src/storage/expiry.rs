//! Active expiry.
//!
//! Reads evict expired keys lazily, but a key that is written with a TTL and
//! never touched again would otherwise stay resident. [`ExpirySweeper`] owns a
//! Tokio task that reclaims those keys in the background.
//!
//! Each cycle walks the shards in order. For every shard it pops at most
//! `batch_size` entries off the front of the shard's deadline index (see
//! [`StorageEngine::purge_expired`]), then yields before taking the next
//! shard's lock. Whatever a full batch leaves behind waits for the next cycle.
//!
//! The pause between cycles adapts: a saturated cycle halves it (down to
//! `min_interval`), a cycle that removed nothing doubles it (up to
//! `max_interval`).

use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// Maximum keys removed from one shard per cycle (default: 20)
    pub batch_size: usize,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            batch_size: 20,
        }
    }
}

/// Result of one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys removed across all shards
    pub expired: usize,
    /// Whether any shard filled its batch
    pub saturated: bool,
}

/// Runs one sweep cycle over every shard.
pub async fn sweep_once(engine: &StorageEngine, batch_size: usize) -> SweepReport {
    let mut report = SweepReport::default();

    for shard in 0..engine.shard_count() {
        let removed = engine.purge_expired(shard, batch_size);
        report.expired += removed;
        report.saturated |= removed >= batch_size;
        tokio::task::yield_now().await;
    }

    report
}

/// Handle to a running sweeper task. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper task. Must be called inside a Tokio runtime.
    ///
    /// ```ignore
    /// let engine = Arc::new(StorageEngine::new());
    /// let sweeper = ExpirySweeper::start(Arc::clone(&engine), ExpiryConfig::default());
    /// // ...
    /// drop(sweeper); // task exits at its next wakeup
    /// ```
    pub fn start(engine: Arc<StorageEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            interval_ms = config.base_interval.as_millis() as u64,
            batch = config.batch_size,
            "Background expiry sweeper started"
        );
        tokio::spawn(sweeper_loop(engine, config, shutdown_rx));

        Self { shutdown_tx }
    }

    /// Signals the task to exit. Idempotent.
    pub fn stop(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        info!("Background expiry sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Computes the next sleep interval from the last cycle's outcome.
fn next_interval(current: Duration, report: SweepReport, config: &ExpiryConfig) -> Duration {
    if report.saturated {
        (current / 2).max(config.min_interval)
    } else if report.expired == 0 {
        (current * 2).min(config.max_interval)
    } else {
        current
    }
}

async fn sweeper_loop(
    engine: Arc<StorageEngine>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let batch_size = config.batch_size.max(1);
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper exiting");
                    return;
                }
            }
        }

        let report = sweep_once(&engine, batch_size).await;
        let next = next_interval(current_interval, report, &config);

        if report.expired > 0 {
            debug!(
                expired = report.expired,
                saturated = report.saturated,
                keys_remaining = engine.len(),
                "Sweep cycle reclaimed keys"
            );
        }
        if next != current_interval {
            trace!(
                new_interval_ms = next.as_millis() as u64,
                "Adjusted sweeper interval"
            );
        }
        current_interval = next;
    }
}
