//! Periodic store maintenance.
//!
//! One background loop takes an incremental checkpoint every checkpoint
//! period and upgrades it to a full checkpoint with compaction whenever the
//! longer compaction period has also elapsed. Failures are logged and the
//! loop keeps going; only the shutdown token stops it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use surveyor_tasks::RateLimiter;

use crate::{StoreConfig, SystemStore};

/// Drives checkpoints and compaction on a cadence from [`StoreConfig`].
pub struct CheckpointScheduler {
    store: Arc<dyn SystemStore>,
    checkpoint_limiter: RateLimiter,
    compaction_limiter: RateLimiter,
    lock: Mutex<()>,
}

impl CheckpointScheduler {
    pub fn new(store: Arc<dyn SystemStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            checkpoint_limiter: RateLimiter::new(config.checkpoint_interval()),
            compaction_limiter: RateLimiter::new(config.compaction_interval()),
            lock: Mutex::new(()),
        }
    }

    /// Run until `shutdown` fires. The wait between checkpoints is
    /// cancellable, so the loop exits promptly even mid-backoff; a
    /// checkpoint already in flight finishes first.
    pub async fn run(self, shutdown: CancellationToken) {
        trace!("checkpoint loop started");
        while self.checkpoint_limiter.wait(&shutdown).await {
            if shutdown.is_cancelled() {
                break;
            }
            let _guard = self.lock.lock().await;
            let result = if self.compaction_limiter.try_take() {
                trace!("taking full checkpoint with compaction");
                self.store.take_full_checkpoint_with_compaction().await
            } else {
                trace!("taking incremental checkpoint");
                self.store.take_incremental_checkpoint().await
            };
            match result {
                Ok(()) => trace!("checkpoint complete"),
                Err(e) => warn!(error = %e, "checkpoint failed"),
            }
        }
        debug!("checkpoint loop stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
