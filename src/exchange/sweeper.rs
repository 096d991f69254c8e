//! Background reclamation of expired records.
//!
//! Redeem enforces deadlines on its own, so the sweeper only bounds how
//! long expired or viewed records occupy memory. A late or skipped cycle
//! costs memory, never correctness.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::exchange::ExchangeStore;
use crate::storage::ExchangeStorage;

/// Smallest period the sweeper will tick at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Owner of a running sweeper task.
///
/// Call [`SweeperHandle::shutdown`] to stop the task and wait for it to
/// finish. Dropping the handle without shutting down aborts the task, so
/// no timer outlives its owner.
#[derive(Debug)]
pub struct SweeperHandle {
    interval: Duration,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Starts sweeping `store` every `interval`.
    ///
    /// The first sweep runs one full interval after start.
    ///
    /// # Example
    ///
    /// ```rust
    /// use once_share::{ExchangeStore, SweeperHandle};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let store = Arc::new(ExchangeStore::builder().build());
    /// let sweeper = SweeperHandle::spawn(Arc::clone(&store), Duration::from_secs(600));
    /// assert!(sweeper.is_running());
    /// sweeper.shutdown().await;
    /// # }
    /// ```
    pub fn spawn<S: ExchangeStorage + 'static>(
        store: Arc<ExchangeStore<S>>,
        interval: Duration,
    ) -> Self {
        let period = interval.max(MIN_SWEEP_INTERVAL);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // skip first immediate tick

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => sweep_once(&store).await,
                }
            }
            debug!("reclamation sweeper stopped");
        });

        info!(interval_secs = period.as_secs(), "reclamation sweeper started");
        Self {
            interval: period,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// The period between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the background task is still alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signals the task to stop and waits for it to exit.
    ///
    /// A sweep already in progress is allowed to complete.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "reclamation sweeper ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn sweep_once<S: ExchangeStorage + 'static>(store: &ExchangeStore<S>) {
    match store.sweep_expired().await {
        Ok(0) => debug!("sweep found no expired shares"),
        Ok(removed) => info!(removed, "cleaned up expired shares"),
        Err(e) => warn!(error = %e, "background sweep error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::record::SharePayload;
    use crate::exchange::time_utils::ManualClock;
    use tokio::time::sleep;

    fn payload() -> SharePayload {
        SharePayload::new("hunter2", "Gmail", "a@b.com")
    }

    #[tokio::test]
    async fn test_sweeper_reclaims_expired_records() {
        let clock = ManualClock::new();
        let store = Arc::new(
            ExchangeStore::builder()
                .with_time_provider(clock.provider())
                .with_sweep_interval(Duration::from_millis(20))
                .build(),
        );

        let expiring = store
            .create(payload(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        let lasting = store
            .create(payload(), Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(120));

        let sweeper = store.spawn_sweeper();
        assert_eq!(sweeper.interval(), Duration::from_millis(20));
        sleep(Duration::from_millis(200)).await;

        assert!(!store.contains(&expiring.handle).await.unwrap());
        assert!(store.contains(&lasting.handle).await.unwrap());

        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_sweeping() {
        let clock = ManualClock::new();
        let store = Arc::new(
            ExchangeStore::builder()
                .with_time_provider(clock.provider())
                .build(),
        );

        let sweeper = SweeperHandle::spawn(Arc::clone(&store), Duration::from_millis(10));
        assert!(sweeper.is_running());
        sweeper.shutdown().await;

        let created = store
            .create(payload(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(120));
        sleep(Duration::from_millis(100)).await;

        // nothing swept it; redeem still enforces the deadline itself
        assert!(store.contains(&created.handle).await.unwrap());
        assert!(matches!(
            store.redeem(&created.handle).await,
            Err(crate::ExchangeError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let store = Arc::new(ExchangeStore::builder().build());
        let sweeper = SweeperHandle::spawn(Arc::clone(&store), Duration::from_millis(10));
        drop(sweeper);

        sleep(Duration::from_millis(20)).await;
        // the aborted task released its clone of the store
        assert_eq!(Arc::strong_count(&store), 1);
    }
}
