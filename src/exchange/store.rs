use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "metrics")]
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::handle::{HandleGeneratorFn, fingerprint};
use super::record::{CreatedShare, ExchangeRecord, RedeemedShare, SharePayload};
use super::storage::{ExchangeStorage, MemoryStorage, StorageStats};
use super::sweeper::SweeperHandle;
use super::time_utils::TimeProviderFn;
use super::{ExchangeConfig, ExchangeError, ExchangeStoreBuilder};

#[cfg(feature = "metrics")]
use super::metrics::{ExchangeMetrics, MetricEvent, MetricsCollector};

/// The one-time secret exchange store.
///
/// Issues handles, holds payloads under a consume-once contract and
/// enforces expiry. The store is an explicit value: construct it once at
/// service start and share it (usually as `Arc<ExchangeStore<_>>`) with
/// request handlers and the sweeper.
///
/// To create an instance, use [`ExchangeStore::builder()`].
///
/// # Example
///
/// ```rust
/// use once_share::{ExchangeError, ExchangeStore, SharePayload};
///
/// # async fn example() -> Result<(), ExchangeError> {
/// let store = ExchangeStore::builder().build();
///
/// let created = store
///     .create(SharePayload::new("hunter2", "Gmail", "a@b.com"), None)
///     .await?;
///
/// let redeemed = store.redeem(&created.handle).await?;
/// assert_eq!(redeemed.payload.secret, "hunter2");
///
/// assert!(matches!(
///     store.redeem(&created.handle).await,
///     Err(ExchangeError::AlreadyViewed(_))
/// ));
/// # Ok(())
/// # }
/// ```
pub struct ExchangeStore<S: ExchangeStorage> {
    pub(crate) config: ExchangeConfig,
    pub(crate) storage: Arc<S>,
    pub(crate) handle_generator: HandleGeneratorFn,
    pub(crate) time_provider: TimeProviderFn,
    #[cfg(feature = "metrics")]
    pub(crate) metrics_collector: Arc<dyn MetricsCollector>,
}

impl ExchangeStore<MemoryStorage> {
    /// Creates a builder for an in-memory store.
    pub fn builder() -> ExchangeStoreBuilder<MemoryStorage> {
        ExchangeStoreBuilder::new()
    }
}

impl<S: ExchangeStorage + 'static> ExchangeStore<S> {
    /// Returns the active configuration.
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Returns the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Current time according to the store's time provider.
    pub fn now(&self) -> DateTime<Utc> {
        (self.time_provider)()
    }

    /// Stores a new share and returns its handle.
    ///
    /// `ttl` of `None` or zero selects the configured default; longer than
    /// the configured maximum is clamped. A generated handle that collides
    /// with an existing one is discarded and regenerated, up to
    /// `max_generation_attempts` times.
    ///
    /// # Errors
    ///
    /// * `Validation` - A payload field is empty
    /// * `GenerationFailed` - The entropy source failed or every attempt collided
    pub async fn create(
        &self,
        payload: SharePayload,
        ttl: Option<Duration>,
    ) -> Result<CreatedShare, ExchangeError> {
        if let Err(e) = payload.validate() {
            #[cfg(feature = "metrics")]
            self.record_metric(MetricEvent::rejected(&e)).await;
            return Err(e);
        }

        let ttl = self.config.resolve_ttl(ttl);
        let created_at = self.now();

        for attempt in 1..=self.config.max_generation_attempts {
            let handle = match (self.handle_generator)() {
                Ok(handle) => handle,
                Err(e) => {
                    error!(error = %e, "handle generation failed");
                    #[cfg(feature = "metrics")]
                    self.record_metric(MetricEvent::rejected(&e)).await;
                    return Err(e);
                }
            };

            let record = ExchangeRecord::new(handle.clone(), payload.clone(), created_at, ttl)?;
            let expires_at = record.expires_at();

            match self.storage.insert(record).await {
                Ok(()) => {
                    info!(
                        handle = %fingerprint(&handle),
                        service = %payload.service_name,
                        expires_at = %expires_at.to_rfc3339(),
                        "share created"
                    );
                    #[cfg(feature = "metrics")]
                    self.record_metric(MetricEvent::Created).await;
                    return Ok(CreatedShare {
                        handle,
                        created_at,
                        expires_at,
                    });
                }
                Err(ExchangeError::DuplicateHandle) => {
                    warn!(attempt, "generated handle already in use; regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        let e = ExchangeError::GenerationFailed(format!(
            "no unique handle after {} attempts",
            self.config.max_generation_attempts
        ));
        error!(error = %e, "giving up on share creation");
        #[cfg(feature = "metrics")]
        self.record_metric(MetricEvent::rejected(&e)).await;
        Err(e)
    }

    /// Redeems a share, surrendering its payload exactly once.
    ///
    /// The existence, expiry, viewed and consume steps run as one atomic
    /// storage operation, so concurrent callers racing on a handle see
    /// exactly one success.
    ///
    /// # Errors
    ///
    /// * `NotFound` - Unknown, deleted or swept handle
    /// * `Expired` - The deadline passed; the share is removed
    /// * `AlreadyViewed` - The payload was surrendered earlier
    pub async fn redeem(&self, handle: &str) -> Result<RedeemedShare, ExchangeError> {
        #[cfg(feature = "metrics")]
        let start_time = Instant::now();

        let result = self.storage.redeem(handle, self.now()).await;

        #[cfg(feature = "metrics")]
        {
            self.record_metric(MetricEvent::RedeemAttempt {
                duration: start_time.elapsed(),
                success: result.is_ok(),
            })
            .await;
            if let Err(e) = &result {
                self.record_metric(MetricEvent::rejected(e)).await;
            }
        }

        match &result {
            Ok(redeemed) => info!(
                handle = %fingerprint(handle),
                service = %redeemed.payload.service_name,
                "share viewed and destroyed"
            ),
            Err(ExchangeError::Expired) => {
                info!(handle = %fingerprint(handle), "expired share removed on redeem")
            }
            Err(e) => debug!(handle = %fingerprint(handle), error = %e, "redeem rejected"),
        }

        result
    }

    /// Removes a share regardless of its state.
    ///
    /// Returns whether anything was removed. Idempotent.
    pub async fn delete(&self, handle: &str) -> Result<bool, ExchangeError> {
        let found = self.storage.remove(handle).await?;
        if found {
            info!(handle = %fingerprint(handle), "share manually deleted");
            #[cfg(feature = "metrics")]
            self.record_metric(MetricEvent::Deleted).await;
        }
        Ok(found)
    }

    /// Checks whether a record for the handle is present.
    pub async fn contains(&self, handle: &str) -> Result<bool, ExchangeError> {
        self.storage.contains(handle).await
    }

    /// Removes every record whose deadline has passed.
    pub async fn sweep_expired(&self) -> Result<usize, ExchangeError> {
        self.sweep_expired_at(self.now()).await
    }

    /// Removes every record whose deadline is strictly before `now`.
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<usize, ExchangeError> {
        let removed = self.storage.sweep_expired(now).await?;
        #[cfg(feature = "metrics")]
        self.record_metric(MetricEvent::Sweep {
            items_removed: removed,
        })
        .await;
        Ok(removed)
    }

    /// Returns counts from the storage backend.
    pub async fn stats(&self) -> Result<StorageStats, ExchangeError> {
        self.storage.get_stats().await
    }

    /// Starts the reclamation sweeper at the configured interval.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        SweeperHandle::spawn(Arc::clone(self), self.config.sweep_interval)
    }

    /// Returns the current metrics snapshot.
    #[cfg(feature = "metrics")]
    pub async fn metrics(&self) -> ExchangeMetrics {
        self.metrics_collector.get_metrics().await
    }

    #[cfg(feature = "metrics")]
    async fn record_metric(&self, event: MetricEvent) {
        self.metrics_collector.record_event(event).await;
    }
}
