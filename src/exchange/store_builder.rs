use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::exchange::handle::{HandleGeneratorFn, generate_handle};
use crate::exchange::time_utils::{TimeProviderFn, system_time_provider};
use crate::exchange::{ExchangeConfig, ExchangeError, ExchangeStore};
use crate::storage::{ExchangeStorage, MemoryStorage};

#[cfg(feature = "metrics")]
use crate::exchange::metrics::{MetricsCollector, NoOpMetricsCollector};

/// A builder for creating an `ExchangeStore` instance.
///
/// Defaults to `MemoryStorage`, the production configuration, the OS
/// random handle generator and the system clock.
#[must_use = "The builder does nothing unless `.build()` is called."]
pub struct ExchangeStoreBuilder<S: ExchangeStorage> {
    storage: Arc<S>,
    config: ExchangeConfig,
    handle_generator: HandleGeneratorFn,
    time_provider: TimeProviderFn,
    #[cfg(feature = "metrics")]
    metrics_collector: Option<Arc<dyn MetricsCollector>>,
}

impl ExchangeStoreBuilder<MemoryStorage> {
    pub(crate) fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            config: ExchangeConfig::default(),
            handle_generator: Box::new(generate_handle),
            time_provider: system_time_provider(),
            #[cfg(feature = "metrics")]
            metrics_collector: None,
        }
    }
}

impl<S: ExchangeStorage + 'static> ExchangeStoreBuilder<S> {
    /// Specifies a storage backend to use instead of the default `MemoryStorage`.
    pub fn with_storage<T: ExchangeStorage + 'static>(
        self,
        storage: Arc<T>,
    ) -> ExchangeStoreBuilder<T> {
        ExchangeStoreBuilder {
            storage,
            config: self.config,
            handle_generator: self.handle_generator,
            time_provider: self.time_provider,
            #[cfg(feature = "metrics")]
            metrics_collector: self.metrics_collector,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the lifetime used when a create names none.
    ///
    /// If not set, defaults to 24 hours.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Sets the interval used by [`ExchangeStore::spawn_sweeper`].
    ///
    /// If not set, defaults to 10 minutes.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Replaces the handle generator.
    ///
    /// Meant for tests that need to force collisions or entropy failures.
    /// Production stores should keep the default, which draws 256 bits
    /// from the OS random source.
    ///
    /// # Example
    ///
    /// ```rust
    /// use once_share::{ExchangeError, ExchangeStore};
    ///
    /// let store = ExchangeStore::builder()
    ///     .with_handle_generator(|| Err(ExchangeError::GenerationFailed("offline".into())))
    ///     .build();
    /// ```
    pub fn with_handle_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> Result<String, ExchangeError> + Send + Sync + 'static,
    {
        self.handle_generator = Box::new(generator);
        self
    }

    /// Replaces the clock the store checks deadlines against.
    ///
    /// # Example
    ///
    /// ```rust
    /// use once_share::{ExchangeStore, ManualClock};
    ///
    /// let clock = ManualClock::new();
    /// let store = ExchangeStore::builder()
    ///     .with_time_provider(clock.provider())
    ///     .build();
    /// assert_eq!(store.now(), clock.now());
    /// ```
    pub fn with_time_provider(mut self, provider: TimeProviderFn) -> Self {
        self.time_provider = provider;
        self
    }

    /// Sets a metrics collector.
    ///
    /// If not set, a no-op collector is used.
    #[cfg(feature = "metrics")]
    pub fn with_metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.metrics_collector = Some(collector);
        self
    }

    /// Builds the `ExchangeStore`.
    ///
    /// Configuration warnings are logged but do not prevent construction.
    pub fn build(self) -> ExchangeStore<S> {
        for warning in self.config.validate() {
            warn!(%warning, "questionable exchange configuration");
        }

        ExchangeStore {
            config: self.config,
            storage: self.storage,
            handle_generator: self.handle_generator,
            time_provider: self.time_provider,
            #[cfg(feature = "metrics")]
            metrics_collector: self
                .metrics_collector
                .unwrap_or_else(|| Arc::new(NoOpMetricsCollector::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::record::SharePayload;

    #[test]
    fn test_builder_defaults() {
        let store = ExchangeStore::builder().build();
        assert_eq!(store.config(), &ExchangeConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let store = ExchangeStore::builder()
            .with_default_ttl(Duration::from_secs(3600))
            .with_sweep_interval(Duration::from_secs(120))
            .build();
        assert_eq!(store.config().default_ttl, Duration::from_secs(3600));
        assert_eq!(store.config().sweep_interval, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_builder_with_storage() -> Result<(), ExchangeError> {
        let storage = Arc::new(MemoryStorage::with_capacity(8));
        let store = ExchangeStore::builder()
            .with_storage(Arc::clone(&storage))
            .build();

        let created = store
            .create(SharePayload::new("s", "svc", "user"), None)
            .await?;
        assert!(storage.contains(&created.handle).await?);
        Ok(())
    }
}
