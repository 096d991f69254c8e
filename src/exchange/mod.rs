// Core architecture components
mod config;
mod error;
mod handle;
mod record;
mod store;
mod store_builder;
mod time_utils;

// Storage and reclamation
pub mod storage;
pub mod sweeper;

// Metrics (optional feature)
#[cfg(feature = "metrics")]
pub mod metrics;

// Core components exports
pub use config::{ConfigPreset, ExchangeConfig};
pub use error::ExchangeError;
pub use handle::{HANDLE_BYTES, HandleGeneratorFn, fingerprint, generate_handle};
pub use record::{
    CreatedShare, ExchangeRecord, ExchangeState, RedeemedShare, SharePayload, ViewedReceipt,
};
pub use store::ExchangeStore;
pub use store_builder::ExchangeStoreBuilder;
pub use time_utils::{ManualClock, TimeProviderFn, system_time_provider};

// Storage and reclamation exports
pub use storage::{ExchangeStorage, MemoryStorage, StorageStats};
pub use sweeper::SweeperHandle;

// Metrics exports (optional feature)
#[cfg(feature = "metrics")]
pub use metrics::{
    ExchangeMetrics, InMemoryMetricsCollector, MetricEvent, MetricsCollector,
    NoOpMetricsCollector, RejectionKind, RejectionMetrics,
};
