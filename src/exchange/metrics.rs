//! Metrics collection for exchange store operations.
//!
//! Compiled only with the `metrics` feature. Counters are process-local;
//! exporting them anywhere is left to the embedding service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::exchange::error::ExchangeError;

/// Snapshot of the counters kept by a collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeMetrics {
    /// Shares created
    pub shares_created: u64,
    /// Shares whose payload was surrendered
    pub shares_redeemed: u64,
    /// Shares removed by an explicit delete
    pub shares_deleted: u64,
    /// Records removed by sweeps
    pub records_swept: u64,
    /// Sweep cycles run
    pub sweep_cycles: u64,
    /// Rejected operations by kind
    pub rejections: RejectionMetrics,
    /// Average redeem latency in microseconds
    pub avg_redeem_time_us: u64,
}

/// Rejection counts broken down by error kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionMetrics {
    pub not_found: u64,
    pub expired: u64,
    pub already_viewed: u64,
    pub validation: u64,
    pub generation_failed: u64,
    pub duplicate_handle: u64,
}

/// Events tracked by the metrics system.
#[derive(Debug, Clone)]
pub enum MetricEvent {
    /// A share was created
    Created,
    /// A redeem attempt finished
    RedeemAttempt {
        /// Time spent in the store
        duration: Duration,
        /// Whether the payload was surrendered
        success: bool,
    },
    /// A share was deleted on request
    Deleted,
    /// A sweep cycle finished
    Sweep {
        /// Records removed
        items_removed: usize,
    },
    /// An operation was rejected
    Rejected {
        /// Which error rejected it
        kind: RejectionKind,
    },
}

impl MetricEvent {
    /// Builds the rejection event for an error.
    pub fn rejected(error: &ExchangeError) -> Self {
        MetricEvent::Rejected {
            kind: RejectionKind::from(error),
        }
    }
}

/// Counter bucket for a rejected operation, one per [`ExchangeError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Validation,
    NotFound,
    Expired,
    AlreadyViewed,
    GenerationFailed,
    DuplicateHandle,
}

impl From<&ExchangeError> for RejectionKind {
    fn from(error: &ExchangeError) -> Self {
        match error {
            ExchangeError::Validation(_) => RejectionKind::Validation,
            ExchangeError::NotFound => RejectionKind::NotFound,
            ExchangeError::Expired => RejectionKind::Expired,
            ExchangeError::AlreadyViewed(_) => RejectionKind::AlreadyViewed,
            ExchangeError::GenerationFailed(_) => RejectionKind::GenerationFailed,
            ExchangeError::DuplicateHandle => RejectionKind::DuplicateHandle,
        }
    }
}

/// Trait for metrics collection backends.
///
/// All methods may be called concurrently from request handlers and the
/// sweeper.
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    /// Record a metric event.
    async fn record_event(&self, event: MetricEvent);

    /// Get the current metrics snapshot.
    async fn get_metrics(&self) -> ExchangeMetrics;

    /// Reset all counters to zero.
    async fn reset_metrics(&self);
}

/// Collector that keeps atomic counters in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricsCollector {
    shares_created: AtomicU64,
    shares_redeemed: AtomicU64,
    shares_deleted: AtomicU64,
    records_swept: AtomicU64,
    sweep_cycles: AtomicU64,

    not_found: AtomicU64,
    expired: AtomicU64,
    already_viewed: AtomicU64,
    validation: AtomicU64,
    generation_failed: AtomicU64,
    duplicate_handle: AtomicU64,

    redeem_time_total: AtomicU64,
    redeem_samples: AtomicU64,
}

impl InMemoryMetricsCollector {
    /// Create a new in-memory metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self) -> [&AtomicU64; 13] {
        [
            &self.shares_created,
            &self.shares_redeemed,
            &self.shares_deleted,
            &self.records_swept,
            &self.sweep_cycles,
            &self.not_found,
            &self.expired,
            &self.already_viewed,
            &self.validation,
            &self.generation_failed,
            &self.duplicate_handle,
            &self.redeem_time_total,
            &self.redeem_samples,
        ]
    }
}

#[async_trait]
impl MetricsCollector for InMemoryMetricsCollector {
    async fn record_event(&self, event: MetricEvent) {
        match event {
            MetricEvent::Created => {
                self.shares_created.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::RedeemAttempt { duration, success } => {
                if success {
                    self.shares_redeemed.fetch_add(1, Ordering::Relaxed);
                }
                self.redeem_time_total
                    .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
                self.redeem_samples.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::Deleted => {
                self.shares_deleted.fetch_add(1, Ordering::Relaxed);
            }
            MetricEvent::Sweep { items_removed } => {
                self.sweep_cycles.fetch_add(1, Ordering::Relaxed);
                self.records_swept
                    .fetch_add(items_removed as u64, Ordering::Relaxed);
            }
            MetricEvent::Rejected { kind } => {
                let counter = match kind {
                    RejectionKind::NotFound => &self.not_found,
                    RejectionKind::Expired => &self.expired,
                    RejectionKind::AlreadyViewed => &self.already_viewed,
                    RejectionKind::Validation => &self.validation,
                    RejectionKind::GenerationFailed => &self.generation_failed,
                    RejectionKind::DuplicateHandle => &self.duplicate_handle,
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    async fn get_metrics(&self) -> ExchangeMetrics {
        let samples = self.redeem_samples.load(Ordering::Relaxed);
        ExchangeMetrics {
            shares_created: self.shares_created.load(Ordering::Relaxed),
            shares_redeemed: self.shares_redeemed.load(Ordering::Relaxed),
            shares_deleted: self.shares_deleted.load(Ordering::Relaxed),
            records_swept: self.records_swept.load(Ordering::Relaxed),
            sweep_cycles: self.sweep_cycles.load(Ordering::Relaxed),
            rejections: RejectionMetrics {
                not_found: self.not_found.load(Ordering::Relaxed),
                expired: self.expired.load(Ordering::Relaxed),
                already_viewed: self.already_viewed.load(Ordering::Relaxed),
                validation: self.validation.load(Ordering::Relaxed),
                generation_failed: self.generation_failed.load(Ordering::Relaxed),
                duplicate_handle: self.duplicate_handle.load(Ordering::Relaxed),
            },
            avg_redeem_time_us: if samples > 0 {
                self.redeem_time_total.load(Ordering::Relaxed) / samples
            } else {
                0
            },
        }
    }

    async fn reset_metrics(&self) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// No-op metrics collector that discards all metrics.
#[derive(Debug, Default)]
pub struct NoOpMetricsCollector;

impl NoOpMetricsCollector {
    /// Create a new no-op metrics collector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsCollector for NoOpMetricsCollector {
    async fn record_event(&self, _event: MetricEvent) {}

    async fn get_metrics(&self) -> ExchangeMetrics {
        ExchangeMetrics::default()
    }

    async fn reset_metrics(&self) {}
}
