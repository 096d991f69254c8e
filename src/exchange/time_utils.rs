//! Time utilities for deadline handling.
//!
//! The store never reads the wall clock directly. It asks a time provider,
//! which is the system clock in production and a [`ManualClock`] in tests
//! that need to step past a deadline without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::exchange::error::ExchangeError;

/// A function that provides the current time.
pub type TimeProviderFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The default time provider, backed by the system clock.
pub fn system_time_provider() -> TimeProviderFn {
    Arc::new(Utc::now)
}

/// Computes `created_at + ttl`.
///
/// Lifetimes that do not fit in the calendar are rejected as a validation
/// error rather than wrapping or saturating.
pub(crate) fn deadline(created_at: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, ExchangeError> {
    let delta = TimeDelta::from_std(ttl)
        .map_err(|_| ExchangeError::Validation(format!("TTL of {}s is out of range", ttl.as_secs())))?;
    created_at
        .checked_add_signed(delta)
        .ok_or_else(|| ExchangeError::Validation("TTL overflows the calendar".to_string()))
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can hand one clone
/// to the store and keep another to advance time.
///
/// # Example
///
/// ```rust
/// use once_share::ManualClock;
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(61 * 60));
/// assert_eq!((clock.now() - start).num_minutes(), 61);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock frozen at the current system time.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates a clock frozen at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Returns the clock's current instant.
    pub fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Returns a time provider reading from this clock.
    pub fn provider(&self) -> TimeProviderFn {
        let clock = self.clone();
        Arc::new(move || clock.now())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}
