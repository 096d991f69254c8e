//! Storage backends for exchange records.
//!
//! The store talks to its records through the [`ExchangeStorage`] trait so
//! that the consume-once contract is stated once, at the seam, and every
//! backend is held to it. The crate ships a single backend,
//! [`MemoryStorage`]; secrets are never written anywhere durable.

use crate::exchange::error::ExchangeError;
use crate::exchange::record::{ExchangeRecord, RedeemedShare};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

mod memory;
pub use memory::MemoryStorage;

/// Statistics about a storage backend.
///
/// Counts only. Stats never expose handles or payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Records still holding a payload
    pub active_records: usize,
    /// Payload-less records waiting to answer one already-viewed redeem
    pub viewed_markers: usize,
    /// Additional backend-specific information
    pub backend_info: String,
}

/// Abstract storage backend for exchange records.
///
/// # Atomicity
///
/// `redeem` is a read that mutates. Implementations must perform its
/// existence, expiry, viewed and consume steps as one indivisible
/// operation with respect to every other method touching the same handle.
/// Under any number of concurrent `redeem` calls for a handle, exactly one
/// may return the payload.
///
/// # Error Handling
///
/// All methods return `Result<T, ExchangeError>`. Backend failures must be
/// mapped onto an `ExchangeError` variant.
#[async_trait]
pub trait ExchangeStorage: Send + Sync {
    /// Inserts a new record.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record was stored
    /// * `Err(ExchangeError::DuplicateHandle)` - The handle is already in use; nothing was overwritten
    async fn insert(&self, record: ExchangeRecord) -> Result<(), ExchangeError>;

    /// Atomically checks and consumes a record.
    ///
    /// # Returns
    ///
    /// * `Ok(RedeemedShare)` - The record was active and unexpired at `now`; its payload is surrendered
    /// * `Err(ExchangeError::NotFound)` - No record for the handle
    /// * `Err(ExchangeError::Expired)` - The deadline passed before `now`; the record has been removed
    /// * `Err(ExchangeError::AlreadyViewed)` - The payload was surrendered earlier; the marker has been removed
    async fn redeem(&self, handle: &str, now: DateTime<Utc>) -> Result<RedeemedShare, ExchangeError>;

    /// Removes a record regardless of state.
    ///
    /// Returns whether a record existed. Idempotent.
    async fn remove(&self, handle: &str) -> Result<bool, ExchangeError>;

    /// Checks whether any record, active or viewed, exists for the handle.
    async fn contains(&self, handle: &str) -> Result<bool, ExchangeError>;

    /// Removes every record whose deadline is strictly before `now`.
    ///
    /// Returns the number of records removed. Never touches a record whose
    /// deadline is at or after `now`.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, ExchangeError>;

    /// Returns statistics about the storage backend.
    async fn get_stats(&self) -> Result<StorageStats, ExchangeError>;
}
