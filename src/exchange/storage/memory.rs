//! In-memory storage backend.
//!
//! Records live in a `HashMap` behind a single `tokio::sync::Mutex`. Every
//! operation, reads included, takes the lock exclusively: `redeem`
//! mutates what it reads, so a shared read lock would reopen the
//! check-then-consume race.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{ExchangeStorage, StorageStats};
use crate::exchange::error::ExchangeError;
use crate::exchange::record::{ExchangeRecord, ExchangeState, RedeemedShare};

/// A process-local storage backend.
///
/// Nothing survives a restart. Dropping a record drops (and wipes) its
/// payload, so a removed record leaves nothing behind in the map.
///
/// # Example
///
/// ```rust
/// use once_share::storage::{ExchangeStorage, MemoryStorage};
/// use once_share::{ExchangeRecord, SharePayload};
/// use chrono::Utc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), once_share::ExchangeError> {
/// let storage = MemoryStorage::new();
/// let now = Utc::now();
/// let record = ExchangeRecord::new(
///     "handle".to_string(),
///     SharePayload::new("hunter2", "Gmail", "a@b.com"),
///     now,
///     Duration::from_secs(3600),
/// )?;
///
/// storage.insert(record).await?;
/// let redeemed = storage.redeem("handle", now).await?;
/// assert_eq!(redeemed.payload.secret, "hunter2");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, ExchangeRecord>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty storage with room for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }
}

#[async_trait]
impl ExchangeStorage for MemoryStorage {
    async fn insert(&self, record: ExchangeRecord) -> Result<(), ExchangeError> {
        let mut records = self.records.lock().await;
        match records.entry(record.handle().to_string()) {
            Entry::Occupied(_) => Err(ExchangeError::DuplicateHandle),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn redeem(&self, handle: &str, now: DateTime<Utc>) -> Result<RedeemedShare, ExchangeError> {
        let mut records = self.records.lock().await;

        let Some(record) = records.get_mut(handle) else {
            return Err(ExchangeError::NotFound);
        };

        if record.is_expired(now) {
            records.remove(handle);
            return Err(ExchangeError::Expired);
        }

        match record.state() {
            ExchangeState::Active => record.consume(now).ok_or(ExchangeError::NotFound),
            ExchangeState::Viewed => {
                let receipt = record.receipt().cloned();
                records.remove(handle);
                match receipt {
                    Some(receipt) => Err(ExchangeError::AlreadyViewed(Box::new(receipt))),
                    None => Err(ExchangeError::NotFound),
                }
            }
            ExchangeState::Expired | ExchangeState::Deleted => {
                records.remove(handle);
                Err(ExchangeError::NotFound)
            }
        }
    }

    async fn remove(&self, handle: &str) -> Result<bool, ExchangeError> {
        let mut records = self.records.lock().await;
        Ok(records.remove(handle).is_some())
    }

    async fn contains(&self, handle: &str) -> Result<bool, ExchangeError> {
        let records = self.records.lock().await;
        Ok(records.contains_key(handle))
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, ExchangeError> {
        let mut records = self.records.lock().await;
        let initial_count = records.len();
        records.retain(|_, record| record.expires_at() >= now);
        Ok(initial_count - records.len())
    }

    async fn get_stats(&self) -> Result<StorageStats, ExchangeError> {
        let records = self.records.lock().await;
        let active_records = records.values().filter(|r| r.has_payload()).count();
        let memory_usage = records.len() * std::mem::size_of::<ExchangeRecord>();
        Ok(StorageStats {
            active_records,
            viewed_markers: records.len() - active_records,
            backend_info: format!("In-memory HashMap storage (~{memory_usage} bytes)"),
        })
    }
}
