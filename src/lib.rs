//! # Once Share
//!
//! An in-memory store for handing a secret to someone exactly once.
//!
//! The holder of a secret (say, a password) creates a short-lived share and
//! receives an unguessable handle. The handle travels to the recipient
//! out-of-band. The first redeem of the handle returns the secret and
//! destroys it; the deadline destroys it if nobody redeems it in time.
//!
//! ## Features
//!
//! - **Consume-once**: the payload is surrendered by at most one redeem, even under concurrent races
//! - **Time-bounded**: every share carries a deadline (24 hours unless asked otherwise)
//! - **Unguessable handles**: 256 bits from the OS random source, URL-safe
//! - **Background reclamation**: a stoppable sweeper purges expired shares
//! - **Memory only**: nothing is written to disk; payloads are wiped on drop
//! - **HTTP boundary** (`server` feature): JSON API for create, redeem, delete and health
//!
//! ## Quick Start
//!
//! ```rust
//! use once_share::{ExchangeError, ExchangeStore, SharePayload};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ExchangeError> {
//! let store = Arc::new(ExchangeStore::builder().build());
//! let sweeper = store.spawn_sweeper();
//!
//! let created = store
//!     .create(
//!         SharePayload::new("correct horse battery staple", "Gmail", "a@b.com"),
//!         Some(Duration::from_secs(3600)),
//!     )
//!     .await?;
//!
//! // ... the handle reaches the recipient ...
//!
//! let redeemed = store.redeem(&created.handle).await?;
//! assert_eq!(redeemed.payload.service_name, "Gmail");
//!
//! // A second redeem never sees the secret again
//! assert!(store.redeem(&created.handle).await.is_err());
//!
//! sweeper.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`ExchangeStore`]**: issues handles and owns the consume-once and expiry rules
//! - **[`storage::ExchangeStorage`]**: the atomic storage seam, implemented by [`MemoryStorage`]
//! - **[`SweeperHandle`]**: the running reclamation task
//! - **[`ExchangeError`]**: typed outcomes for every failure mode

pub mod exchange;

#[cfg(feature = "server")]
pub mod handlers;
#[cfg(feature = "server")]
pub mod server;

pub use exchange::storage;

// Re-export commonly used types
pub use exchange::{
    ConfigPreset, CreatedShare, ExchangeConfig, ExchangeError, ExchangeRecord, ExchangeState,
    ExchangeStore, ExchangeStoreBuilder, ManualClock, MemoryStorage, RedeemedShare, SharePayload,
    SweeperHandle, ViewedReceipt, fingerprint, generate_handle,
};
