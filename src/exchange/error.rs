use thiserror::Error;

use super::record::ViewedReceipt;

/// Error types that can occur during secret exchange operations.
///
/// Every store operation returns one of these as a typed result. The store
/// never retries on the caller's behalf (handle generation aside), so the
/// caller decides how each variant maps onto its own surface, for example
/// an HTTP status code.
///
/// # Error Categories
///
/// - **Caller Errors**: `Validation`, `NotFound`, `Expired`, `AlreadyViewed`
/// - **System Errors**: `GenerationFailed`
/// - **Storage Internal**: `DuplicateHandle`
///
/// # Example
///
/// ```rust
/// use once_share::{ExchangeError, ExchangeStore, SharePayload};
///
/// # async fn example() -> Result<(), ExchangeError> {
/// let store = ExchangeStore::builder().build();
/// let created = store
///     .create(SharePayload::new("hunter2", "Gmail", "a@b.com"), None)
///     .await?;
///
/// store.redeem(&created.handle).await?;
///
/// match store.redeem(&created.handle).await {
///     Ok(_) => unreachable!("a share is only ever redeemed once"),
///     Err(ExchangeError::AlreadyViewed(receipt)) => {
///         println!("{} was already opened at {}", receipt.service_name, receipt.viewed_at)
///     }
///     Err(ExchangeError::NotFound) => println!("No such share"),
///     Err(ExchangeError::Expired) => println!("Share expired"),
///     Err(e) => println!("Other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The create request was missing a field or carried a malformed value.
    ///
    /// This is the caller's fault and retrying the same request will fail
    /// the same way.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No share exists for the handle.
    ///
    /// # When This Occurs
    ///
    /// - The handle was never issued
    /// - The share was explicitly deleted
    /// - The share was swept after its deadline
    /// - The share was redeemed and its already-viewed notice was delivered
    #[error("Share not found")]
    NotFound,

    /// The share existed but its deadline has passed.
    ///
    /// The record is removed as a side effect of reporting this error, so
    /// a later lookup of the same handle reports `NotFound`.
    #[error("Share expired")]
    Expired,

    /// The share has already been redeemed.
    ///
    /// Carries the non-secret metadata of the share so the recipient can
    /// be told what was opened and when. The secret itself is gone.
    #[error("Share already viewed")]
    AlreadyViewed(Box<ViewedReceipt>),

    /// A handle could not be minted.
    ///
    /// Either the operating system's entropy source failed, or every
    /// attempt collided with an existing handle. Never degraded to a
    /// weaker random source.
    #[error("Handle generation failed: {0}")]
    GenerationFailed(String),

    /// A storage backend refused an insert because the handle is taken.
    ///
    /// `ExchangeStore::create` retries on this and converts an exhausted
    /// retry budget into `GenerationFailed`, so callers of the store never
    /// observe it.
    #[error("Handle already exists")]
    DuplicateHandle,
}

impl ExchangeError {
    /// Returns true when the error was caused by the request rather than
    /// by the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ExchangeError::GenerationFailed(_) | ExchangeError::DuplicateHandle
        )
    }

    /// Short, stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Validation(_) => "validation",
            ExchangeError::NotFound => "not_found",
            ExchangeError::Expired => "expired",
            ExchangeError::AlreadyViewed(_) => "already_viewed",
            ExchangeError::GenerationFailed(_) => "generation_failed",
            ExchangeError::DuplicateHandle => "duplicate_handle",
        }
    }
}
