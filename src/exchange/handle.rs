//! Handle generation.
//!
//! A handle is 32 bytes from the operating system's CSPRNG, encoded as
//! unpadded URL-safe base64 (43 characters). There is no fallback source:
//! if the OS cannot supply entropy the create fails.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::exchange::error::ExchangeError;

/// Number of random bytes behind every handle.
pub const HANDLE_BYTES: usize = 32;

/// A function that mints handles.
pub type HandleGeneratorFn = Box<dyn Fn() -> Result<String, ExchangeError> + Send + Sync>;

/// Mints a new handle from the OS random source.
///
/// # Example
///
/// ```rust
/// let handle = once_share::generate_handle().unwrap();
/// assert_eq!(handle.len(), 43);
/// ```
pub fn generate_handle() -> Result<String, ExchangeError> {
    let mut bytes = [0u8; HANDLE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ExchangeError::GenerationFailed(format!("entropy source failure: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Returns a short, non-reversible tag for a handle, safe to write to logs.
pub fn fingerprint(handle: &str) -> String {
    let digest = Sha256::digest(handle.as_bytes());
    hex::encode(&digest[..6])
}
