use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::exchange::error::ExchangeError;
use crate::exchange::time_utils::deadline;

/// The secret being shared plus its descriptive metadata.
///
/// The store never interprets these fields. Whether `secret` is plaintext
/// or was encrypted by the sender is the caller's business. All fields are
/// wiped from memory when the payload is dropped, and `Debug` never prints
/// the secret.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SharePayload {
    /// The secret itself
    pub secret: String,
    /// Name of the service the secret belongs to
    pub service_name: String,
    /// Account name on that service
    pub username: String,
}

impl SharePayload {
    /// Creates a new payload.
    pub fn new(
        secret: impl Into<String>,
        service_name: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            service_name: service_name.into(),
            username: username.into(),
        }
    }

    /// Rejects payloads with an empty field.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        let missing: Vec<&str> = [
            ("secret", &self.secret),
            ("service_name", &self.service_name),
            ("username", &self.username),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExchangeError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for SharePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharePayload")
            .field("secret", &"<redacted>")
            .field("service_name", &self.service_name)
            .field("username", &self.username)
            .finish()
    }
}

/// Lifecycle state of an exchange record.
///
/// `Active` is the only state in which a payload exists. `Deleted` is
/// never stored; it is what absence from the store means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeState {
    Active,
    Viewed,
    Expired,
    Deleted,
}

/// Non-secret facts about a share that has already been redeemed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewedReceipt {
    pub service_name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub viewed_at: DateTime<Utc>,
}

/// Returned by a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedShare {
    pub handle: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Returned by the one successful redeem of a share.
#[derive(Debug, Clone)]
pub struct RedeemedShare {
    pub payload: SharePayload,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub viewed_at: DateTime<Utc>,
}

/// One pending secret held by a storage backend.
///
/// Fields are private: the only way to change a record is through
/// [`ExchangeRecord::consume`], which is what keeps the state machine
/// honest. A consumed record keeps its [`ViewedReceipt`] but no payload.
#[derive(Debug)]
pub struct ExchangeRecord {
    handle: String,
    payload: Option<SharePayload>,
    receipt: Option<ViewedReceipt>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    state: ExchangeState,
}

impl ExchangeRecord {
    /// Creates an `Active` record expiring `ttl` after `created_at`.
    pub fn new(
        handle: String,
        payload: SharePayload,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, ExchangeError> {
        Ok(Self {
            handle,
            payload: Some(payload),
            receipt: None,
            created_at,
            expires_at: deadline(created_at, ttl)?,
            state: ExchangeState::Active,
        })
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn viewed_at(&self) -> Option<DateTime<Utc>> {
        self.receipt.as_ref().map(|r| r.viewed_at)
    }

    /// The stored state, ignoring the clock.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// The state as observed at `now`, with a lapsed deadline reported as `Expired`.
    pub fn state_at(&self, now: DateTime<Utc>) -> ExchangeState {
        if self.is_expired(now) {
            ExchangeState::Expired
        } else {
            self.state
        }
    }

    /// True once `now` is strictly past the deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the record still holds its payload.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn receipt(&self) -> Option<&ViewedReceipt> {
        self.receipt.as_ref()
    }

    /// Performs the `Active -> Viewed` transition.
    ///
    /// Moves the payload out to the caller and leaves a receipt behind.
    /// Returns `None` if the record is not `Active`, so a second call can
    /// never surface the payload again. The expiry check is the caller's
    /// job and must happen under the same lock.
    pub fn consume(&mut self, now: DateTime<Utc>) -> Option<RedeemedShare> {
        if self.state != ExchangeState::Active {
            return None;
        }
        let payload = self.payload.take()?;
        let viewed_at = now.max(self.created_at);

        self.receipt = Some(ViewedReceipt {
            service_name: payload.service_name.clone(),
            username: payload.username.clone(),
            created_at: self.created_at,
            viewed_at,
        });
        self.state = ExchangeState::Viewed;

        Some(RedeemedShare {
            payload,
            created_at: self.created_at,
            expires_at: self.expires_at,
            viewed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn payload() -> SharePayload {
        SharePayload::new("hunter2", "Gmail", "a@b.com")
    }

    fn record(ttl: Duration) -> (ExchangeRecord, DateTime<Utc>) {
        let now = Utc::now();
        let record = ExchangeRecord::new("handle".to_string(), payload(), now, ttl).unwrap();
        (record, now)
    }

    #[test]
    fn test_new_record_is_active() {
        let (record, now) = record(Duration::from_secs(3600));
        assert_eq!(record.state(), ExchangeState::Active);
        assert_eq!(record.expires_at() - now, TimeDelta::hours(1));
        assert!(record.has_payload());
        assert!(record.viewed_at().is_none());
    }

    #[test]
    fn test_consume_once() {
        let (mut record, now) = record(Duration::from_secs(3600));

        let redeemed = record.consume(now + TimeDelta::minutes(5)).unwrap();
        assert_eq!(redeemed.payload.secret, "hunter2");
        assert_eq!(redeemed.viewed_at, now + TimeDelta::minutes(5));

        assert_eq!(record.state(), ExchangeState::Viewed);
        assert!(!record.has_payload());
        assert!(record.consume(now + TimeDelta::minutes(6)).is_none());

        let receipt = record.receipt().unwrap();
        assert_eq!(receipt.service_name, "Gmail");
        assert_eq!(receipt.username, "a@b.com");
        assert_eq!(record.viewed_at(), Some(receipt.viewed_at));
    }

    #[test]
    fn test_viewed_at_never_precedes_created_at() {
        let (mut record, now) = record(Duration::from_secs(3600));
        let redeemed = record.consume(now - TimeDelta::seconds(30)).unwrap();
        assert_eq!(redeemed.viewed_at, record.created_at());
    }

    #[test]
    fn test_expiry_is_strict() {
        let (record, _) = record(Duration::from_secs(60));
        let deadline = record.expires_at();

        assert!(!record.is_expired(deadline));
        assert!(record.is_expired(deadline + TimeDelta::milliseconds(1)));
        assert_eq!(record.state_at(deadline), ExchangeState::Active);
        assert_eq!(
            record.state_at(deadline + TimeDelta::seconds(1)),
            ExchangeState::Expired
        );
    }

    #[test]
    fn test_payload_validation() {
        assert!(payload().validate().is_ok());

        let err = SharePayload::new("", "Gmail", " ").validate().unwrap_err();
        match err {
            ExchangeError::Validation(msg) => {
                assert!(msg.contains("secret"));
                assert!(msg.contains("username"));
                assert!(!msg.contains("service_name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", payload());
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));

        let (record, _) = record(Duration::from_secs(60));
        assert!(!format!("{record:?}").contains("hunter2"));
    }
}
