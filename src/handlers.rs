use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{ExchangeError, ExchangeStore, MemoryStorage, SharePayload, fingerprint};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ExchangeStore<MemoryStorage>>,
    /// Public origin used to build share links, without a trailing slash
    pub base_url: String,
}

impl AppState {
    pub fn new(store: Arc<ExchangeStore<MemoryStorage>>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { store, base_url }
    }

    fn share_url(&self, token: &str) -> String {
        format!("{}/share/{}", self.base_url, token)
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Maps store errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(ExchangeError);

impl From<ExchangeError> for ApiError {
    fn from(e: ExchangeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            ExchangeError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ExchangeError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Share not found or expired" })),
            )
                .into_response(),
            ExchangeError::Expired => (
                StatusCode::GONE,
                Json(json!({ "error": "This share has expired" })),
            )
                .into_response(),
            ExchangeError::AlreadyViewed(receipt) => (
                StatusCode::GONE,
                Json(json!({
                    "error": "This share has already been viewed",
                    "details": receipt,
                })),
            )
                .into_response(),
            e @ (ExchangeError::GenerationFailed(_) | ExchangeError::DuplicateHandle) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "time": Utc::now().to_rfc3339() }))
}

// ── Create ────────────────────────────────────────────────────────────────────

/// Body of `POST /api/share`.
///
/// `encrypted_password` is accepted as an alias of `secret`; the store
/// treats either as an opaque string.
#[derive(Debug, Default, Deserialize)]
pub struct CreateShareRequest {
    #[serde(default, alias = "encrypted_password")]
    pub secret: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub expiration_hours: Option<i64>,
}

impl CreateShareRequest {
    fn ttl(&self) -> Option<Duration> {
        self.expiration_hours
            .filter(|hours| *hours > 0)
            .map(|hours| Duration::from_secs((hours as u64).saturating_mul(3600)))
    }
}

#[derive(Debug, Serialize)]
pub struct CreateShareResponse {
    pub token: String,
    pub share_url: String,
    pub expires_at: DateTime<Utc>,
}

pub async fn create_share(
    State(state): State<AppState>,
    body: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<Json<CreateShareResponse>, ApiError> {
    let Json(mut req) = body.map_err(|rejection| {
        warn!(error = %rejection, "invalid create request body");
        ExchangeError::Validation("Invalid request body".to_string())
    })?;

    let ttl = req.ttl();
    let (Some(secret), Some(service_name), Some(username)) =
        (req.secret.take(), req.service_name.take(), req.username.take())
    else {
        return Err(ExchangeError::Validation("Missing required fields".to_string()).into());
    };

    let payload = SharePayload::new(secret, service_name, username);
    if payload.validate().is_err() {
        return Err(ExchangeError::Validation("Missing required fields".to_string()).into());
    }

    let created = state.store.create(payload, ttl).await?;
    Ok(Json(CreateShareResponse {
        share_url: state.share_url(&created.handle),
        token: created.handle,
        expires_at: created.expires_at,
    }))
}

// ── Redeem ────────────────────────────────────────────────────────────────────

/// Body of a successful `GET /api/share/:token`. Wiped after serialization.
#[derive(Serialize, Zeroize, ZeroizeOnDrop)]
pub struct ShareRetrieveResponse {
    pub secret: String,
    pub service_name: String,
    pub username: String,
    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,
    #[zeroize(skip)]
    pub viewed_at: DateTime<Utc>,
}

pub async fn get_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ShareRetrieveResponse>, ApiError> {
    let redeemed = state.store.redeem(&token).await?;
    Ok(Json(ShareRetrieveResponse {
        secret: redeemed.payload.secret.clone(),
        service_name: redeemed.payload.service_name.clone(),
        username: redeemed.payload.username.clone(),
        created_at: redeemed.created_at,
        viewed_at: redeemed.viewed_at,
    }))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    if state.store.delete(&token).await? {
        Ok(Json(json!({ "message": "Share deleted successfully" })).into_response())
    } else {
        debug!(handle = %fingerprint(&token), "delete of unknown share");
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Share not found" })),
        )
            .into_response())
    }
}
