use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::{AppState, create_share, delete_share, get_share, health};
use crate::{ConfigPreset, ExchangeConfig, ExchangeStore};

const DEFAULT_PORT: u16 = 8080;
const FRONTEND_CANDIDATES: [&str; 3] = ["../frontend", "./frontend", "/app/frontend"];

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public origin placed in share links ($BASE_URL).
    pub base_url: String,
    /// Comma-separated CORS origins ($ALLOWED_ORIGIN); any origin when unset.
    pub allowed_origin: Option<String>,
    /// Static frontend served for non-API paths ($FRONTEND_DIR).
    pub frontend_dir: Option<PathBuf>,
    pub exchange: ExchangeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            base_url: format!("http://localhost:{DEFAULT_PORT}"),
            allowed_origin: None,
            frontend_dir: None,
            exchange: ExchangeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds the configuration from `HOST`, `PORT`, `BASE_URL`,
    /// `ALLOWED_ORIGIN`, `FRONTEND_DIR` and the `ONCE_SHARE_*` variables.
    ///
    /// Without `FRONTEND_DIR` the first existing well-known frontend
    /// directory is used.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            allowed_origin: std::env::var("ALLOWED_ORIGIN")
                .ok()
                .filter(|o| !o.trim().is_empty() && o.trim() != "*"),
            frontend_dir: std::env::var("FRONTEND_DIR")
                .ok()
                .map(PathBuf::from)
                .or_else(find_frontend_dir),
            exchange: ExchangeConfig::from(ConfigPreset::FromEnv),
        }
    }
}

fn find_frontend_dir() -> Option<PathBuf> {
    FRONTEND_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}

/// Builds the application router.
pub fn build_router(state: AppState, cfg: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/share", post(create_share))
        .route("/api/share/:token", get(get_share).delete(delete_share))
        .with_state(state);

    let app = match &cfg.frontend_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(build_cors(cfg.allowed_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    info!(config = %cfg.exchange.summary(), "starting once-share");

    let store = Arc::new(
        ExchangeStore::builder()
            .with_config(cfg.exchange.clone())
            .build(),
    );
    let sweeper = store.spawn_sweeper();

    let state = AppState::new(Arc::clone(&store), cfg.base_url.clone());
    let app = build_router(state, &cfg);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, base_url = %cfg.base_url, "once-share server listening");
    match &cfg.frontend_dir {
        Some(dir) => info!(frontend = %dir.display(), "serving static frontend"),
        None => warn!("no frontend directory found; serving API only"),
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.shutdown().await;
    info!("once-share stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match origins {
        Some(o) => {
            let origins: Vec<HeaderValue> = o
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            cors.allow_origin(origins).allow_credentials(true)
        }
        None => cors.allow_origin(Any),
    }
}
