//! HTTP surface of the code-critics service.
//!
//! Routes:
//! - `POST /api/webhooks`: event intake (signature → classify → ACK →
//!   detached review job)
//! - `GET /health`: configuration, host identity, and provider probes
//! - `GET /api/info`: static service metadata

pub mod core;
pub mod error_handler;
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tracing::info;

use crate::core::app_state::AppState;
use crate::error_handler::AppError;

/// Maximum accepted webhook body size (10 MiB).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Builds state from the environment, binds the listener, and serves until
/// shutdown. Fails fast on configuration errors.
pub async fn start() -> Result<(), AppError> {
    let state = Arc::new(AppState::from_env()?);
    let port = state.config.port;

    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    info!(%addr, "code-critics listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;
    axum::serve(listener, app).await.map_err(AppError::Server)?;

    Ok(())
}

/// Assembles the router; split out so tests can drive it in-process.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/webhooks", post(routes::webhooks::webhook_route))
        .route("/health", get(routes::health::health_route))
        .route("/api/info", get(routes::info::info_route))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
