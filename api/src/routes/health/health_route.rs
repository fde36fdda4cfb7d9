//! Service health: configuration echo, host identity, host quota, and the
//! active provider's reachability.
//!
//! Overall status is `ok` (200) iff the host identity call succeeds;
//! anything else is `degraded` (503). Provider problems alone do not flip
//! the status: they show up in the `provider` section.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response};
use tracing::warn;

use crate::core::app_state::AppState;
use crate::core::http::response_envelope::ApiResponse;
use crate::routes::health::health_response::{ConfigEcho, GithubHealth, HealthResponse};

pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let (identity, rate_limit) = tokio::join!(
        state.github.validate_identity(),
        state.github.rate_limit(),
    );

    let provider = match &state.gateway {
        Some(gateway) => Some(state.health.check(gateway.model_config()).await),
        None => None,
    };

    let (identity, github_error) = match identity {
        Ok(id) => (Some(id), None),
        Err(e) => {
            warn!(error = %e, "health: host identity check failed");
            (None, Some(e.to_string()))
        }
    };

    let healthy = identity.is_some();
    let body = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        config: ConfigEcho {
            github_token_present: !state.config.github_token.is_empty(),
            webhook_secret_present: !state.config.webhook_secret.is_empty(),
            ai_provider: state
                .gateway
                .as_ref()
                .map(|g| g.provider().to_string())
                .unwrap_or_else(|| "unavailable".to_string()),
            provider_fallback_active: state
                .gateway
                .as_ref()
                .is_some_and(|g| g.primary_degraded),
            max_diff_size: state.config.max_diff_size,
            allow_list_configured: !state.config.allowed_repositories.is_empty(),
        },
        github: GithubHealth {
            identity,
            error: github_error,
            rate_limit: rate_limit.ok(),
        },
        provider,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::success(body).into_response_with_status(status)
}
