//! Static service metadata.

use axum::{http::StatusCode, response::Response};
use serde::Serialize;

use crate::core::http::response_envelope::ApiResponse;

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
}

pub async fn info_route() -> Response {
    ApiResponse::success(InfoResponse {
        name: "code-critics",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: &["POST /api/webhooks", "GET /health", "GET /api/info"],
    })
    .into_response_with_status(StatusCode::OK)
}
