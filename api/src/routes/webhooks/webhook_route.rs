//! Webhook dispatcher: front door for every delivery.
//!
//! Steps:
//! 1. Verify the HMAC-SHA256 signature over the raw body (401 on failure).
//! 2. Parse and classify the payload (400 with field details on failure).
//! 3. Answer pings with 200, unhandled kinds with 202.
//! 4. For review-triggering events, ACK with 202 immediately and run the
//!    orchestrator on a detached task holding a bounded job permit; a full
//!    pool yields 429 plus a best-effort rate-limit notice on the PR.
//!
//! The (sanitized) payload is only logged after the ACK so logging cost
//! never delays the response.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::{debug, error, info, warn};

use reviewer::github::types::StatusState;
use reviewer::review::{ReviewJob, run_review};
use reviewer::{EventKind, Publisher, classify, sanitize_for_log, verify_signature};

use crate::core::app_state::AppState;
use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

/// Main webhook handler: `POST /api/webhooks`.
pub async fn webhook_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // 1. Signature over the raw bytes, exactly as delivered.
    let signature = header_str(&headers, "x-hub-signature-256");
    if !verify_signature(&body, &state.config.webhook_secret, signature) {
        warn!("webhook signature verification failed");
        return ApiResponse::<()>::error("Invalid signature", Vec::new())
            .into_response_with_status(StatusCode::UNAUTHORIZED);
    }

    let event_name = header_str(&headers, "x-github-event").to_string();
    let delivery_id = header_str(&headers, "x-github-delivery").to_string();

    // 2. Parse + classify.
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "webhook body is not valid JSON");
            return ApiResponse::<()>::error("Invalid JSON payload", Vec::new())
                .into_response_with_status(StatusCode::BAD_REQUEST);
        }
    };

    let event = match classify(&delivery_id, &event_name, &payload) {
        Ok(ev) => ev,
        Err(field_errors) => {
            let summary: Vec<String> = field_errors
                .iter()
                .map(|f| format!("{}: {}", f.path, f.hint))
                .collect();
            warn!(event = %event_name, details = ?summary, "webhook payload failed validation");
            let details = field_errors
                .into_iter()
                .map(|f| ApiErrorDetail {
                    path: Some(f.path),
                    hint: Some(f.hint),
                })
                .collect();
            return ApiResponse::<()>::error("Invalid webhook payload", details)
                .into_response_with_status(StatusCode::BAD_REQUEST);
        }
    };

    info!(
        event = %event_name,
        action = %event.action,
        delivery_id = %delivery_id,
        repo = %event.repo.full_name,
        "received webhook"
    );

    // 3/4. Route by kind.
    match event.kind {
        EventKind::Ping => {
            ApiResponse::<()>::ack("pong").into_response_with_status(StatusCode::OK)
        }
        EventKind::PrChanged | EventKind::MentionComment => {
            let Some(job) = ReviewJob::from_event(&event) else {
                return ApiResponse::<()>::ack("Event not handled")
                    .into_response_with_status(StatusCode::ACCEPTED);
            };

            match Arc::clone(&state.job_slots).try_acquire_owned() {
                Ok(permit) => {
                    let ctx = state.review_context();
                    tokio::spawn(async move {
                        let _permit = permit;
                        debug!(
                            delivery_id = %job.delivery_id,
                            payload = %sanitize_for_log(&payload),
                            "webhook payload (sanitized)"
                        );
                        run_job_guarded(ctx, job).await;
                    });
                    ApiResponse::<()>::ack("Review started")
                        .into_response_with_status(StatusCode::ACCEPTED)
                }
                Err(_) => {
                    warn!(
                        repo = %job.repo.full_name,
                        pull = job.pull_number,
                        "job pool exhausted, refusing review"
                    );
                    let github = Arc::clone(&state.github);
                    tokio::spawn(async move {
                        Publisher::new(
                            github,
                            job.repo.clone(),
                            job.pull_number,
                            job.head_sha.clone().unwrap_or_default(),
                        )
                        .post_notice_logged("Rate limit exceeded - please try again later.")
                        .await;
                    });
                    ApiResponse::<()>::error(
                        "Review capacity exhausted - please retry later",
                        Vec::new(),
                    )
                    .into_response_with_status(StatusCode::TOO_MANY_REQUESTS)
                }
            }
        }
        EventKind::Other => {
            ApiResponse::<()>::ack(format!("Event `{event_name}` not handled"))
                .into_response_with_status(StatusCode::ACCEPTED)
        }
    }
}

/// Runs the orchestrator on its own task so a panic is contained and
/// converted into an internal-bug failure with a generic user message.
async fn run_job_guarded(ctx: reviewer::ReviewContext, job: ReviewJob) {
    let inner_ctx = ctx.clone();
    let inner_job = job.clone();
    let handle = tokio::spawn(async move { run_review(&inner_ctx, inner_job).await });

    match handle.await {
        Ok(outcome) => {
            debug!(job_id = %job.job_id, ?outcome, "review task completed");
        }
        Err(join_err) if join_err.is_panic() => {
            error!(
                repo = %job.repo.full_name,
                pull = job.pull_number,
                trigger = job.trigger.as_str(),
                kind = "internal_bug",
                "review task panicked"
            );
            let publisher = Publisher::new(
                Arc::clone(&ctx.github),
                job.repo.clone(),
                job.pull_number,
                job.head_sha.clone().unwrap_or_default(),
            );
            publisher
                .post_notice_logged(
                    "CodeCritic review failed. An unexpected error occurred during the review process.",
                )
                .await;
            if job.head_sha.is_some() {
                publisher
                    .set_status_logged(
                        StatusState::Error,
                        "An unexpected error occurred during the review process.",
                    )
                    .await;
            }
        }
        Err(join_err) => {
            warn!(error = %join_err, "review task cancelled");
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
