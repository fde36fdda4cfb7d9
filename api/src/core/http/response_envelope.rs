use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Universal response envelope for both success and error replies.
///
/// Serialization follows the wire contract webhook senders consume:
/// acknowledgements come out as `{message}`, failures as
/// `{error, details[]}`, and data-bearing endpoints (health, info) flatten
/// their payload to the top level. Success is carried by the HTTP status
/// code alone, so no extra flag field ever widens those shapes.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// Human-readable acknowledgement for accepted/ignored deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Payload for data-bearing endpoints; its fields serialize at the top
    /// level of the response body.
    #[serde(flatten)]
    pub data: Option<T>,

    /// Stable, machine-readable error summary (e.g. "Invalid signature").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Optional fine-grained error details (per-field, hints, etc.).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Serialize)]
pub struct ApiErrorDetail {
    /// Field path like `pull_request.number`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Optional hint to help the sender fix the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Build a success envelope around a data payload.
    pub fn success(data: T) -> Self {
        Self {
            message: None,
            data: Some(data),
            error: None,
            details: Vec::new(),
        }
    }

    /// Build an acknowledgement envelope (`{message}`).
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            data: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Build an error envelope (`{error, details[]}`).
    pub fn error(error: impl Into<String>, details: Vec<ApiErrorDetail>) -> Self {
        Self {
            message: None,
            data: None,
            error: Some(error.into()),
            details,
        }
    }

    /// Convert to an axum Response with the given status.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_serializes_as_message_only() {
        let json = serde_json::to_value(ApiResponse::<()>::ack("pong")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "pong" }));
    }

    #[test]
    fn error_serializes_with_details() {
        let resp = ApiResponse::<()>::error(
            "Invalid webhook payload",
            vec![ApiErrorDetail {
                path: Some("pull_request.number".into()),
                hint: Some("expected an integer".into()),
            }],
        );
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["error"], "Invalid webhook payload");
        assert_eq!(json["details"][0]["path"], "pull_request.number");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn error_without_details_omits_the_array() {
        let json = serde_json::to_value(ApiResponse::<()>::error("Invalid signature", Vec::new()))
            .unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Invalid signature" }));
    }

    #[test]
    fn success_flattens_payload_to_top_level() {
        #[derive(Serialize)]
        struct Payload {
            name: &'static str,
        }
        let json = serde_json::to_value(ApiResponse::success(Payload { name: "code-critics" }))
            .unwrap();
        assert_eq!(json, serde_json::json!({ "name": "code-critics" }));
    }
}
