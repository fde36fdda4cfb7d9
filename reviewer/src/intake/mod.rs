//! Webhook intake: signature verification and payload classification.
//!
//! Everything here runs before any outbound work; failures map to 401/400
//! at the dispatcher and never start a review job.

pub mod payload;
pub mod signature;

pub use payload::{EventKind, FieldError, WebhookEvent, classify, sanitize_for_log};
pub use signature::verify_signature;
