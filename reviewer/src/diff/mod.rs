//! Diff acquisition and shaping.
//!
//! - `fetch`: retrieves the unified diff, preferring the envelope-supplied
//!   diff URL after SSRF validation, with the compare-commits capability as
//!   fallback.
//! - `process`: file-boundary-preserving chunker, extension filter, and the
//!   size-adaptive skip policy.
//! - `scan`: right-side line ranges used to clamp finding lines.

pub mod fetch;
pub mod process;
pub mod scan;
