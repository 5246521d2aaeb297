//! Resilient HTTP layer for the ordering API.
//!
//! # Architecture
//!
//! - [`error`] - error taxonomy and the pure classifier driving both
//!   retry eligibility and user-facing wording
//! - [`retry`] - bounded exponential backoff with per-attempt timeouts
//! - [`client`] - the request gateway everything above it goes through
//!
//! Failures are classified exactly once, at the gateway boundary; the
//! classification travels with the error instead of being recomputed by
//! callers.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{ApiClient, RequestBody, RequestOptions};
pub use error::{ApiError, Classification, ErrorKind, classify};
pub use retry::{RetryPolicy, RetryObserver};
