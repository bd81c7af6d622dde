//! Outbound calls to the remote generation stages
//!
//! This crate holds everything between a ready-made JSON payload and a parsed
//! JSON response:
//!
//! - [`RequestExecutor`]: one POST with timeout, cancellation and JSON checks
//! - [`RetryPolicy`]: bounded exponential backoff around the executor
//! - [`RequestSlot`]: at most one in-flight request per caller
//! - [`StageBackend`]: the seam the workflow engine calls through, with
//!   [`WebhookBackend`] as the production implementation

mod backend;
mod executor;
mod retry;
mod slot;

pub use backend::{StageBackend, StageRequest, WebhookBackend};
pub use executor::{RawResponse, RequestExecutor, RequestOptions, TimeoutPolicy, status_message};
pub use retry::{RetryOutcome, RetryPolicy};
pub use slot::{InFlight, RequestSlot};
