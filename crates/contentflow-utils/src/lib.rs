//! Foundation utilities shared by every contentflow crate.
//!
//! - [`error`]: the workflow error taxonomy and user-facing error reporting
//! - [`exit_codes`]: CLI exit codes derived from errors
//! - [`logging`]: tracing initialization and stage-scoped structured logging
//! - [`redaction`]: scrubbing credentials out of messages before they are logged
//! - [`atomic_write`]: temp file + fsync + rename writes for local state
//! - [`types`]: identifiers shared across crates (`StepId`, `Stage`, `ConfigSource`)

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod redaction;
pub mod types;

pub use error::{ContentFlowError, WorkflowError};
pub use exit_codes::ExitCode;
