//! contentflow - a keyword-to-article content workflow over remote stages
//!
//! One seed keyword moves through five remote generation stages:
//!
//! keyword research → clustering → titles and descriptions → outlines → article
//!
//! Each stage is a webhook. contentflow builds the request payloads from
//! earlier results, calls the stage with timeouts, retry and cancellation,
//! normalizes whatever envelope the reply arrives in, and stores the result
//! in a [`WorkflowContext`] that owns the user's position in the pipeline.
//!
//! contentflow can be used in two ways:
//! - **CLI**: run `contentflow research <keyword>` and follow the steps
//! - **Library**: drive a [`StageRunner`] over your own [`StageBackend`]
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use contentflow::{Config, ResearchDefaults, ResearchInput, StageRunner, WebhookBackend,
//!     WorkflowContext, workflow_handle};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder()
//!     .endpoint(contentflow::types::Stage::KeywordResearch, "https://hooks.example.com/research")
//!     .build()?;
//! let backend = Arc::new(WebhookBackend::from_config(&config)?);
//! let runner = StageRunner::from_config(backend, &config, "user-1");
//!
//! let handle = workflow_handle(WorkflowContext::new("session-1"));
//! let report = runner
//!     .research(&handle, &ResearchInput::new("sustainable gardening"), &ResearchDefaults::default())
//!     .await?;
//! println!("now at {}", report.step);
//! # Ok(())
//! # }
//! ```
//!
//! # Stable Public API
//!
//! - [`WorkflowContext`] and [`StageRunner`] - the workflow and its stage operations
//! - [`StageBackend`] - the seam for custom transports and tests
//! - [`Config`] and [`ConfigBuilder`] - Configuration management
//! - [`ContentFlowError`] and [`WorkflowError`] - Library error types
//! - [`ExitCode`] - CLI exit codes
//!
//! Member crates are re-exported under their module names and marked
//! `#[doc(hidden)]`.

// ============================================================================
// Stable Public API
// ============================================================================

/// Configuration for contentflow operations.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > config file > built-in defaults.
pub use contentflow_config::Config;

/// Builder for programmatic configuration without config files.
pub use contentflow_config::ConfigBuilder;

/// CLI argument structure for configuration override.
pub use contentflow_config::CliArgs;

/// Library-level error type.
///
/// Library code returns `ContentFlowError` and does NOT call `std::process::exit()`.
pub use contentflow_utils::error::ContentFlowError;

/// Failure of a single stage call or workflow operation.
pub use contentflow_utils::error::WorkflowError;

/// Error categories for grouping similar errors.
pub use contentflow_utils::error::ErrorCategory;

/// Trait for providing user-friendly error reporting.
pub use contentflow_utils::error::UserFriendlyError;

/// Exit codes matching the documented exit code table.
pub use contentflow_utils::exit_codes::ExitCode;

pub use contentflow_engine::{
    AuthSession, ProfileStore, ResearchDefaults, ResearchInput, ResearchProfile, StageReport,
    StageRunner, WorkflowContext, WorkflowHandle, lock_workflow, workflow_handle,
};
pub use contentflow_http::{RetryPolicy, StageBackend, StageRequest, TimeoutPolicy, WebhookBackend};

// ============================================================================
// Internal modules - accessible but not stable
// ============================================================================

#[doc(hidden)]
pub use contentflow_utils::{atomic_write, error, exit_codes, logging, redaction, types};

#[doc(hidden)]
pub use contentflow_config as config;

#[doc(hidden)]
pub use contentflow_http as http;

#[doc(hidden)]
pub use contentflow_engine::{context, model, normalize, payload, profile, progress, runner, snapshot};

// CLI module - used by main.rs, exported for white-box tests of flag parsing
#[doc(hidden)]
pub mod cli;
