use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::{Stage, StepId};

/// Library-level error type with rich context and user-friendly reporting.
///
/// `ContentFlowError` is the error returned by contentflow library entry points
/// that span more than one concern (configuration, workflow stages, local state).
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file or CLI argument errors |
/// | `Workflow` | Stage execution, validation and user input errors |
/// | `Io` | Local filesystem errors |
/// | `Snapshot` | Saved workflow state could not be read or written |
///
/// # Exit Code Mapping
///
/// Use [`to_exit_code()`](Self::to_exit_code) to map errors to CLI exit codes.
///
/// Library code returns `ContentFlowError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum ContentFlowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error at {path}: {reason}")]
    Snapshot { path: String, reason: String },
}

/// Failures of a single workflow stage or a local workflow transition.
///
/// The transport-level variants (`Timeout`, `Aborted`, `Network`, `Http`,
/// `EmptyResponse`, `InvalidJson`) are produced by the request executor.
/// `InvalidResponseShape` comes from the normalizer, `Validation` from the
/// workflow context, and `UserInput` from payload assembly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The request did not complete within its timeout
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// The request was cancelled by the user or superseded by a newer request
    #[error("Request aborted: {reason}")]
    Aborted { reason: String },

    /// Connection or transport failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 2xx response with a blank body
    #[error("Empty response from {stage} stage")]
    EmptyResponse { stage: Stage },

    /// Response body was not valid JSON
    #[error("Invalid JSON from {stage} stage: {reason}")]
    InvalidJson { stage: Stage, reason: String },

    /// JSON parsed but matched none of the accepted response shapes
    #[error("Unrecognized response shape from {stage} stage: {reason}")]
    InvalidResponseShape { stage: Stage, reason: String },

    /// A stage output could not be accepted at the current step
    #[error("Validation failed at step {step}: {reason}")]
    Validation { step: StepId, reason: String },

    /// Local input is missing or inconsistent; never reaches the network
    #[error("Invalid input: {0}")]
    UserInput(String),

    /// A stage is not configured (e.g. no endpoint)
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl WorkflowError {
    /// Whether the retry controller may attempt the call again.
    ///
    /// Timeouts and aborts short-circuit retry so that already-long waits
    /// are not compounded; local errors are never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::EmptyResponse { .. } | Self::InvalidJson { .. }
        )
    }

    /// Whether the error was raised by a cancelled or timed-out request.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Aborted { .. })
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    RemoteStage,
    Cancellation,
    Validation,
    UserInput,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::RemoteStage => write!(f, "Remote Stage"),
            Self::Cancellation => write!(f, "Cancellation"),
            Self::Validation => write!(f, "Validation"),
            Self::UserInput => write!(f, "User Input"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {path}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => {
                Some("Configuration files use TOML with [defaults], [endpoints] and [profile] sections.".to_string())
            }
            Self::MissingRequired(_) | Self::InvalidValue { .. } => Some(
                "Values are resolved with precedence: CLI flags > config file > built-in defaults."
                    .to_string(),
            ),
            Self::NotFound { .. } => Some(
                "Without --config, .contentflow/config.toml is searched upward from the current directory."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Compare the file against the documented sections".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Set '{key}' in .contentflow/config.toml")],
            Self::InvalidValue { key, .. } => {
                vec![format!("Correct the value of '{key}' and retry")]
            }
            Self::NotFound { .. } => vec![
                "Check the --config path".to_string(),
                "Create .contentflow/config.toml in the project directory".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for WorkflowError {
    fn user_message(&self) -> String {
        match self {
            Self::Timeout { duration } => format!(
                "The request took longer than {}s and was stopped",
                duration.as_secs()
            ),
            Self::Aborted { .. } => "The request was cancelled".to_string(),
            Self::Network(_) => {
                "Could not reach the generation service. Check your connection.".to_string()
            }
            Self::Http { message, .. } => message.clone(),
            Self::EmptyResponse { stage } => {
                format!("The {stage} service returned an empty response")
            }
            Self::InvalidJson { stage, .. } => {
                format!("The {stage} service returned a response that could not be read")
            }
            Self::InvalidResponseShape { stage, .. } => {
                format!("The {stage} service returned data in an unexpected format")
            }
            Self::Validation { reason, .. } => format!("Could not continue: {reason}"),
            Self::UserInput(msg) => msg.clone(),
            Self::Misconfiguration(msg) => format!("Workflow is not configured: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Timeout { .. } => Some(
                "Long or complex keywords take longer to process; timeouts are not retried automatically."
                    .to_string(),
            ),
            Self::Aborted { .. } => Some(
                "Starting a new request for the same stage cancels the one still in flight."
                    .to_string(),
            ),
            Self::Network(_) | Self::Http { .. } => Some(
                "Transient failures were retried with exponential backoff before giving up."
                    .to_string(),
            ),
            Self::EmptyResponse { .. } | Self::InvalidJson { .. } | Self::InvalidResponseShape { .. } => Some(
                "Previously entered data is preserved; the step was not advanced.".to_string(),
            ),
            Self::Validation { step, .. } => Some(format!("The workflow stays at step '{step}'.")),
            Self::UserInput(_) => None,
            Self::Misconfiguration(_) => {
                Some("Stage endpoints are configured under [endpoints].".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Timeout { .. } | Self::Network(_) | Self::Http { .. } => {
                vec!["Wait a moment and submit again".to_string()]
            }
            Self::Aborted { .. } => vec!["Submit again when ready".to_string()],
            Self::EmptyResponse { .. } | Self::InvalidJson { .. } | Self::InvalidResponseShape { .. } => {
                vec![
                    "Submit again; the upstream service may have had a transient fault".to_string(),
                    "Run with --verbose to log the fields that were missing".to_string(),
                ]
            }
            Self::Validation { .. } => vec!["Check `contentflow status` for the current step".to_string()],
            Self::UserInput(_) => vec!["Fix the input and submit again".to_string()],
            Self::Misconfiguration(_) => {
                vec!["Add the missing endpoint to .contentflow/config.toml".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout { .. } | Self::Aborted { .. } => ErrorCategory::Cancellation,
            Self::Network(_)
            | Self::Http { .. }
            | Self::EmptyResponse { .. }
            | Self::InvalidJson { .. }
            | Self::InvalidResponseShape { .. } => ErrorCategory::RemoteStage,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::UserInput(_) => ErrorCategory::UserInput,
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
        }
    }
}

impl UserFriendlyError for ContentFlowError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Workflow(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
            Self::Snapshot { path, reason } => {
                format!("Saved workflow state at {path} could not be used: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Workflow(err) => err.context(),
            Self::Io(_) => None,
            Self::Snapshot { .. } => Some(
                "Workflow state is stored as JSON between command invocations.".to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Workflow(err) => err.suggestions(),
            Self::Io(_) => vec!["Check file permissions and available disk space".to_string()],
            Self::Snapshot { .. } => vec![
                "Run `contentflow reset` to start a fresh workflow".to_string(),
                "Pass --state to point at a different state file".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Workflow(err) => err.category(),
            Self::Io(_) | Self::Snapshot { .. } => ErrorCategory::FileSystem,
        }
    }
}

impl ContentFlowError {
    /// Render the error with context and suggestions for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("Error [{}]: {}", self.category(), self.user_message());
        if let Some(context) = self.context() {
            out.push_str(&format!("\n  {context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str(&format!("\n  - {suggestion}"));
            }
        }
        out
    }
}
