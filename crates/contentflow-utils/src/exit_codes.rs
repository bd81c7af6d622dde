//! Exit code constants and error mapping for the contentflow CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `VALIDATION` | Stage output rejected; workflow not advanced |
//! | 4 | `USER_INPUT` | Missing or inconsistent local input |
//! | 10 | `STAGE_TIMEOUT` | Stage call timed out or was cancelled |
//! | 70 | `REMOTE_FAILURE` | Remote stage failed after retries |

use crate::error::{ContentFlowError, WorkflowError};

/// Exit codes matching the documented exit code table.
///
/// ```rust
/// use contentflow_utils::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(70), ExitCode::REMOTE_FAILURE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Validation error - stage output rejected at the current step
    pub const VALIDATION: ExitCode = ExitCode(3);

    /// User input error - submission blocked locally
    pub const USER_INPUT: ExitCode = ExitCode(4);

    /// Stage timeout - the call timed out or was cancelled
    pub const STAGE_TIMEOUT: ExitCode = ExitCode(10);

    /// Remote failure - network, HTTP or response errors after retries
    pub const REMOTE_FAILURE: ExitCode = ExitCode(70);

    /// Create an exit code from a raw integer value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl WorkflowError {
    /// Map this error to a CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Timeout { .. } | Self::Aborted { .. } => ExitCode::STAGE_TIMEOUT,
            Self::Network(_)
            | Self::Http { .. }
            | Self::EmptyResponse { .. }
            | Self::InvalidJson { .. }
            | Self::InvalidResponseShape { .. } => ExitCode::REMOTE_FAILURE,
            Self::Validation { .. } => ExitCode::VALIDATION,
            Self::UserInput(_) => ExitCode::USER_INPUT,
            Self::Misconfiguration(_) => ExitCode::CLI_ARGS,
        }
    }
}

impl ContentFlowError {
    /// Map this error to a CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Workflow(err) => err.to_exit_code(),
            Self::Io(_) | Self::Snapshot { .. } => ExitCode::INTERNAL,
        }
    }
}
