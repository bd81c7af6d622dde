//! Single outbound call to a stage webhook
//!
//! The executor owns one pooled `reqwest::Client` and turns every failure mode
//! of a POST into a [`WorkflowError`] variant. It never retries and never
//! touches workflow state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contentflow_config::Config;
use contentflow_utils::error::WorkflowError;
use contentflow_utils::redaction::redact_error_message;
use contentflow_utils::types::Stage;
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Connect timeout applied to every request (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time granted per keyword word beyond [`TIMEOUT_FREE_WORDS`]
const TIMEOUT_PER_EXTRA_WORD: Duration = Duration::from_secs(15);

/// Keywords up to this many words use the base timeout
const TIMEOUT_FREE_WORDS: usize = 3;

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Deadline for the whole request, body included.
    pub timeout: Duration,
    /// Cancelled when the caller supersedes or abandons the request.
    pub cancel: CancellationToken,
}

/// A 2xx response whose body parsed as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
    pub elapsed: Duration,
}

/// User-facing text for a non-2xx status.
///
/// ```rust
/// use contentflow_http::status_message;
///
/// assert_eq!(status_message(429), "Too many requests. Please wait a moment and try again.");
/// assert_eq!(status_message(418), "Request failed with status 418");
/// ```
#[must_use]
pub fn status_message(status: u16) -> String {
    match status {
        400 => "Invalid request. Please check your input and try again.".to_string(),
        401 => "Authentication required. Please sign in again.".to_string(),
        403 => "You don't have permission to perform this action.".to_string(),
        404 => "The requested service was not found.".to_string(),
        429 => "Too many requests. Please wait a moment and try again.".to_string(),
        500 => "Server error. Please try again later.".to_string(),
        503 => "Service temporarily unavailable. Please try again later.".to_string(),
        other => format!("Request failed with status {other}"),
    }
}

/// Shared executor for stage webhooks.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    client: Arc<Client>,
}

impl RequestExecutor {
    /// Create an executor with the default client configuration.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Misconfiguration` if the client cannot be built.
    pub fn new() -> Result<Self, WorkflowError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                WorkflowError::Misconfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// POST `payload` to `endpoint` and return the parsed JSON body.
    ///
    /// The request races both the timeout and the cancellation token:
    ///
    /// - deadline reached → `Timeout`
    /// - token cancelled → `Aborted`
    /// - connect/transport failure → `Network` (message redacted)
    /// - non-2xx → `Http` with [`status_message`] text
    /// - blank body → `EmptyResponse`
    /// - body not JSON → `InvalidJson`
    ///
    /// # Errors
    ///
    /// See above; every failure is a [`WorkflowError`].
    pub async fn execute(
        &self,
        stage: Stage,
        endpoint: &str,
        payload: &Value,
        options: RequestOptions,
    ) -> Result<RawResponse, WorkflowError> {
        let started = Instant::now();

        debug!(
            stage = %stage,
            timeout_ms = options.timeout.as_millis() as u64,
            "Executing stage request"
        );

        let send = async {
            let response = self
                .client
                .post(endpoint)
                .json(payload)
                .send()
                .await
                .map_err(|e| transport_error(&e, options.timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(WorkflowError::Http {
                    status: status.as_u16(),
                    message: status_message(status.as_u16()),
                });
            }

            let text = response
                .text()
                .await
                .map_err(|e| transport_error(&e, options.timeout))?;

            if text.trim().is_empty() {
                return Err(WorkflowError::EmptyResponse { stage });
            }

            let body = serde_json::from_str::<Value>(&text).map_err(|e| {
                WorkflowError::InvalidJson {
                    stage,
                    reason: e.to_string(),
                }
            })?;

            Ok::<_, WorkflowError>(RawResponse {
                status: status.as_u16(),
                body,
                elapsed: started.elapsed(),
            })
        };

        tokio::select! {
            biased;
            () = options.cancel.cancelled() => Err(WorkflowError::Aborted {
                reason: format!("{stage} request was cancelled"),
            }),
            result = tokio::time::timeout(options.timeout, send) => match result {
                Ok(outcome) => outcome,
                Err(_) => Err(WorkflowError::Timeout { duration: options.timeout }),
            },
        }
    }
}

fn transport_error(error: &reqwest::Error, timeout: Duration) -> WorkflowError {
    if error.is_timeout() {
        return WorkflowError::Timeout { duration: timeout };
    }
    WorkflowError::Network(redact_error_message(&error.to_string()))
}

/// Timeout selection for stage calls.
///
/// Longer seed keywords make the research and generation stages slower, so
/// the base timeout grows by 15 seconds for every word beyond the third, up
/// to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl TimeoutPolicy {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.timeout(), config.max_timeout())
    }

    /// Timeout for a request seeded by `keyword`.
    #[must_use]
    pub fn for_keyword(&self, keyword: &str) -> Duration {
        let extra_words = keyword
            .split_whitespace()
            .count()
            .saturating_sub(TIMEOUT_FREE_WORDS);
        let extra = TIMEOUT_PER_EXTRA_WORD
            .saturating_mul(u32::try_from(extra_words).unwrap_or(u32::MAX));
        self.base.saturating_add(extra).min(self.max)
    }
}
