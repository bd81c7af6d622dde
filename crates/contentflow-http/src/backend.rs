//! Stage backend seam
//!
//! The workflow engine never talks to `reqwest` directly. It calls a
//! [`StageBackend`], which in production is a [`WebhookBackend`] and in tests
//! a scripted fake.

use std::time::Duration;

use async_trait::async_trait;
use contentflow_config::Config;
use contentflow_utils::error::WorkflowError;
use contentflow_utils::types::Stage;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::executor::{RawResponse, RequestExecutor, RequestOptions};

/// One call to a remote stage.
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub stage: Stage,
    pub payload: Value,
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

/// Trait for stage backend implementations
///
/// Implementations perform exactly one call per `invoke`; retry and
/// in-flight bookkeeping live above this seam.
#[async_trait]
pub trait StageBackend: Send + Sync {
    /// Invoke the remote stage
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError` for transport, HTTP, timeout, cancellation and
    /// JSON failures, and `Misconfiguration` when the stage cannot be reached.
    async fn invoke(&self, request: StageRequest) -> Result<RawResponse, WorkflowError>;
}

/// Backend that POSTs each stage to its configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookBackend {
    executor: RequestExecutor,
    config: Config,
}

impl WebhookBackend {
    #[must_use]
    pub fn new(executor: RequestExecutor, config: Config) -> Self {
        Self { executor, config }
    }

    /// Build a backend with a fresh executor.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Misconfiguration` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, WorkflowError> {
        Ok(Self::new(RequestExecutor::new()?, config.clone()))
    }
}

#[async_trait]
impl StageBackend for WebhookBackend {
    async fn invoke(&self, request: StageRequest) -> Result<RawResponse, WorkflowError> {
        let endpoint = self.config.endpoint(request.stage)?;
        debug!(stage = %request.stage, "Dispatching stage webhook");
        self.executor
            .execute(
                request.stage,
                endpoint,
                &request.payload,
                RequestOptions {
                    timeout: request.timeout,
                    cancel: request.cancel,
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_endpoint_fails_before_network() {
        let config = Config::builder().build().unwrap();
        let backend = WebhookBackend::from_config(&config).unwrap();

        let err = backend
            .invoke(StageRequest {
                stage: Stage::Outline,
                payload: json!({}),
                timeout: Duration::from_secs(1),
                cancel: CancellationToken::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Misconfiguration(_)));
    }
}
