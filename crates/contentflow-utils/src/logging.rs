//! Logging and observability for contentflow
//!
//! Structured logging via `tracing`. Stage calls run inside a [`stage_span`]
//! carrying the workflow id and stage name, and stage outcomes are logged with
//! the helpers below so every log line has the same field set.

use std::time::Duration;
use tracing::{Level, error, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::redaction::redact_error_message;
use crate::types::Stage;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode logs contentflow at debug
/// level with targets and span close events; the default is a compact
/// info-level format.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("contentflow=debug,info")
            } else {
                EnvFilter::try_new("contentflow=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one stage call, including its retries.
pub fn stage_span(workflow_id: &str, stage: Stage) -> tracing::Span {
    span!(
        Level::INFO,
        "stage",
        workflow_id = %workflow_id,
        stage = %stage,
    )
}

/// Log stage start with structured fields.
pub fn log_stage_start(workflow_id: &str, stage: Stage, timeout: Duration) {
    info!(
        workflow_id = %workflow_id,
        stage = %stage,
        timeout_ms = timeout.as_millis() as u64,
        "Starting stage request"
    );
}

/// Log stage completion with duration and attempt count.
pub fn log_stage_complete(workflow_id: &str, stage: Stage, duration: Duration, attempts: u32) {
    info!(
        workflow_id = %workflow_id,
        stage = %stage,
        duration_ms = duration.as_millis() as u64,
        attempts,
        "Stage request completed"
    );
}

/// Log a stage failure. The message is redacted before it is recorded.
pub fn log_stage_error(workflow_id: &str, stage: Stage, error: &str, duration: Duration) {
    let sanitized = redact_error_message(error);
    error!(
        workflow_id = %workflow_id,
        stage = %stage,
        duration_ms = duration.as_millis() as u64,
        error = %sanitized,
        "Stage request failed"
    );
}

/// Log a field the normalizer expected but did not find.
///
/// This never fails the stage; it exists so upstream contract drift shows up
/// in logs.
pub fn log_missing_field(stage: Stage, field: &str) {
    warn!(stage = %stage, field = %field, "Expected field missing from stage response");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_an_error_not_a_panic() {
        let _ = init_tracing(false);
        assert!(init_tracing(true).is_err());
    }

    #[test]
    fn test_stage_span_has_name() {
        let span = stage_span("wf-1", Stage::Clustering);
        // Disabled spans have no metadata when no subscriber is interested.
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "stage");
        }
    }

    #[test]
    fn test_log_helpers_do_not_panic_without_subscriber() {
        log_stage_start("wf-1", Stage::KeywordResearch, Duration::from_secs(120));
        log_stage_complete("wf-1", Stage::KeywordResearch, Duration::from_millis(800), 1);
        log_stage_error(
            "wf-1",
            Stage::KeywordResearch,
            "failed at https://u:p@host/x",
            Duration::from_millis(5),
        );
        log_missing_field(Stage::Article, "metaTags");
    }
}
