//! Stage runner: one entry point per remote stage
//!
//! Each operation follows the same path:
//!
//! 1. read the context and build the payload (context lock held briefly)
//! 2. claim the stage's [`RequestSlot`], cancelling any older call
//! 3. start the progress estimate and call the backend through the retry
//!    controller, racing the slot's cancellation token
//! 4. normalize the response
//! 5. re-lock the context and, only if this call still owns the slot,
//!    advance or record the output
//!
//! The context lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contentflow_config::Config;
use contentflow_http::{InFlight, RequestSlot, RetryPolicy, StageBackend, StageRequest, TimeoutPolicy};
use contentflow_utils::error::{UserFriendlyError, WorkflowError};
use contentflow_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};
use contentflow_utils::types::{Stage, StepId};
use serde_json::Value;
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Instrument, debug};

use crate::context::{StageOutput, WorkflowContext};
use crate::normalize::{self, Normalized};
use crate::payload::{
    ResearchInput, ResearchRequest, article_payload, clustering_payload, outline_payload,
    research_request_payload, title_payload,
};
use crate::profile::ResearchDefaults;
use crate::progress::{ProgressEstimator, ProgressHandle};

/// Shared handle to the workflow state.
pub type WorkflowHandle = Arc<Mutex<WorkflowContext>>;

#[must_use]
pub fn workflow_handle(context: WorkflowContext) -> WorkflowHandle {
    Arc::new(Mutex::new(context))
}

/// Lock the workflow state, recovering from a poisoned lock.
pub fn lock_workflow(handle: &WorkflowHandle) -> MutexGuard<'_, WorkflowContext> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Summary of a successful stage call.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    /// Step the workflow is on after the output was stored.
    pub step: StepId,
    pub attempts: u32,
    pub execution_id: Option<String>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

/// A payload ready to send, plus what is needed to interpret the reply.
struct Prepared {
    workflow_id: String,
    payload: Value,
    timeout: Duration,
}

pub struct StageRunner {
    backend: Arc<dyn StageBackend>,
    retry: RetryPolicy,
    timeouts: TimeoutPolicy,
    user_id: String,
    slots: HashMap<Stage, RequestSlot>,
    progress: Mutex<HashMap<Stage, watch::Receiver<u8>>>,
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("retry", &self.retry)
            .field("timeouts", &self.timeouts)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl StageRunner {
    #[must_use]
    pub fn new(
        backend: Arc<dyn StageBackend>,
        retry: RetryPolicy,
        timeouts: TimeoutPolicy,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            retry,
            timeouts,
            user_id: user_id.into(),
            slots: Stage::iter().map(|stage| (stage, RequestSlot::new())).collect(),
            progress: Mutex::new(HashMap::new()),
        }
    }

    /// Runner using the configured retry count and timeouts.
    #[must_use]
    pub fn from_config(backend: Arc<dyn StageBackend>, config: &Config, user_id: impl Into<String>) -> Self {
        Self::new(
            backend,
            RetryPolicy::new(config.max_retries()),
            TimeoutPolicy::from_config(config),
            user_id,
        )
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn slot(&self, stage: Stage) -> &RequestSlot {
        // every stage gets a slot in `new`
        &self.slots[&stage]
    }

    /// Abort the in-flight call for `stage`. Returns whether one was running.
    pub fn cancel(&self, stage: Stage) -> bool {
        let cancelled = self.slot(stage).cancel();
        if cancelled {
            debug!(stage = %stage, "Cancelled in-flight stage call");
        }
        cancelled
    }

    #[must_use]
    pub fn is_busy(&self, stage: Stage) -> bool {
        self.slot(stage).is_busy()
    }

    /// Progress of the latest call for `stage`, if one was started.
    #[must_use]
    pub fn subscribe_progress(&self, stage: Stage) -> Option<watch::Receiver<u8>> {
        let progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
        progress.get(&stage).cloned()
    }

    fn prepare<F>(&self, handle: &WorkflowHandle, build: F) -> Result<Prepared, WorkflowError>
    where
        F: FnOnce(&WorkflowContext) -> Result<(Value, String), WorkflowError>,
    {
        let mut ctx = lock_workflow(handle);
        match build(&ctx) {
            Ok((payload, keyword)) => Ok(Prepared {
                workflow_id: ctx.workflow_id().to_string(),
                payload,
                timeout: self.timeouts.for_keyword(&keyword),
            }),
            Err(err) => {
                ctx.set_last_error(err.user_message());
                Err(err)
            }
        }
    }

    /// Keyword research for the seed keyword; advances from `keyword`.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` for a blank keyword, the final transport error,
    /// `InvalidResponseShape`/`Validation` for unusable output, or `Aborted`
    /// when superseded or cancelled.
    pub async fn research(
        &self,
        handle: &WorkflowHandle,
        input: &ResearchInput,
        defaults: &ResearchDefaults,
    ) -> Result<StageReport, WorkflowError> {
        let request = match ResearchRequest::resolve(input, defaults) {
            Ok(request) => request,
            Err(err) => {
                lock_workflow(handle).set_last_error(err.user_message());
                return Err(err);
            }
        };
        let prepared = self.prepare(handle, |ctx| {
            let payload = research_request_payload(&ctx.payload_ids(&self.user_id), &request);
            Ok((payload, request.original_keyword.clone()))
        })?;

        self.dispatch(handle, Stage::KeywordResearch, prepared, |body| {
            Ok(normalize::research(body, &request)?.map(StageOutput::Research))
        })
        .await
    }

    /// Cluster the given keywords, or every researched keyword when `None`.
    /// The result is recorded while the user keeps selecting keywords.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` before research or for an empty selection, plus the
    /// failures listed on [`research`](Self::research).
    pub async fn cluster(
        &self,
        handle: &WorkflowHandle,
        keywords: Option<Vec<String>>,
    ) -> Result<StageReport, WorkflowError> {
        let prepared = self.prepare(handle, |ctx| {
            let research = ctx
                .research()
                .ok_or_else(|| WorkflowError::UserInput("Run keyword research first".to_string()))?;
            let keywords = keywords.unwrap_or_else(|| {
                research.keywords().into_iter().map(str::to_string).collect()
            });
            let payload = clustering_payload(
                &ctx.payload_ids(&self.user_id),
                &research.original_keyword,
                &keywords,
            )?;
            Ok((payload, research.original_keyword.clone()))
        })?;

        self.dispatch(handle, Stage::Clustering, prepared, |body| {
            Ok(normalize::clusters(body)?.map(StageOutput::Clusters))
        })
        .await
    }

    /// Titles and descriptions for every selected cluster item.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` before clustering or when nothing is selected, plus
    /// the failures listed on [`research`](Self::research).
    pub async fn generate_titles(&self, handle: &WorkflowHandle) -> Result<StageReport, WorkflowError> {
        let prepared = self.prepare(handle, |ctx| {
            let original = original_keyword(ctx)?;
            let clusters = ctx
                .clusters()
                .ok_or_else(|| WorkflowError::UserInput("Run clustering first".to_string()))?;
            let payload = title_payload(&ctx.payload_ids(&self.user_id), &original, clusters)?;
            Ok((payload, original))
        })?;

        self.dispatch(handle, Stage::TitleDescription, prepared, |body| {
            Ok(normalize::titles(body)?.map(StageOutput::Titles))
        })
        .await
    }

    /// Outline candidates for the chosen title.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` when no title is chosen, plus the failures listed
    /// on [`research`](Self::research).
    pub async fn generate_outlines(&self, handle: &WorkflowHandle) -> Result<StageReport, WorkflowError> {
        let prepared = self.prepare(handle, |ctx| {
            let original = original_keyword(ctx)?;
            let title = chosen_title(ctx)?;
            let payload = outline_payload(&ctx.payload_ids(&self.user_id), &original, title)?;
            Ok((payload, original))
        })?;

        self.dispatch(handle, Stage::Outline, prepared, |body| {
            Ok(normalize::outlines(body)?.map(StageOutput::Outlines))
        })
        .await
    }

    /// Article from the chosen title, selected outline and customization.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` when no title or outline is selected, plus the
    /// failures listed on [`research`](Self::research).
    pub async fn generate_article(&self, handle: &WorkflowHandle) -> Result<StageReport, WorkflowError> {
        let mut fallback_title = String::new();
        let prepared = self.prepare(handle, |ctx| {
            let original = original_keyword(ctx)?;
            let title = chosen_title(ctx)?;
            let outline = ctx.selected_outline().ok_or_else(|| {
                WorkflowError::UserInput(
                    "Select an outline or write your own before generating the article".to_string(),
                )
            })?;
            let payload = article_payload(
                &ctx.payload_ids(&self.user_id),
                &original,
                title,
                outline,
                ctx.customization(),
            )?;
            fallback_title = title.title.clone();
            Ok((payload, original))
        })?;

        self.dispatch(handle, Stage::Article, prepared, |body| {
            Ok(normalize::article(body, &fallback_title)?.map(StageOutput::Article))
        })
        .await
    }

    async fn dispatch<F>(
        &self,
        handle: &WorkflowHandle,
        stage: Stage,
        prepared: Prepared,
        normalize: F,
    ) -> Result<StageReport, WorkflowError>
    where
        F: FnOnce(&Value) -> Result<Normalized<StageOutput>, WorkflowError>,
    {
        let Prepared {
            workflow_id,
            payload,
            timeout,
        } = prepared;

        let ticket = self.slot(stage).begin();
        let token = ticket.token().clone();
        let mut progress = ProgressEstimator::new(timeout).start();
        {
            let mut receivers = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
            receivers.insert(stage, progress.subscribe());
        }

        let span = stage_span(&workflow_id, stage);
        log_stage_start(&workflow_id, stage, timeout);
        let started = Instant::now();

        let calls = self.retry.run(&token, |attempt| {
            let backend = Arc::clone(&self.backend);
            let request = StageRequest {
                stage,
                payload: payload.clone(),
                timeout,
                cancel: token.clone(),
            };
            async move {
                debug!(attempt, "Invoking stage backend");
                backend.invoke(request).await
            }
        });

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => Err(superseded()),
            result = calls.instrument(span) => result,
        };

        let result = outcome.and_then(|outcome| {
            let normalized = normalize(&outcome.value.body)?;
            Ok((outcome.attempts, normalized))
        });

        self.commit(handle, stage, &ticket, &workflow_id, result, started.elapsed(), &mut progress)
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        handle: &WorkflowHandle,
        stage: Stage,
        ticket: &InFlight,
        workflow_id: &str,
        result: Result<(u32, Normalized<StageOutput>), WorkflowError>,
        elapsed: Duration,
        progress: &mut ProgressHandle,
    ) -> Result<StageReport, WorkflowError> {
        let mut ctx = lock_workflow(handle);

        if !self.slot(stage).finish(ticket.id()) {
            progress.cancel();
            debug!(stage = %stage, "Discarding result of superseded stage call");
            return Err(superseded());
        }

        let applied = result.and_then(|(attempts, normalized)| {
            let step = ctx.apply(normalized.value)?;
            Ok(StageReport {
                stage,
                step,
                attempts,
                execution_id: normalized.execution_id,
                warnings: normalized.warnings,
                elapsed,
            })
        });

        match applied {
            Ok(report) => {
                progress.complete();
                log_stage_complete(workflow_id, stage, elapsed, report.attempts);
                Ok(report)
            }
            Err(err) => {
                progress.cancel();
                if !matches!(err, WorkflowError::Validation { .. }) {
                    ctx.set_last_error(err.user_message());
                }
                log_stage_error(workflow_id, stage, &err.to_string(), elapsed);
                Err(err)
            }
        }
    }
}

fn superseded() -> WorkflowError {
    WorkflowError::Aborted {
        reason: "superseded by a newer request or cancelled".to_string(),
    }
}

fn original_keyword(ctx: &WorkflowContext) -> Result<String, WorkflowError> {
    ctx.original_keyword()
        .map(str::to_string)
        .ok_or_else(|| WorkflowError::UserInput("Run keyword research first".to_string()))
}

fn chosen_title(ctx: &WorkflowContext) -> Result<&crate::model::TitleDescriptionItem, WorkflowError> {
    ctx.chosen_title()
        .ok_or_else(|| WorkflowError::UserInput("Choose a title before continuing".to_string()))
}
