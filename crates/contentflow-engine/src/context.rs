//! Workflow context: step pointer, identifiers and per-stage stores
//!
//! A [`WorkflowContext`] is a plain value owned by whoever drives the
//! workflow. Stage outputs enter through [`WorkflowContext::advance`] or
//! [`WorkflowContext::record`]; both validate before touching any state, so a
//! rejected output leaves the step pointer and every store exactly as they
//! were.

use chrono::{DateTime, Utc};
use contentflow_utils::error::WorkflowError;
use contentflow_utils::types::{Stage, StepId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use crate::model::{
    ArticleOutlineCustomization, CUSTOM_OUTLINE_ID, ClusterSet, GeneratedArticle,
    KeywordResearchResult, OutlineOption, TitleDescriptionItem, TitleSet,
};
use crate::payload::PayloadIds;

/// Identifiers and position of one run through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSession {
    /// Stable for the lifetime of the user session; survives `reset`.
    pub session_id: String,
    /// Regenerated on `reset` only.
    pub workflow_id: String,
    pub current_step: StepId,
    /// Furthest step reached in this run; bounds `go_to`.
    pub highest_step: StepId,
    pub started_at: DateTime<Utc>,
}

impl WorkflowSession {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            workflow_id: Uuid::new_v4().to_string(),
            current_step: StepId::Keyword,
            highest_step: StepId::Keyword,
            started_at: Utc::now(),
        }
    }
}

/// Validated output of every stage reached so far.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageStores {
    pub research: Option<KeywordResearchResult>,
    pub clusters: Option<ClusterSet>,
    pub titles: Option<TitleSet>,
    /// Keyword of the title carried into the outline stage.
    pub chosen_title: Option<String>,
    pub outlines: Vec<OutlineOption>,
    pub custom_outline: Option<OutlineOption>,
    /// Id of the outline carried into article generation.
    pub selected_outline: Option<String>,
    pub customization: ArticleOutlineCustomization,
    pub article: Option<GeneratedArticle>,
    /// Later results still built from a keyword that was researched over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<StaleResults>,
}

/// Stores produced for an earlier research keyword, kept until each stage
/// is run again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleResults {
    pub keyword: String,
    pub stages: Vec<Stage>,
}

impl StageStores {
    /// Stages downstream of research that currently hold a result.
    fn downstream_stages(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        if self.clusters.is_some() {
            stages.push(Stage::Clustering);
        }
        if self.titles.is_some() {
            stages.push(Stage::TitleDescription);
        }
        if !self.outlines.is_empty() || self.custom_outline.is_some() {
            stages.push(Stage::Outline);
        }
        if self.article.is_some() {
            stages.push(Stage::Article);
        }
        stages
    }

    /// Note that `stage` was run again for the current keyword.
    fn refreshed(&mut self, stage: Stage) {
        if let Some(stale) = &mut self.stale {
            stale.stages.retain(|s| *s != stage);
            if stale.stages.is_empty() {
                self.stale = None;
            }
        }
    }
}

/// A normalized stage result on its way into the context.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Research(KeywordResearchResult),
    Clusters(ClusterSet),
    Titles(TitleSet),
    Outlines(Vec<OutlineOption>),
    Article(GeneratedArticle),
}

impl StageOutput {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Research(_) => Stage::KeywordResearch,
            Self::Clusters(_) => Stage::Clustering,
            Self::Titles(_) => Stage::TitleDescription,
            Self::Outlines(_) => Stage::Outline,
            Self::Article(_) => Stage::Article,
        }
    }

    /// Step at which the stage is requested.
    #[must_use]
    pub const fn produced_at(&self) -> StepId {
        match self {
            Self::Research(_) => StepId::Keyword,
            Self::Clusters(_) | Self::Titles(_) => StepId::SelectKeywords,
            Self::Outlines(_) => StepId::TitleDescription,
            Self::Article(_) => StepId::Outline,
        }
    }

    /// Step the user lands on once the output is accepted.
    #[must_use]
    pub const fn lands_on(&self) -> StepId {
        match self {
            Self::Research(_) | Self::Clusters(_) => StepId::SelectKeywords,
            Self::Titles(_) => StepId::TitleDescription,
            Self::Outlines(_) => StepId::Outline,
            Self::Article(_) => StepId::Generated,
        }
    }

    /// Required-field checks; the normalizer already repaired what it could.
    fn problem(&self) -> Option<String> {
        match self {
            Self::Research(result) => {
                if result.original_keyword.trim().is_empty() {
                    Some("research result has no original keyword".to_string())
                } else if result.historical_search_data.is_empty() {
                    Some("research result has no keyword metrics".to_string())
                } else {
                    None
                }
            }
            Self::Clusters(set) => set.structural_problem(),
            Self::Titles(set) => {
                if set.items.is_empty() {
                    return Some("no titles were generated".to_string());
                }
                let mut seen = HashSet::new();
                set.items.iter().find_map(|item| {
                    if item.keyword.trim().is_empty() || item.title.trim().is_empty() {
                        Some("title item is missing its keyword or title".to_string())
                    } else if !seen.insert(item.keyword.to_ascii_lowercase()) {
                        Some(format!("duplicate title item for '{}'", item.keyword))
                    } else {
                        None
                    }
                })
            }
            Self::Outlines(options) => {
                if options.is_empty() {
                    return Some("no outlines were generated".to_string());
                }
                let mut seen = HashSet::new();
                options.iter().find_map(|option| {
                    if option.is_custom() {
                        Some(format!("generated outline uses reserved id '{CUSTOM_OUTLINE_ID}'"))
                    } else if option.content.trim().is_empty() {
                        Some(format!("outline '{}' is empty", option.id))
                    } else if !seen.insert(option.id.as_str()) {
                        Some(format!("duplicate outline id '{}'", option.id))
                    } else {
                        None
                    }
                })
            }
            Self::Article(article) => article
                .content
                .trim()
                .is_empty()
                .then(|| "generated article is empty".to_string()),
        }
    }
}

/// Top-level workflow state container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowContext {
    session: WorkflowSession,
    stores: StageStores,
    last_error: Option<String>,
}

impl WorkflowContext {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session: WorkflowSession::new(session_id.into()),
            stores: StageStores::default(),
            last_error: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.session.workflow_id
    }

    #[must_use]
    pub fn current_step(&self) -> StepId {
        self.session.current_step
    }

    #[must_use]
    pub fn highest_step(&self) -> StepId {
        self.session.highest_step
    }

    #[must_use]
    pub fn stores(&self) -> &StageStores {
        &self.stores
    }

    /// Error string for the UI after a failed stage, cleared on success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_last_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn reject(&mut self, reason: String) -> WorkflowError {
        self.last_error = Some(reason.clone());
        WorkflowError::Validation {
            step: self.session.current_step,
            reason,
        }
    }

    fn check(&mut self, output: &StageOutput) -> Result<(), WorkflowError> {
        match output.problem() {
            Some(reason) => Err(self.reject(reason)),
            None => Ok(()),
        }
    }

    /// Store a stage output produced at the current step and move to the
    /// step it unlocks.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the output belongs to another step or is
    /// missing required fields. Nothing but `last_error` changes.
    pub fn advance(&mut self, output: StageOutput) -> Result<StepId, WorkflowError> {
        if output.produced_at() != self.session.current_step {
            let reason = format!(
                "{} output cannot be accepted at step {}",
                output.stage(),
                self.session.current_step
            );
            return Err(self.reject(reason));
        }
        self.check(&output)?;

        let next = output.lands_on();
        self.store(output);
        self.session.current_step = next;
        self.session.highest_step = self.session.highest_step.max(next);
        self.last_error = None;
        Ok(next)
    }

    /// Replace a stage store without moving the step pointer.
    ///
    /// Used for clustering while keywords are being selected and for
    /// regenerating a stage the user already passed.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the stage's inputs have not been reached yet
    /// or the output is missing required fields.
    pub fn record(&mut self, output: StageOutput) -> Result<(), WorkflowError> {
        if output.produced_at() > self.session.current_step {
            let reason = format!(
                "{} output arrived before step {} was reached",
                output.stage(),
                output.produced_at()
            );
            return Err(self.reject(reason));
        }
        self.check(&output)?;

        self.store(output);
        self.last_error = None;
        Ok(())
    }

    /// Advance when the output is the one the current step is waiting for,
    /// otherwise record it.
    ///
    /// # Errors
    ///
    /// See [`advance`](Self::advance) and [`record`](Self::record).
    pub fn apply(&mut self, output: StageOutput) -> Result<StepId, WorkflowError> {
        if output.produced_at() == self.session.current_step
            && output.lands_on() != output.produced_at()
        {
            self.advance(output)
        } else {
            self.record(output)?;
            Ok(self.session.current_step)
        }
    }

    fn store(&mut self, output: StageOutput) {
        match output {
            StageOutput::Research(result) => {
                if let Some(previous) = &self.stores.research
                    && !previous
                        .original_keyword
                        .eq_ignore_ascii_case(&result.original_keyword)
                {
                    let stages = self.stores.downstream_stages();
                    if !stages.is_empty() {
                        warn!(
                            previous = %previous.original_keyword,
                            keyword = %result.original_keyword,
                            stages = ?stages,
                            "Research keyword changed; later results still belong to the previous keyword"
                        );
                        let keyword = match self.stores.stale.take() {
                            Some(stale) => stale.keyword,
                            None => previous.original_keyword.clone(),
                        };
                        self.stores.stale = Some(StaleResults { keyword, stages });
                    }
                }
                self.stores.research = Some(result);
            }
            StageOutput::Clusters(set) => {
                self.stores.refreshed(Stage::Clustering);
                self.stores.clusters = Some(set);
            }
            StageOutput::Titles(set) => {
                if let Some(chosen) = &self.stores.chosen_title
                    && set.get(chosen).is_none()
                {
                    self.stores.chosen_title = None;
                }
                self.stores.refreshed(Stage::TitleDescription);
                self.stores.titles = Some(set);
            }
            StageOutput::Outlines(options) => {
                if let Some(selected) = &self.stores.selected_outline
                    && selected != CUSTOM_OUTLINE_ID
                    && !options.iter().any(|o| &o.id == selected)
                {
                    self.stores.selected_outline = None;
                }
                self.stores.refreshed(Stage::Outline);
                self.stores.outlines = options;
            }
            StageOutput::Article(article) => {
                self.stores.refreshed(Stage::Article);
                self.stores.article = Some(article);
            }
        }
    }

    /// Step back one step. Stores are kept.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` at the first step.
    pub fn go_back(&mut self) -> Result<StepId, WorkflowError> {
        let previous = self.session.current_step.previous().ok_or_else(|| {
            WorkflowError::UserInput("Already at the first step".to_string())
        })?;
        self.session.current_step = previous;
        Ok(previous)
    }

    /// Jump to any step reached earlier in this run.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` for a step beyond the highest one reached.
    pub fn go_to(&mut self, step: StepId) -> Result<(), WorkflowError> {
        if step > self.session.highest_step {
            return Err(WorkflowError::UserInput(format!(
                "Step {step} has not been reached yet (furthest: {})",
                self.session.highest_step
            )));
        }
        self.session.current_step = step;
        Ok(())
    }

    /// Start a new run: fresh workflow id, empty stores, first step.
    /// The session id is preserved.
    pub fn reset(&mut self) {
        let session_id = std::mem::take(&mut self.session.session_id);
        self.session = WorkflowSession::new(session_id);
        self.stores = StageStores::default();
        self.last_error = None;
    }

    #[must_use]
    pub fn payload_ids(&self, user_id: &str) -> PayloadIds {
        PayloadIds {
            workflow_id: self.session.workflow_id.clone(),
            user_id: user_id.to_string(),
            session_id: self.session.session_id.clone(),
        }
    }

    /// Seed keyword of this run, once research has completed.
    #[must_use]
    pub fn original_keyword(&self) -> Option<&str> {
        self.stores
            .research
            .as_ref()
            .map(|r| r.original_keyword.as_str())
    }

    #[must_use]
    pub fn research(&self) -> Option<&KeywordResearchResult> {
        self.stores.research.as_ref()
    }

    #[must_use]
    pub fn clusters(&self) -> Option<&ClusterSet> {
        self.stores.clusters.as_ref()
    }

    /// In-place status/priority edits on cluster items.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` before clustering has run.
    pub fn clusters_mut(&mut self) -> Result<&mut ClusterSet, WorkflowError> {
        self.stores
            .clusters
            .as_mut()
            .ok_or_else(|| WorkflowError::UserInput("Run clustering first".to_string()))
    }

    #[must_use]
    pub fn titles(&self) -> Option<&TitleSet> {
        self.stores.titles.as_ref()
    }

    /// In-place title/description edits.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` before titles have been generated.
    pub fn titles_mut(&mut self) -> Result<&mut TitleSet, WorkflowError> {
        self.stores
            .titles
            .as_mut()
            .ok_or_else(|| WorkflowError::UserInput("Generate titles first".to_string()))
    }

    /// Pick the title carried into the outline stage.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` for an unknown or rejected title.
    pub fn choose_title(&mut self, keyword: &str) -> Result<&TitleDescriptionItem, WorkflowError> {
        let chosen = self.titles_mut()?.choose(keyword)?.keyword.clone();
        self.stores.chosen_title = Some(chosen);
        self.chosen_title()
            .ok_or_else(|| WorkflowError::UserInput(format!("No title was generated for '{keyword}'")))
    }

    #[must_use]
    pub fn chosen_title(&self) -> Option<&TitleDescriptionItem> {
        let keyword = self.stores.chosen_title.as_deref()?;
        self.titles()?.get(keyword)
    }

    #[must_use]
    pub fn outlines(&self) -> &[OutlineOption] {
        &self.stores.outlines
    }

    /// Select a generated outline, or the custom one by its reserved id.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` if no outline has that id.
    pub fn select_outline(&mut self, id: &str) -> Result<(), WorkflowError> {
        let exists = if id == CUSTOM_OUTLINE_ID {
            self.stores.custom_outline.is_some()
        } else {
            self.stores.outlines.iter().any(|o| o.id == id)
        };
        if !exists {
            return Err(WorkflowError::UserInput(format!("No outline with id '{id}'")));
        }
        self.stores.selected_outline = Some(id.to_string());
        Ok(())
    }

    /// Store user-authored outline content and select it.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` for blank content.
    pub fn set_custom_outline(&mut self, content: impl Into<String>) -> Result<(), WorkflowError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(WorkflowError::UserInput(
                "Custom outline cannot be empty".to_string(),
            ));
        }
        match &mut self.stores.custom_outline {
            Some(custom) => custom.set_content(content),
            None => self.stores.custom_outline = Some(OutlineOption::custom(content)),
        }
        self.stores.selected_outline = Some(CUSTOM_OUTLINE_ID.to_string());
        Ok(())
    }

    #[must_use]
    pub fn selected_outline(&self) -> Option<&OutlineOption> {
        let id = self.stores.selected_outline.as_deref()?;
        if id == CUSTOM_OUTLINE_ID {
            self.stores.custom_outline.as_ref()
        } else {
            self.stores.outlines.iter().find(|o| o.id == id)
        }
    }

    #[must_use]
    pub fn customization(&self) -> &ArticleOutlineCustomization {
        &self.stores.customization
    }

    pub fn customization_mut(&mut self) -> &mut ArticleOutlineCustomization {
        &mut self.stores.customization
    }

    /// Later results that still belong to an earlier research keyword.
    #[must_use]
    pub fn stale_results(&self) -> Option<&StaleResults> {
        self.stores.stale.as_ref()
    }

    #[must_use]
    pub fn article(&self) -> Option<&GeneratedArticle> {
        self.stores.article.as_ref()
    }

    /// Local edits to the generated article.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` before an article has been generated.
    pub fn article_mut(&mut self) -> Result<&mut GeneratedArticle, WorkflowError> {
        self.stores
            .article
            .as_mut()
            .ok_or_else(|| WorkflowError::UserInput("Generate an article first".to_string()))
    }
}
