use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use contentflow_utils::error::WorkflowError;
use contentflow_utils::types::{ConfigSource, Stage};

/// Default per-stage request timeout (2 minutes)
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Default ceiling for heuristically widened timeouts (5 minutes)
pub const DEFAULT_MAX_TIMEOUT_MS: u64 = 300_000;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for contentflow operations.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > config file > built-in defaults.
///
/// # Discovery
///
/// Use [`Config::discover()`] for CLI-like behavior that searches for
/// `.contentflow/config.toml` upward from the current directory. Embedders that
/// need deterministic behavior can use [`Config::builder()`] instead.
///
/// # Configuration File Format
///
/// ```toml
/// [defaults]
/// timeout_ms = 120000
/// max_timeout_ms = 300000
/// max_retries = 2
///
/// [endpoints]
/// keyword_research = "https://hooks.example.com/webhook/keyword-research"
/// clustering = "https://hooks.example.com/webhook/clustering"
/// title_description = "https://hooks.example.com/webhook/titles"
/// outline = "https://hooks.example.com/webhook/outline"
/// article = "https://hooks.example.com/webhook/articleoutlinecustomization"
///
/// [profile]
/// language = "en"
/// country = "US"
/// research_depth = 2
/// research_limit = 50
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Request timing and retry settings.
    pub defaults: Defaults,
    /// One webhook endpoint per stage.
    pub endpoints: EndpointsConfig,
    /// Fallback research defaults used when the user profile has none.
    pub profile: ProfileDefaults,
    /// Source attribution for each setting (for status display).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// Request timing and retry defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    pub timeout_ms: Option<u64>,
    pub max_timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub verbose: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            max_timeout_ms: Some(DEFAULT_MAX_TIMEOUT_MS),
            max_retries: Some(DEFAULT_MAX_RETRIES),
            verbose: Some(false),
        }
    }
}

/// Webhook endpoints keyed by stage.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EndpointsConfig {
    pub keyword_research: Option<String>,
    pub clustering: Option<String>,
    pub title_description: Option<String>,
    pub outline: Option<String>,
    pub article: Option<String>,
}

impl EndpointsConfig {
    /// Endpoint configured for `stage`, if any.
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::KeywordResearch => self.keyword_research.as_deref(),
            Stage::Clustering => self.clustering.as_deref(),
            Stage::TitleDescription => self.title_description.as_deref(),
            Stage::Outline => self.outline.as_deref(),
            Stage::Article => self.article.as_deref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, stage: Stage) -> &mut Option<String> {
        match stage {
            Stage::KeywordResearch => &mut self.keyword_research,
            Stage::Clustering => &mut self.clustering,
            Stage::TitleDescription => &mut self.title_description,
            Stage::Outline => &mut self.outline,
            Stage::Article => &mut self.article,
        }
    }
}

/// Research defaults applied when neither the user nor their profile set a value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileDefaults {
    pub language: Option<String>,
    pub country: Option<String>,
    pub research_depth: Option<u32>,
    pub research_limit: Option<u32>,
    pub content_type: Option<String>,
}

impl Config {
    /// Base timeout for a stage request.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.defaults.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Upper bound for heuristically widened timeouts.
    #[must_use]
    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(
            self.defaults
                .max_timeout_ms
                .unwrap_or(DEFAULT_MAX_TIMEOUT_MS)
                .max(self.defaults.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        )
    }

    /// Retries allowed after the first attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.defaults.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    /// Endpoint for `stage`.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Misconfiguration` when the stage has no endpoint.
    pub fn endpoint(&self, stage: Stage) -> Result<&str, WorkflowError> {
        self.endpoints.for_stage(stage).ok_or_else(|| {
            WorkflowError::Misconfiguration(format!(
                "no endpoint configured for stage '{stage}' (set [endpoints] {stage} = \"https://...\")"
            ))
        })
    }

    /// Source of a configuration key, for status display.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }
}
