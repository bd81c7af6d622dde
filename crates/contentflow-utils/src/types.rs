//! Identifiers shared across the contentflow crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator, VariantNames};

/// A step of the content pipeline as seen by the user.
///
/// Steps are ordered; the derived `Ord` follows pipeline order so
/// `StepId::Keyword < StepId::Generated`.
///
/// # Serialization
///
/// `StepId` serializes to the camelCase step name (e.g. `"selectKeywords"`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    VariantNames,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum StepId {
    /// Seed keyword entry and keyword research.
    #[default]
    Keyword,
    /// Picking keywords out of the research and clustering results.
    SelectKeywords,
    /// Reviewing generated blog titles and descriptions.
    TitleDescription,
    /// Choosing an outline and configuring article customization.
    Outline,
    /// The generated article, editable in place.
    Generated,
}

impl StepId {
    /// Canonical name used in snapshots, logs and CLI arguments.
    ///
    /// ```rust
    /// use contentflow_utils::types::StepId;
    ///
    /// assert_eq!(StepId::Keyword.as_str(), "keyword");
    /// assert_eq!(StepId::SelectKeywords.as_str(), "selectKeywords");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::SelectKeywords => "selectKeywords",
            Self::TitleDescription => "titleDescription",
            Self::Outline => "outline",
            Self::Generated => "generated",
        }
    }

    /// Zero-based position in the pipeline.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Keyword => 0,
            Self::SelectKeywords => 1,
            Self::TitleDescription => 2,
            Self::Outline => 3,
            Self::Generated => 4,
        }
    }

    /// The step after this one, or `None` for the terminal step.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        Self::iter().nth(self.index() + 1)
    }

    /// The step before this one, or `None` for the first step.
    #[must_use]
    pub fn previous(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(|i| Self::iter().nth(i))
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace(['-', '_'], "").to_ascii_lowercase();
        Self::iter()
            .find(|step| step.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown step '{s}'; expected one of: {}",
                    Self::VARIANTS.join(", ")
                )
            })
    }
}

/// A remote generation stage, one webhook per stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Search metrics and references for a seed keyword.
    KeywordResearch,
    /// Grouping selected keywords into intent clusters.
    Clustering,
    /// Blog titles and descriptions for selected cluster items.
    TitleDescription,
    /// Outline candidates for the chosen title.
    Outline,
    /// Final article generation from outline + customization.
    Article,
}

impl Stage {
    /// Canonical snake_case stage name, also the config key under `[endpoints]`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeywordResearch => "keyword_research",
            Self::Clustering => "clustering",
            Self::TitleDescription => "title_description",
            Self::Outline => "outline",
            Self::Article => "article",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        Self::iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown stage '{s}'; expected one of: {}",
                    Self::VARIANTS.join(", ")
                )
            })
    }
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically.
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Config => write!(f, "config"),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Default => write!(f, "default"),
        }
    }
}
