//! Auth session and user profile collaborators
//!
//! The engine only needs a user id, a tracing session id and a handful of
//! research defaults per user; everything else about auth and profiles lives
//! outside this crate.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use camino::{Utf8Path, Utf8PathBuf};
use contentflow_config::ProfileDefaults;
use contentflow_utils::atomic_write::write_file_atomic;
use contentflow_utils::error::ContentFlowError;
use serde::{Deserialize, Serialize};

/// Characters of the access token reused as a tracing session id
const TOKEN_SESSION_PREFIX_LEN: usize = 16;

const FALLBACK_LANGUAGE: &str = "en";
const FALLBACK_COUNTRY: &str = "US";
const FALLBACK_CONTENT_TYPE: &str = "blog";

/// Signed-in user as seen by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: String,
    pub access_token: Option<String>,
    pub session_id: Option<String>,
}

impl AuthSession {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Session id for request tracing.
    ///
    /// Prefers a dedicated session id, then the first 16 characters of the
    /// access token, then a fresh random id.
    #[must_use]
    pub fn tracing_session_id(&self) -> String {
        if let Some(id) = self.session_id.as_deref().filter(|s| !s.trim().is_empty()) {
            return id.to_string();
        }
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            return token.chars().take(TOKEN_SESSION_PREFIX_LEN).collect();
        }
        uuid::Uuid::new_v4().to_string()
    }
}

/// Per-user research preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchProfile {
    pub language: Option<String>,
    pub country: Option<String>,
    pub research_depth: Option<u32>,
    pub research_limit: Option<u32>,
}

/// Key-value profile storage keyed by user id.
pub trait ProfileStore: Send + Sync {
    /// Profile for `user_id`, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, user_id: &str) -> Result<Option<ResearchProfile>, ContentFlowError>;

    /// Replace the profile for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, user_id: &str, profile: ResearchProfile) -> Result<(), ContentFlowError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, ResearchProfile>>,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<ResearchProfile>, ContentFlowError> {
        let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
        Ok(profiles.get(user_id).cloned())
    }

    fn set(&self, user_id: &str, profile: ResearchProfile) -> Result<(), ContentFlowError> {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        profiles.insert(user_id.to_string(), profile);
        Ok(())
    }
}

/// Profiles kept in a JSON file next to the workflow state.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: Utf8PathBuf,
}

impl FileProfileStore {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, ResearchProfile>, ContentFlowError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| ContentFlowError::Snapshot {
            path: self.path.to_string(),
            reason: format!("profile file is not valid JSON: {e}"),
        })
    }
}

impl ProfileStore for FileProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<ResearchProfile>, ContentFlowError> {
        Ok(self.read_all()?.remove(user_id))
    }

    fn set(&self, user_id: &str, profile: ResearchProfile) -> Result<(), ContentFlowError> {
        let mut all = self.read_all()?;
        all.insert(user_id.to_string(), profile);
        let json = serde_json::to_string_pretty(&all).map_err(|e| ContentFlowError::Snapshot {
            path: self.path.to_string(),
            reason: e.to_string(),
        })?;
        write_file_atomic(&self.path, &json).map_err(|e| ContentFlowError::Snapshot {
            path: self.path.to_string(),
            reason: format!("{e:#}"),
        })
    }
}

/// Research defaults after merging the user profile over configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchDefaults {
    pub language: String,
    pub country: String,
    pub content_type: String,
    pub depth: Option<u32>,
    pub limit: Option<u32>,
}

impl Default for ResearchDefaults {
    fn default() -> Self {
        Self::resolve(None, &ProfileDefaults::default())
    }
}

impl ResearchDefaults {
    /// Profile values win over configured values, which win over built-ins.
    #[must_use]
    pub fn resolve(profile: Option<&ResearchProfile>, config: &ProfileDefaults) -> Self {
        Self {
            language: pick(
                profile.and_then(|p| p.language.as_ref()),
                config.language.as_ref(),
                FALLBACK_LANGUAGE,
            ),
            country: pick(
                profile.and_then(|p| p.country.as_ref()),
                config.country.as_ref(),
                FALLBACK_COUNTRY,
            ),
            content_type: pick(None, config.content_type.as_ref(), FALLBACK_CONTENT_TYPE),
            depth: profile
                .and_then(|p| p.research_depth)
                .or(config.research_depth),
            limit: profile
                .and_then(|p| p.research_limit)
                .or(config.research_limit),
        }
    }
}

fn pick(from_profile: Option<&String>, from_config: Option<&String>, fallback: &str) -> String {
    let clean = |value: Option<&String>| {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    clean(from_profile)
        .or_else(|| clean(from_config))
        .unwrap_or_else(|| fallback.to_string())
}
