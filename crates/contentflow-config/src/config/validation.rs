use contentflow_utils::error::{ConfigError, ContentFlowError};
use contentflow_utils::types::Stage;
use strum::IntoEnumIterator;

use super::Config;

/// Smallest accepted stage timeout (1 second)
const MIN_TIMEOUT_MS: u64 = 1_000;

/// Largest accepted stage timeout (10 minutes)
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Upper bound on retries after the first attempt
const MAX_RETRIES_LIMIT: u32 = 5;

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ContentFlowError {
    ContentFlowError::Config(ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    })
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ContentFlowError> {
        if let Some(timeout_ms) = self.defaults.timeout_ms {
            if timeout_ms < MIN_TIMEOUT_MS {
                return Err(invalid("timeout_ms", "must be at least 1000 ms"));
            }
            if timeout_ms > MAX_TIMEOUT_MS {
                return Err(invalid(
                    "timeout_ms",
                    "exceeds maximum limit of 600000 ms (10 minutes)",
                ));
            }
        }

        if let (Some(timeout_ms), Some(max_timeout_ms)) =
            (self.defaults.timeout_ms, self.defaults.max_timeout_ms)
            && max_timeout_ms < timeout_ms
        {
            return Err(invalid(
                "max_timeout_ms",
                format!("must not be below timeout_ms ({timeout_ms})"),
            ));
        }

        if let Some(max_retries) = self.defaults.max_retries
            && max_retries > MAX_RETRIES_LIMIT
        {
            return Err(invalid("max_retries", "exceeds maximum limit of 5"));
        }

        for stage in Stage::iter() {
            if let Some(url) = self.endpoints.for_stage(stage)
                && !(url.starts_with("http://") || url.starts_with("https://"))
            {
                return Err(invalid(
                    format!("endpoints.{stage}"),
                    format!("'{url}' must start with http:// or https://"),
                ));
            }
        }

        if let Some(depth) = self.profile.research_depth
            && depth == 0
        {
            return Err(invalid("profile.research_depth", "must be greater than 0"));
        }
        if let Some(limit) = self.profile.research_limit
            && limit == 0
        {
            return Err(invalid("profile.research_limit", "must be greater than 0"));
        }

        Ok(())
    }
}
