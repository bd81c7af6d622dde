use std::collections::HashMap;
use std::time::Duration;

use contentflow_utils::error::ContentFlowError;
use contentflow_utils::types::Stage;

use super::{Config, ConfigSource, Defaults, EndpointsConfig, ProfileDefaults};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding the workflow engine without config files.
    ///
    /// # Example
    ///
    /// ```rust
    /// use contentflow_config::Config;
    /// use contentflow_utils::types::Stage;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .timeout(Duration::from_secs(90))
    ///     .max_retries(1)
    ///     .endpoint(Stage::Clustering, "https://hooks.example.com/webhook/clustering")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.max_retries(), 1);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    timeout: Option<Duration>,
    max_timeout: Option<Duration>,
    max_retries: Option<u32>,
    verbose: Option<bool>,
    endpoints: EndpointsConfig,
    profile: ProfileDefaults,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn max_timeout(mut self, max_timeout: Duration) -> Self {
        self.max_timeout = Some(max_timeout);
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set the webhook endpoint for one stage.
    #[must_use]
    pub fn endpoint(mut self, stage: Stage, url: impl Into<String>) -> Self {
        *self.endpoints.slot_mut(stage) = Some(url.into());
        self
    }

    /// Set fallback research defaults.
    #[must_use]
    pub fn profile(mut self, profile: ProfileDefaults) -> Self {
        self.profile = profile;
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ContentFlowError::Config` if a value is out of range.
    pub fn build(self) -> Result<Config, ContentFlowError> {
        let mut source_attribution = HashMap::new();
        let mut defaults = Defaults::default();

        let mut set = |key: &str, present: bool| {
            let source = if present {
                ConfigSource::Programmatic
            } else {
                ConfigSource::Default
            };
            source_attribution.insert(key.to_string(), source);
        };

        set("timeout_ms", self.timeout.is_some());
        set("max_timeout_ms", self.max_timeout.is_some());
        set("max_retries", self.max_retries.is_some());
        set("verbose", self.verbose.is_some());

        if let Some(timeout) = self.timeout {
            defaults.timeout_ms = Some(timeout.as_millis() as u64);
        }
        if let Some(max_timeout) = self.max_timeout {
            defaults.max_timeout_ms = Some(max_timeout.as_millis() as u64);
        } else if let Some(timeout) = self.timeout {
            // Keep the ceiling meaningful when only the base timeout was raised.
            let base = timeout.as_millis() as u64;
            defaults.max_timeout_ms = defaults.max_timeout_ms.map(|max| max.max(base));
        }
        if let Some(max_retries) = self.max_retries {
            defaults.max_retries = Some(max_retries);
        }
        if let Some(verbose) = self.verbose {
            defaults.verbose = Some(verbose);
        }

        for stage in <Stage as strum::IntoEnumIterator>::iter() {
            if self.endpoints.for_stage(stage).is_some() {
                source_attribution.insert(format!("endpoints.{stage}"), ConfigSource::Programmatic);
            }
        }

        let config = Config {
            defaults,
            endpoints: self.endpoints,
            profile: self.profile,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }
}
