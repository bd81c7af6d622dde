use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use contentflow_utils::error::{ConfigError, ContentFlowError};
use contentflow_utils::types::Stage;
use strum::IntoEnumIterator;

use super::{CliArgs, Config, ConfigSource, Defaults, EndpointsConfig, ProfileDefaults};

/// Directory searched for during discovery
const CONFIG_DIR: &str = ".contentflow";

/// File name inside [`CONFIG_DIR`]
const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    endpoints: Option<EndpointsConfig>,
    profile: Option<ProfileDefaults>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no explicit
    /// path is provided in `cli_args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if the
    /// effective configuration fails validation.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid process-global state.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut endpoints = EndpointsConfig::default();
        let mut profile = ProfileDefaults::default();

        for key in ["timeout_ms", "max_timeout_ms", "max_retries", "verbose"] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ContentFlowError::Config(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    })
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;

            let source = ConfigSource::Config;

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.timeout_ms.is_some() {
                    defaults.timeout_ms = file_defaults.timeout_ms;
                    source_attribution.insert("timeout_ms".to_string(), source.clone());
                }
                if file_defaults.max_timeout_ms.is_some() {
                    defaults.max_timeout_ms = file_defaults.max_timeout_ms;
                    source_attribution.insert("max_timeout_ms".to_string(), source.clone());
                }
                if file_defaults.max_retries.is_some() {
                    defaults.max_retries = file_defaults.max_retries;
                    source_attribution.insert("max_retries".to_string(), source.clone());
                }
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), source.clone());
                }
            }

            if let Some(file_endpoints) = file_config.endpoints {
                for stage in Stage::iter() {
                    if let Some(url) = file_endpoints.for_stage(stage) {
                        *endpoints.slot_mut(stage) = Some(url.to_string());
                        source_attribution
                            .insert(format!("endpoints.{stage}"), source.clone());
                    }
                }
            }

            if let Some(file_profile) = file_config.profile {
                profile = file_profile;
                source_attribution.insert("profile".to_string(), source.clone());
            }
        }

        // CLI overrides
        if let Some(timeout_ms) = cli_args.timeout_ms {
            defaults.timeout_ms = Some(timeout_ms);
            source_attribution.insert("timeout_ms".to_string(), ConfigSource::Cli);
        }
        if let Some(max_retries) = cli_args.max_retries {
            defaults.max_retries = Some(max_retries);
            source_attribution.insert("max_retries".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }
        for raw in &cli_args.endpoints {
            let (stage, url) = parse_endpoint_override(raw).map_err(ContentFlowError::Config)?;
            *endpoints.slot_mut(stage) = Some(url);
            source_attribution.insert(format!("endpoints.{stage}"), ConfigSource::Cli);
        }

        let config = Config {
            defaults,
            endpoints,
            profile,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Search upward from `start_dir` for `.contentflow/config.toml`.
    ///
    /// The search stops at the filesystem root or at a repository root
    /// (`.git`, `.hg`, `.svn`) when nothing was found there.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                return None;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    /// Load configuration from a TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).map_err(|e| {
            ContentFlowError::Config(ConfigError::InvalidFile(format!(
                "{}: {}",
                path.display(),
                e.message()
            )))
            .into()
        })
    }
}

/// Parse a `stage=url` CLI override.
fn parse_endpoint_override(raw: &str) -> Result<(Stage, String), ConfigError> {
    let (name, url) = raw.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
        key: "endpoint".to_string(),
        value: format!("'{raw}' is not in stage=url form"),
    })?;
    let stage = name.parse::<Stage>().map_err(|reason| ConfigError::InvalidValue {
        key: "endpoint".to_string(),
        value: reason,
    })?;
    Ok((stage, url.trim().to_string()))
}
