use std::path::PathBuf;

/// CLI overrides fed into configuration discovery.
///
/// Every field is optional; `None` means "not given on the command line" and
/// leaves the config-file or default value in place.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file path (skips discovery)
    pub config_path: Option<PathBuf>,
    /// Per-stage timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Retries after the first attempt
    pub max_retries: Option<u32>,
    /// Verbose logging
    pub verbose: Option<bool>,
    /// Endpoint overrides in `stage=url` form
    pub endpoints: Vec<String>,
}
