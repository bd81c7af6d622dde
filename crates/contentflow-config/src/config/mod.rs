//! Configuration management for contentflow
//!
//! This module provides hierarchical configuration with discovery and precedence:
//! CLI > file > defaults.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use contentflow_utils::types::ConfigSource;
