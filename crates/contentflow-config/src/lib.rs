//! Configuration for contentflow
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. Configuration files are TOML with `[defaults]`,
//! `[endpoints]` and `[profile]` sections.

mod config;

pub use config::*;
