//! Command-line interface for contentflow
//!
//! Each invocation loads the saved workflow, runs one step of it and saves
//! it again, so a run can be continued across invocations.
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions and parsing structures (clap)
//! - `run`: Main entry point and command dispatch
//! - `commands`: Command implementations and helpers
//! - `tests`: Test module (cfg(test) only)

pub mod args;
mod commands;
mod run;

#[cfg(test)]
mod tests;

// Re-export argument types
pub use args::{ArticleOptions, Cli, Commands, ProfileCommands};

// Re-export run function
pub use run::run;
