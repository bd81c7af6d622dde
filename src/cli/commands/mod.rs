//! CLI command implementations (facade).
//!
//! This module re-exports the command surface used by `run.rs` and CLI tests.
//! Implementations live in `commands/*`.

mod common;
mod edit;
mod navigate;
mod profile;
mod stages;
mod status;

// Re-export command handlers
pub use edit::{
    ArticleEdits, execute_choose_title_command, execute_edit_article_command, execute_select_command,
};
pub use navigate::{execute_back_command, execute_goto_command, execute_reset_command};
pub use profile::{execute_profile_set_command, execute_profile_show_command};
pub use stages::{
    execute_article_command, execute_cluster_command, execute_outlines_command,
    execute_research_command, execute_titles_command,
};
pub use status::execute_status_command;

// Re-export common helpers
pub use common::{CommandEnv, apply_customization};
pub(crate) use common::cancel_on_signal;
