//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;

use super::args::{Cli, Commands, ProfileCommands};
use super::commands::{self, CommandEnv};

use crate::{CliArgs, Config, ContentFlowError, ExitCode, WorkflowError};
use contentflow_utils::logging::init_tracing;
use contentflow_utils::redaction::redact_error_message;

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success: returns `Ok(())` after printing any output
/// - On error: prints the error with context and suggestions, returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        timeout_ms: cli.timeout_ms,
        max_retries: cli.max_retries,
        verbose: cli.verbose.then_some(true),
        endpoints: cli.endpoints.clone(),
    };

    // Discover and load configuration
    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report_error(&err, ExitCode::CLI_ARGS)),
    };

    // A subscriber may already be installed when embedded; keep going without ours
    if let Err(e) = init_tracing(config.verbose()) {
        eprintln!("warning: logging not initialized: {e}");
    }

    // Create tokio runtime for async operations
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let env = CommandEnv::new(config, &cli);

    let result = rt.block_on(async {
        match cli.command {
            Commands::Research {
                keyword,
                country,
                language,
                content_type,
                depth,
                limit,
            } => {
                let input = contentflow_engine::ResearchInput {
                    keyword,
                    country,
                    language,
                    content_type,
                    depth,
                    limit,
                };
                commands::execute_research_command(&env, input).await
            }
            Commands::Cluster { keywords } => commands::execute_cluster_command(&env, keywords).await,
            Commands::Select {
                keyword,
                status,
                priority,
            } => commands::execute_select_command(&env, &keyword, status.as_deref(), priority),
            Commands::Titles => commands::execute_titles_command(&env).await,
            Commands::ChooseTitle {
                keyword,
                title,
                description,
                reject,
            } => commands::execute_choose_title_command(&env, &keyword, title, description, reject),
            Commands::Outlines => commands::execute_outlines_command(&env).await,
            Commands::Article(options) => commands::execute_article_command(&env, options).await,
            Commands::EditArticle {
                title,
                content,
                humanized,
                clear_humanized,
                meta_description,
            } => commands::execute_edit_article_command(
                &env,
                &commands::ArticleEdits {
                    title,
                    content,
                    humanized,
                    clear_humanized,
                    meta_description,
                },
            ),
            Commands::Status { json } => commands::execute_status_command(&env, json),
            Commands::Back => commands::execute_back_command(&env),
            Commands::Goto { step } => commands::execute_goto_command(&env, step),
            Commands::Reset => commands::execute_reset_command(&env),
            Commands::Profile(ProfileCommands::Show) => commands::execute_profile_show_command(&env),
            Commands::Profile(ProfileCommands::Set {
                language,
                country,
                depth,
                limit,
            }) => commands::execute_profile_set_command(&env, language, country, depth, limit),
        }
    });

    match result {
        Ok(()) => Ok(()),
        Err(error) => Err(report_error(&error, ExitCode::INTERNAL)),
    }
}

/// Print a failure and pick the exit code for it. Typed errors anywhere in
/// the chain decide the code; anything else gets `fallback`.
fn report_error(error: &anyhow::Error, fallback: ExitCode) -> ExitCode {
    if let Some(err) = error.chain().find_map(|e| e.downcast_ref::<ContentFlowError>()) {
        eprintln!("{}", err.display_for_user());
        return err.to_exit_code();
    }
    if let Some(err) = error.chain().find_map(|e| e.downcast_ref::<WorkflowError>()) {
        let err = ContentFlowError::Workflow(err.clone());
        eprintln!("{}", err.display_for_user());
        return err.to_exit_code();
    }

    eprintln!("✗ Unexpected error: {}", redact_error_message(&format!("{error:#}")));
    eprintln!("\n  General troubleshooting:");
    eprintln!("    - Run with --verbose for more detailed output");
    eprintln!("    - Run `contentflow status` to see the saved workflow");
    fallback
}
