//! Common helpers used across CLI commands
//!
//! Loading and saving the workflow, building the stage runner, and driving a
//! stage call with progress output and Ctrl-C cancellation.

use std::future::Future;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use contentflow_engine::model::ArticleOutlineCustomization;
use contentflow_engine::profile::FileProfileStore;
use contentflow_engine::{
    AuthSession, StageReport, StageRunner, WorkflowContext, WorkflowHandle, lock_workflow, snapshot,
};
use contentflow_http::WebhookBackend;
use contentflow_utils::error::{ContentFlowError, WorkflowError};
use contentflow_utils::types::Stage;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::Config;
use crate::cli::args::{ArticleOptions, Cli};

/// File holding saved research profiles, next to the workflow state.
const PROFILES_FILE: &str = "profiles.json";

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct CommandEnv {
    pub config: Config,
    pub state_path: Utf8PathBuf,
    pub auth: AuthSession,
}

impl CommandEnv {
    pub fn new(config: Config, cli: &Cli) -> Self {
        Self {
            config,
            state_path: cli.state.clone(),
            auth: AuthSession {
                session_id: cli.session_id.clone(),
                ..AuthSession::new(cli.user_id.clone())
            },
        }
    }

    pub fn user_id(&self) -> &str {
        &self.auth.user_id
    }

    /// The saved workflow, or a new one when nothing is saved yet.
    pub fn load_context(&self) -> Result<WorkflowContext> {
        Ok(snapshot::load_or_new(&self.state_path, || {
            self.auth.tracing_session_id()
        })?)
    }

    pub fn save_context(&self, context: &WorkflowContext) -> Result<()> {
        snapshot::save(&self.state_path, context)?;
        Ok(())
    }

    pub fn profile_store(&self) -> FileProfileStore {
        FileProfileStore::new(profiles_path(&self.state_path))
    }

    /// Stage runner over the configured webhooks.
    pub fn runner(&self) -> Result<StageRunner> {
        let backend = WebhookBackend::from_config(&self.config).map_err(ContentFlowError::from)?;
        Ok(StageRunner::from_config(
            Arc::new(backend),
            &self.config,
            self.user_id(),
        ))
    }

    /// Save the workflow after a stage call and surface the call's result.
    ///
    /// The state is saved on failure too, so `last_error` survives. When both
    /// the call and the save fail the call's error wins.
    pub fn settle(
        &self,
        handle: &WorkflowHandle,
        result: Result<StageReport, WorkflowError>,
    ) -> Result<StageReport> {
        let saved = {
            let ctx = lock_workflow(handle);
            self.save_context(&ctx)
        };
        if let Err(save_err) = &saved
            && result.is_err()
        {
            warn!(error = %format!("{save_err:#}"), "Workflow state not saved");
        }
        let report = result.map_err(ContentFlowError::from)?;
        saved?;
        print_report(&report);
        Ok(report)
    }
}

fn profiles_path(state_path: &Utf8Path) -> Utf8PathBuf {
    state_path.with_file_name(PROFILES_FILE)
}

/// Await a stage call, showing its progress on a terminal and cancelling it
/// on Ctrl-C.
pub async fn drive<F>(runner: &StageRunner, stage: Stage, call: F) -> Result<StageReport, WorkflowError>
where
    F: Future<Output = Result<StageReport, WorkflowError>>,
{
    tokio::pin!(call);
    let show_progress = std::io::stderr().is_terminal();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut interrupted = false;

    loop {
        tokio::select! {
            result = &mut call => {
                if show_progress {
                    eprintln!();
                }
                return result;
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                if cancel_on_signal(runner, stage, signal.is_ok()) {
                    interrupted = true;
                    eprintln!("\nCancelling {stage}...");
                }
            }
            _ = ticker.tick(), if show_progress => {
                if let Some(progress) = runner.subscribe_progress(stage) {
                    let value = *progress.borrow();
                    eprint!("\r{stage}: {value:>3}%");
                    let _ = std::io::stderr().flush();
                }
            }
        }
    }
}

/// Cancel the stage's call for a received Ctrl-C. Returns whether a call was
/// cancelled; until one is, later signals keep being handled.
pub(crate) fn cancel_on_signal(runner: &StageRunner, stage: Stage, received: bool) -> bool {
    received && runner.cancel(stage)
}

fn print_report(report: &StageReport) {
    println!(
        "✓ {} finished in {:.1}s ({} attempt{}), now at step {}",
        report.stage,
        report.elapsed.as_secs_f64(),
        report.attempts,
        if report.attempts == 1 { "" } else { "s" },
        report.step
    );
    if let Some(id) = &report.execution_id {
        println!("  execution: {id}");
    }
    for warning in &report.warnings {
        println!("  ⚠ {warning}");
    }
}

/// Overlay the options given on the command line onto the saved
/// customization. Options left out keep their saved value.
pub fn apply_customization(target: &mut ArticleOutlineCustomization, options: &ArticleOptions) {
    let text = |value: &Option<String>, slot: &mut Option<String>| {
        if let Some(value) = value {
            *slot = Some(value.clone());
        }
    };
    text(&options.headings, &mut target.headings_count);
    text(&options.point_of_view, &mut target.article_point_of_view);
    text(&options.word_count, &mut target.word_count);
    text(&options.tone, &mut target.tone_of_voice);
    text(&options.audience, &mut target.target_audience);
    text(&options.instructions, &mut target.additional_instructions);

    let counted = |count: Option<u32>, include: &mut bool, slot: &mut Option<u32>| {
        if let Some(count) = count {
            *include = count > 0;
            *slot = Some(count);
        }
    };
    counted(options.faq, &mut target.include_faq, &mut target.faq_count);
    counted(options.images, &mut target.include_images, &mut target.image_count);
    counted(
        options.internal_links,
        &mut target.include_internal_links,
        &mut target.internal_link_count,
    );
    counted(
        options.external_links,
        &mut target.include_external_links,
        &mut target.external_link_count,
    );

    if let Some(cta) = &options.call_to_action {
        let cta = cta.trim();
        target.include_call_to_action = !cta.is_empty();
        target.call_to_action_text = (!cta.is_empty()).then(|| cta.to_string());
    }

    let flag = |value: Option<bool>, slot: &mut bool| {
        if let Some(value) = value {
            *slot = value;
        }
    };
    flag(options.table_of_contents, &mut target.include_table_of_contents);
    flag(options.key_takeaways, &mut target.include_key_takeaways);
    flag(options.introduction, &mut target.include_introduction);
    flag(options.conclusion, &mut target.include_conclusion);
    flag(options.statistics, &mut target.include_statistics);
}
