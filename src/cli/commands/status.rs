//! Status command: where the saved workflow stands

use anyhow::{Context, Result};
use contentflow_engine::WorkflowContext;
use contentflow_utils::redaction::redact_error_message;
use contentflow_utils::types::{Stage, StepId};
use strum::IntoEnumIterator;

use super::common::CommandEnv;
use super::stages::{print_clusters, print_outline, print_titles};

pub fn execute_status_command(env: &CommandEnv, json: bool) -> Result<()> {
    let ctx = env.load_context()?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&ctx).context("Failed to serialize workflow state")?;
        println!("{rendered}");
        return Ok(());
    }

    print_summary(env, &ctx);
    print_step_detail(&ctx);
    Ok(())
}

fn print_summary(env: &CommandEnv, ctx: &WorkflowContext) {
    let session = ctx.session();
    println!("Workflow:  {}", session.workflow_id);
    println!("Session:   {}", session.session_id);
    println!("Started:   {}", session.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("State:     {}", env.state_path);

    print!("Steps:    ");
    for step in StepId::iter() {
        let marker = if step == ctx.current_step() {
            "▶"
        } else if step <= ctx.highest_step() {
            "✓"
        } else {
            "·"
        };
        print!(" {marker} {step}");
    }
    println!();

    if let Some(keyword) = ctx.original_keyword() {
        println!("Keyword:   {keyword}");
    }
    if let Some(stale) = ctx.stale_results() {
        let stages: Vec<&str> = stale.stages.iter().map(|s| s.as_str()).collect();
        println!(
            "⚠ Still from '{}': {} (run them again before generating the article)",
            stale.keyword,
            stages.join(", ")
        );
    }
    if let Some(error) = ctx.last_error() {
        println!("Last error: {error}");
    }

    println!("\nEndpoints:");
    for stage in Stage::iter() {
        let endpoint = env
            .config
            .endpoints
            .for_stage(stage)
            .map_or_else(|| "(not configured)".to_string(), redact_error_message);
        println!("  {:<18} {endpoint}", stage.as_str());
    }
}

fn print_step_detail(ctx: &WorkflowContext) {
    match ctx.current_step() {
        StepId::Keyword => {
            if ctx.research().is_none() {
                println!("\nNext: contentflow research <keyword>");
            }
        }
        StepId::SelectKeywords => match ctx.clusters() {
            Some(clusters) => {
                print_clusters(clusters);
                let selected = clusters.selected_items().len();
                println!("\n{selected} keyword(s) selected for blog creation");
                println!("Next: contentflow select <keyword> --status select, then contentflow titles");
            }
            None => {
                if let Some(research) = ctx.research() {
                    println!("\n{} researched keyword(s)", research.keywords().len());
                }
                println!("Next: contentflow cluster");
            }
        },
        StepId::TitleDescription => {
            if let Some(titles) = ctx.titles() {
                print_titles(titles);
            }
            match ctx.chosen_title() {
                Some(title) => println!("\nChosen: {}\nNext: contentflow outlines", title.title),
                None => println!("\nNext: contentflow choose-title <keyword>"),
            }
        }
        StepId::Outline => {
            for outline in ctx.outlines() {
                print_outline(outline);
            }
            match ctx.selected_outline() {
                Some(outline) => println!("\nSelected outline: {}", outline.id),
                None => println!("\nNo outline selected yet"),
            }
            println!("Next: contentflow article --outline <id>");
        }
        StepId::Generated => {
            if let Some(article) = ctx.article() {
                println!("\n{}", article.title);
                if let Some(meta) = &article.meta_description {
                    println!("  {meta}");
                }
                let words = article.preferred_content().split_whitespace().count();
                println!("  {words} words");
                println!("\nEdit: contentflow edit-article --title <title> --content <file>");
            }
        }
    }
}
