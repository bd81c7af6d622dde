//! Commands that call a remote stage

use anyhow::Result;
use contentflow_engine::model::{ClusterSet, OutlineOption, TitleSet};
use contentflow_engine::profile::ProfileStore;
use contentflow_engine::{ResearchDefaults, ResearchInput, lock_workflow, workflow_handle};
use contentflow_utils::atomic_write::write_file_atomic;
use contentflow_utils::error::WorkflowError;
use contentflow_utils::types::Stage;

use super::common::{CommandEnv, apply_customization, drive};
use crate::cli::args::ArticleOptions;

// ============================================================================
// Keyword research
// ============================================================================

/// Research the seed keyword, filling unset options from the saved profile
/// and then the config.
pub async fn execute_research_command(env: &CommandEnv, input: ResearchInput) -> Result<()> {
    let profile = env.profile_store().get(env.user_id())?;
    let defaults = ResearchDefaults::resolve(profile.as_ref(), &env.config.profile);

    let handle = workflow_handle(env.load_context()?);
    let runner = env.runner()?;
    let result = drive(
        &runner,
        Stage::KeywordResearch,
        runner.research(&handle, &input, &defaults),
    )
    .await;
    env.settle(&handle, result)?;

    let ctx = lock_workflow(&handle);
    if let Some(research) = ctx.research() {
        println!(
            "\nKeywords for '{}' ({}, {}):",
            research.original_keyword, research.country, research.language
        );
        for metric in &research.historical_search_data {
            let Some(keyword) = metric.keyword.as_deref() else {
                continue;
            };
            match metric.search_volume {
                Some(volume) => println!("  {keyword:<40} {volume:>8}"),
                None => println!("  {keyword:<40} {:>8}", "-"),
            }
        }
    }
    Ok(())
}

// ============================================================================
// Clustering
// ============================================================================

pub async fn execute_cluster_command(env: &CommandEnv, keywords: Vec<String>) -> Result<()> {
    let keywords = (!keywords.is_empty()).then_some(keywords);

    let handle = workflow_handle(env.load_context()?);
    let runner = env.runner()?;
    let result = drive(&runner, Stage::Clustering, runner.cluster(&handle, keywords)).await;
    env.settle(&handle, result)?;

    if let Some(clusters) = lock_workflow(&handle).clusters() {
        print_clusters(clusters);
    }
    Ok(())
}

pub(crate) fn print_clusters(clusters: &ClusterSet) {
    for group in &clusters.groups {
        println!("\n{}", group.cluster_name);
        for item in &group.items {
            let priority = item
                .priority
                .map(|p| format!("#{p}"))
                .unwrap_or_default();
            println!("  {:<40} {:<26} {priority}", item.keyword, item.status);
        }
    }
}

// ============================================================================
// Titles
// ============================================================================

pub async fn execute_titles_command(env: &CommandEnv) -> Result<()> {
    let handle = workflow_handle(env.load_context()?);
    let runner = env.runner()?;
    let result = drive(&runner, Stage::TitleDescription, runner.generate_titles(&handle)).await;
    env.settle(&handle, result)?;

    if let Some(titles) = lock_workflow(&handle).titles() {
        print_titles(titles);
    }
    Ok(())
}

pub(crate) fn print_titles(titles: &TitleSet) {
    for item in &titles.items {
        println!("\n[{}] {} ({})", item.status, item.keyword, item.content_type);
        println!("  {}", item.title);
        if !item.description.is_empty() {
            println!("  {}", item.description);
        }
    }
}

// ============================================================================
// Outlines
// ============================================================================

pub async fn execute_outlines_command(env: &CommandEnv) -> Result<()> {
    let handle = workflow_handle(env.load_context()?);
    let runner = env.runner()?;
    let result = drive(&runner, Stage::Outline, runner.generate_outlines(&handle)).await;
    env.settle(&handle, result)?;

    for outline in lock_workflow(&handle).outlines() {
        print_outline(outline);
    }
    Ok(())
}

pub(crate) fn print_outline(outline: &OutlineOption) {
    println!("\nOutline {}", outline.id);
    for heading in &outline.parsed.headings {
        let indent = "  ".repeat(usize::from(heading.level));
        println!("{indent}{}", heading.title);
    }
}

// ============================================================================
// Article
// ============================================================================

/// Pick the outline, merge customization options, generate the article and
/// optionally write it to a file.
pub async fn execute_article_command(env: &CommandEnv, options: ArticleOptions) -> Result<()> {
    let mut ctx = env.load_context()?;

    if let Some(path) = &options.custom_outline {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::UserInput(format!(
                "Cannot read custom outline {}: {e}",
                path.display()
            ))
        })?;
        ctx.set_custom_outline(content)?;
    } else if let Some(id) = &options.outline {
        ctx.select_outline(id)?;
    }
    apply_customization(ctx.customization_mut(), &options);

    let handle = workflow_handle(ctx);
    let runner = env.runner()?;
    let result = drive(&runner, Stage::Article, runner.generate_article(&handle)).await;
    env.settle(&handle, result)?;

    let ctx = lock_workflow(&handle);
    let article = ctx.article().ok_or_else(|| {
        WorkflowError::UserInput("The article stage returned no article".to_string())
    })?;

    println!("\n{}", article.title);
    if let Some(meta) = &article.meta_description {
        println!("  {meta}");
    }
    match &options.output {
        Some(path) => {
            write_file_atomic(path, article.preferred_content())?;
            println!("\nArticle written to {path}");
        }
        None => println!("\n{}", article.preferred_content()),
    }
    Ok(())
}
