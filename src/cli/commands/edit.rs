//! Local edits to stage results: keyword selection, title choice and the
//! generated article

use std::path::{Path, PathBuf};

use anyhow::Result;
use contentflow_engine::model::{ItemStatus, TitleStatus};
use contentflow_utils::error::WorkflowError;

use super::common::CommandEnv;

/// Update a clustered keyword's status and/or priority.
pub fn execute_select_command(
    env: &CommandEnv,
    keyword: &str,
    status: Option<&str>,
    priority: Option<u32>,
) -> Result<()> {
    if status.is_none() && priority.is_none() {
        return Err(WorkflowError::UserInput("Pass --status, --priority or both".to_string()).into());
    }
    let status = status
        .map(|raw| {
            ItemStatus::parse_lenient(raw).ok_or_else(|| {
                WorkflowError::UserInput(format!(
                    "Unknown status '{raw}'; use select, reject or keep"
                ))
            })
        })
        .transpose()?;

    let mut ctx = env.load_context()?;
    let clusters = ctx.clusters_mut()?;
    if let Some(status) = status {
        clusters.set_status(keyword, status)?;
    }
    if let Some(priority) = priority {
        clusters.set_priority(keyword, Some(priority))?;
    }
    if let Some(item) = clusters.find(keyword) {
        match item.priority {
            Some(p) => println!("{}: {} (priority {p})", item.keyword, item.status),
            None => println!("{}: {}", item.keyword, item.status),
        }
    }

    env.save_context(&ctx)
}

/// Edit a generated title, then either choose or reject it.
pub fn execute_choose_title_command(
    env: &CommandEnv,
    keyword: &str,
    title: Option<String>,
    description: Option<String>,
    reject: bool,
) -> Result<()> {
    let mut ctx = env.load_context()?;

    let titles = ctx.titles_mut()?;
    if title.is_some() || description.is_some() {
        titles.update_title(keyword, title, description)?;
    }

    if reject {
        titles.set_status(keyword, TitleStatus::Rejected)?;
        println!("Rejected the title for '{keyword}'");
    } else {
        let chosen = ctx.choose_title(keyword)?;
        println!("Chose \"{}\" for '{}'", chosen.title, chosen.keyword);
    }

    env.save_context(&ctx)
}

/// Replacement values for `edit-article`. Unset fields are left alone.
#[derive(Debug, Default, Clone)]
pub struct ArticleEdits {
    pub title: Option<String>,
    pub content: Option<PathBuf>,
    pub humanized: Option<PathBuf>,
    pub clear_humanized: bool,
    pub meta_description: Option<String>,
}

impl ArticleEdits {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.humanized.is_none()
            && !self.clear_humanized
            && self.meta_description.is_none()
    }
}

fn read_text(path: &Path, what: &str) -> Result<String, WorkflowError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| WorkflowError::UserInput(format!("Cannot read {what} {}: {e}", path.display())))?;
    if text.trim().is_empty() {
        return Err(WorkflowError::UserInput(format!(
            "{what} {} is empty",
            path.display()
        )));
    }
    Ok(text)
}

/// Apply local edits to the generated article.
pub fn execute_edit_article_command(env: &CommandEnv, edits: &ArticleEdits) -> Result<()> {
    if edits.is_empty() {
        return Err(WorkflowError::UserInput(
            "Pass --title, --content, --humanized, --clear-humanized or --meta-description".to_string(),
        )
        .into());
    }
    let content = edits
        .content
        .as_deref()
        .map(|path| read_text(path, "article content"))
        .transpose()?;
    let humanized = edits
        .humanized
        .as_deref()
        .map(|path| read_text(path, "humanized content"))
        .transpose()?;

    let mut ctx = env.load_context()?;
    let article = ctx.article_mut()?;
    if let Some(title) = &edits.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(WorkflowError::UserInput("The article title cannot be blank".to_string()).into());
        }
        article.edit_title(title);
    }
    if let Some(content) = content {
        article.edit_content(content);
    }
    if humanized.is_some() || edits.clear_humanized {
        article.edit_humanized(humanized);
    }
    if let Some(meta) = &edits.meta_description {
        let meta = meta.trim();
        article.edit_meta_description((!meta.is_empty()).then(|| meta.to_string()));
    }
    println!("Updated \"{}\"", article.title);

    env.save_context(&ctx)
}
