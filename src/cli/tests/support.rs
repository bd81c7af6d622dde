//! Shared fixtures for CLI tests

use camino::Utf8PathBuf;
use clap::Parser;
use contentflow_engine::model::{
    ClusterGroup, ClusterItem, ClusterSet, GeneratedArticle, KeywordResearchResult, OutlineOption,
    SearchMetric, TitleDescriptionItem, TitleSet,
};
use contentflow_engine::{StageOutput, WorkflowContext};
use tempfile::TempDir;

use crate::Config;
use crate::cli::args::Cli;
use crate::cli::commands::CommandEnv;

pub struct TestEnv {
    pub env: CommandEnv,
    pub _dir: TempDir,
}

impl TestEnv {
    pub fn state_path(&self) -> &Utf8PathBuf {
        &self.env.state_path
    }
}

/// Command environment whose state lives in a fresh temp dir.
pub fn test_env(config: Config) -> TestEnv {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state.json");
    let cli = Cli::try_parse_from([
        "contentflow",
        "--state",
        state.to_str().unwrap(),
        "--user-id",
        "tester",
        "--session-id",
        "sess-cli",
        "status",
    ])
    .unwrap();
    TestEnv {
        env: CommandEnv::new(config, &cli),
        _dir: dir,
    }
}

pub fn default_env() -> TestEnv {
    test_env(Config::builder().build().unwrap())
}

fn item(keyword: &str, volume: u64) -> ClusterItem {
    ClusterItem {
        monthly_search_volume: Some(volume),
        ..ClusterItem::new(keyword)
    }
}

/// A workflow that has been researched and clustered.
pub fn clustered_context() -> WorkflowContext {
    let mut ctx = WorkflowContext::new("sess-cli");
    ctx.advance(StageOutput::Research(KeywordResearchResult {
        original_keyword: "sustainable gardening".into(),
        country: "US".into(),
        language: "en".into(),
        content_type: "blog".into(),
        historical_search_data: vec![
            SearchMetric {
                keyword: Some("compost bins".into()),
                search_volume: Some(1200),
                ..SearchMetric::default()
            },
            SearchMetric {
                keyword: Some("rain barrels".into()),
                search_volume: Some(880),
                ..SearchMetric::default()
            },
        ],
        ..KeywordResearchResult::default()
    }))
    .unwrap();
    ctx.record(StageOutput::Clusters(ClusterSet::new(vec![ClusterGroup {
        cluster_name: "Composting".into(),
        items: vec![item("compost bins", 1200), item("rain barrels", 880)],
        ..ClusterGroup::default()
    }])))
    .unwrap();
    ctx
}

/// A workflow that has reached the generated article.
pub fn generated_context() -> WorkflowContext {
    let mut ctx = clustered_context();
    ctx.advance(StageOutput::Titles(TitleSet::new(vec![TitleDescriptionItem {
        keyword: "compost bins".into(),
        primary_keyword: "compost bins".into(),
        title: "Compost Bins, Explained".into(),
        description: "Choosing a bin".into(),
        cluster_name: "Composting".into(),
        ..TitleDescriptionItem::default()
    }])))
    .unwrap();
    ctx.choose_title("compost bins").unwrap();
    ctx.advance(StageOutput::Outlines(vec![OutlineOption::new(
        "outline-1",
        "# Compost Bins\n## Picking one",
    )]))
    .unwrap();
    ctx.advance(StageOutput::Article(GeneratedArticle {
        title: "Compost Bins, Explained".into(),
        content: "<h1>Compost Bins</h1>".into(),
        humanized_content: Some("<h1>Compost bins, simply</h1>".into()),
        meta_description: Some("Choosing a bin".into()),
    }))
    .unwrap();
    ctx
}
