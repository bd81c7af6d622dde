//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use contentflow_utils::types::StepId;
use std::path::PathBuf;

/// Default location of the saved workflow.
pub const DEFAULT_STATE_PATH: &str = ".contentflow/state.json";

/// contentflow - keyword research to finished article over webhook stages
#[derive(Parser, Debug)]
#[command(name = "contentflow")]
#[command(about = "Drive a keyword-to-article content workflow over remote generation stages")]
#[command(long_about = r#"
contentflow walks one seed keyword through five remote stages: keyword
research, clustering, title generation, outlining and article generation.
The workflow is saved after every command so it can be resumed later.

EXAMPLES:
  # Research a seed keyword
  contentflow research "sustainable gardening" --country US --language en

  # Cluster every researched keyword (or name a subset)
  contentflow cluster
  contentflow cluster "compost bins" "rain barrels"

  # Pick keywords for blog creation and rank them
  contentflow select "compost bins" --status select --priority 1

  # Generate titles, then carry one forward
  contentflow titles
  contentflow choose-title "compost bins" --title "Compost Bins, Explained"

  # Generate outlines and the article
  contentflow outlines
  contentflow article --outline outline-1 --faq 5 --output article.html
  contentflow edit-article --meta-description "Pick the right compost bin"

  # Inspect or move around the workflow
  contentflow status
  contentflow back
  contentflow goto select-keywords
  contentflow reset

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .contentflow/config.toml
  Use --config to specify an explicit config file path

STEPS:
  keyword → selectKeywords → titleDescription → outline → generated
  A stage result is only stored when it belongs to the current step
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Where the workflow is saved between commands
    #[arg(long, global = true, default_value = DEFAULT_STATE_PATH)]
    pub state: Utf8PathBuf,

    /// User the stage requests are made for
    #[arg(long, global = true, default_value = "local")]
    pub user_id: String,

    /// Session id for tracing (a fresh one is generated when omitted)
    #[arg(long, global = true)]
    pub session_id: Option<String>,

    /// Per-stage timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Retries after the first attempt of a stage call
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Stage endpoint override, e.g. `clustering=https://hooks.example.com/cluster`
    #[arg(long = "endpoint", global = true, value_name = "STAGE=URL")]
    pub endpoints: Vec<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a seed keyword and move on to keyword selection
    Research {
        /// Seed keyword
        keyword: String,

        /// Target country (falls back to the saved profile, then config)
        #[arg(long)]
        country: Option<String>,

        /// Target language (falls back to the saved profile, then config)
        #[arg(long)]
        language: Option<String>,

        /// Content type sent with the request
        #[arg(long)]
        content_type: Option<String>,

        /// Research depth
        #[arg(long)]
        depth: Option<u32>,

        /// Maximum number of keywords to return
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Cluster researched keywords (all of them when none are given)
    Cluster {
        /// Keywords to cluster
        keywords: Vec<String>,
    },

    /// Change the status or priority of a clustered keyword
    Select {
        /// Clustered keyword to update
        keyword: String,

        /// New status: select, reject or keep
        #[arg(long)]
        status: Option<String>,

        /// Priority among selected keywords (0 clears it)
        #[arg(long)]
        priority: Option<u32>,
    },

    /// Generate titles and descriptions for the selected keywords
    Titles,

    /// Edit a generated title and carry it into the outline stage
    ChooseTitle {
        /// Keyword the title was generated for
        keyword: String,

        /// Replacement title
        #[arg(long)]
        title: Option<String>,

        /// Replacement description
        #[arg(long)]
        description: Option<String>,

        /// Reject the title instead of choosing it
        #[arg(long, conflicts_with = "title")]
        reject: bool,
    },

    /// Generate outline options for the chosen title
    Outlines,

    /// Generate the article from an outline and customization options
    Article(ArticleOptions),

    /// Edit the generated article locally
    EditArticle {
        /// Replacement title
        #[arg(long)]
        title: Option<String>,

        /// File holding replacement article content
        #[arg(long, value_name = "FILE")]
        content: Option<PathBuf>,

        /// File holding replacement humanized content
        #[arg(long, value_name = "FILE", conflicts_with = "clear_humanized")]
        humanized: Option<PathBuf>,

        /// Drop the humanized content so the raw article is used
        #[arg(long)]
        clear_humanized: bool,

        /// Replacement meta description (an empty text removes it)
        #[arg(long)]
        meta_description: Option<String>,
    },

    /// Show where the workflow stands
    Status {
        /// Print the saved workflow as JSON
        #[arg(long)]
        json: bool,
    },

    /// Go back one step
    Back,

    /// Jump to a step already reached
    Goto {
        /// Step name, e.g. `keyword`, `select-keywords`, `outline`
        step: StepId,
    },

    /// Discard all stage results and start a new workflow
    Reset,

    /// Saved research defaults for the current user
    #[command(subcommand)]
    Profile(ProfileCommands),
}

/// Outline choice and article customization.
#[derive(Args, Debug, Default, Clone)]
pub struct ArticleOptions {
    /// Id of the generated outline to use
    #[arg(long, conflicts_with = "custom_outline")]
    pub outline: Option<String>,

    /// Markdown file with a hand-written outline
    #[arg(long)]
    pub custom_outline: Option<PathBuf>,

    /// Number of headings, e.g. "4-5"
    #[arg(long)]
    pub headings: Option<String>,

    /// Point of view the article is written from
    #[arg(long)]
    pub point_of_view: Option<String>,

    /// Target word count
    #[arg(long)]
    pub word_count: Option<String>,

    /// Tone of voice
    #[arg(long)]
    pub tone: Option<String>,

    /// Intended readers
    #[arg(long)]
    pub audience: Option<String>,

    /// Add an FAQ section with this many questions
    #[arg(long, value_name = "COUNT")]
    pub faq: Option<u32>,

    /// Add this many images
    #[arg(long, value_name = "COUNT")]
    pub images: Option<u32>,

    /// Add internal links, this many (0 turns them off)
    #[arg(long, value_name = "COUNT")]
    pub internal_links: Option<u32>,

    /// Add external links, this many (0 turns them off)
    #[arg(long, value_name = "COUNT")]
    pub external_links: Option<u32>,

    /// Add a table of contents (`--table-of-contents false` removes it)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub table_of_contents: Option<bool>,

    /// Add a key takeaways section
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub key_takeaways: Option<bool>,

    /// Open with an introduction
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub introduction: Option<bool>,

    /// Close with a conclusion
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub conclusion: Option<bool>,

    /// Back claims with statistics
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub statistics: Option<bool>,

    /// Close with this call to action (an empty text removes it)
    #[arg(long)]
    pub call_to_action: Option<String>,

    /// Free-form instructions for the writer
    #[arg(long)]
    pub instructions: Option<String>,

    /// Write the finished article to this file
    #[arg(long)]
    pub output: Option<Utf8PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show the saved research defaults
    Show,

    /// Update the saved research defaults
    Set {
        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        country: Option<String>,

        /// Research depth
        #[arg(long)]
        depth: Option<u32>,

        /// Research limit
        #[arg(long)]
        limit: Option<u32>,
    },
}
