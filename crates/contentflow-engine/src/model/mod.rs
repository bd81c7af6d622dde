//! Stage outputs and user-owned configuration for one workflow run.

mod article;
mod cluster;
mod customization;
mod keyword;
mod outline;
mod title;

pub use article::GeneratedArticle;
pub use cluster::{ClusterGroup, ClusterItem, ClusterSet, ItemStatus};
pub use customization::{
    ArticleOutlineCustomization, DEFAULT_ARTICLE_POINT_OF_VIEW, DEFAULT_HEADINGS_COUNT,
};
pub use keyword::{KeywordResearchResult, MonthlySearch, Reference, SearchMetric};
pub use outline::{CUSTOM_OUTLINE_ID, OutlineHeading, OutlineOption, ParsedOutline, parse_outline};
pub use title::{ContentType, TitleDescriptionItem, TitleSet, TitleStatus};
