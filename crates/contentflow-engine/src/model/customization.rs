use serde::{Deserialize, Serialize};

/// Used when the user leaves the heading count unset.
pub const DEFAULT_HEADINGS_COUNT: &str = "4-5";

/// Used when the user leaves the point of view unset.
pub const DEFAULT_ARTICLE_POINT_OF_VIEW: &str = "writer";

/// User-owned settings for article generation.
///
/// Passed to the article stage unchanged apart from the documented defaults
/// for unset text fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleOutlineCustomization {
    pub headings_count: Option<String>,
    pub article_point_of_view: Option<String>,
    pub word_count: Option<String>,
    pub tone_of_voice: Option<String>,
    pub target_audience: Option<String>,

    pub include_introduction: bool,
    pub include_conclusion: bool,
    pub include_faq: bool,
    pub faq_count: Option<u32>,
    pub include_key_takeaways: bool,
    pub include_table_of_contents: bool,
    pub include_images: bool,
    pub image_count: Option<u32>,
    pub include_statistics: bool,
    pub include_internal_links: bool,
    pub internal_link_count: Option<u32>,
    pub include_external_links: bool,
    pub external_link_count: Option<u32>,
    pub include_call_to_action: bool,
    pub call_to_action_text: Option<String>,

    pub additional_instructions: Option<String>,
}

impl ArticleOutlineCustomization {
    #[must_use]
    pub fn headings_count_or_default(&self) -> &str {
        non_blank(self.headings_count.as_deref()).unwrap_or(DEFAULT_HEADINGS_COUNT)
    }

    #[must_use]
    pub fn point_of_view_or_default(&self) -> &str {
        non_blank(self.article_point_of_view.as_deref()).unwrap_or(DEFAULT_ARTICLE_POINT_OF_VIEW)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
