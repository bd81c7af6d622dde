use serde::{Deserialize, Serialize};

/// The final article. Edits are local and never re-validated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    pub humanized_content: Option<String>,
    pub meta_description: Option<String>,
}

impl GeneratedArticle {
    pub fn edit_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn edit_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn edit_humanized(&mut self, content: Option<String>) {
        self.humanized_content = content;
    }

    pub fn edit_meta_description(&mut self, meta: Option<String>) {
        self.meta_description = meta;
    }

    /// The humanized rendering when present, else the raw content.
    #[must_use]
    pub fn preferred_content(&self) -> &str {
        self.humanized_content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.content)
    }
}
