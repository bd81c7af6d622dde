use contentflow_utils::error::WorkflowError;
use serde::{Deserialize, Serialize};

/// Role of a post in the content plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pillar,
    #[default]
    Spoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ContentType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pillar => "pillar",
            Self::Spoke => "spoke",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl TitleStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" | "approve" => Some(Self::Approved),
            "rejected" | "reject" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for TitleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A generated blog title and description for one selected keyword.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TitleDescriptionItem {
    pub cluster_name: String,
    /// Keyword of the cluster item this title was generated for.
    pub keyword: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub reasoning: Option<String>,
    pub primary_keyword: String,
    pub category: Option<String>,
    #[serde(default)]
    pub status: TitleStatus,
}

/// Output of the title/description stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleSet {
    pub items: Vec<TitleDescriptionItem>,
}

impl TitleSet {
    #[must_use]
    pub fn new(items: Vec<TitleDescriptionItem>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&TitleDescriptionItem> {
        let keyword = keyword.trim();
        self.items
            .iter()
            .find(|item| item.keyword.eq_ignore_ascii_case(keyword))
    }

    fn get_mut(&mut self, keyword: &str) -> Result<&mut TitleDescriptionItem, WorkflowError> {
        let keyword = keyword.trim();
        self.items
            .iter_mut()
            .find(|item| item.keyword.eq_ignore_ascii_case(keyword))
            .ok_or_else(|| WorkflowError::UserInput(format!("No title was generated for '{keyword}'")))
    }

    /// Edit the title and/or description in place.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` for an unknown keyword or a blank replacement.
    pub fn update_title(
        &mut self,
        keyword: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<(), WorkflowError> {
        if title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(WorkflowError::UserInput("Title cannot be empty".to_string()));
        }
        let item = self.get_mut(keyword)?;
        if let Some(title) = title {
            item.title = title.trim().to_string();
        }
        if let Some(description) = description {
            item.description = description.trim().to_string();
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `UserInput` for an unknown keyword.
    pub fn set_status(&mut self, keyword: &str, status: TitleStatus) -> Result<(), WorkflowError> {
        self.get_mut(keyword)?.status = status;
        Ok(())
    }

    /// Approve the title for `keyword` as the one carried into the outline stage.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` for an unknown keyword or a rejected title.
    pub fn choose(&mut self, keyword: &str) -> Result<&TitleDescriptionItem, WorkflowError> {
        let item = self.get_mut(keyword)?;
        if item.status == TitleStatus::Rejected {
            return Err(WorkflowError::UserInput(format!(
                "The title for '{}' was rejected; approve it before continuing",
                item.keyword
            )));
        }
        item.status = TitleStatus::Approved;
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TitleSet {
        TitleSet::new(vec![TitleDescriptionItem {
            cluster_name: "Composting".into(),
            keyword: "compost bins".into(),
            title: "The Complete Guide to Compost Bins".into(),
            description: "Everything about bins".into(),
            content_type: ContentType::Pillar,
            primary_keyword: "compost bins".into(),
            ..TitleDescriptionItem::default()
        }])
    }

    #[test]
    fn test_serializes_with_snake_case_and_type() {
        let json = serde_json::to_value(&sample().items[0]).unwrap();
        assert_eq!(json["cluster_name"], "Composting");
        assert_eq!(json["primary_keyword"], "compost bins");
        assert_eq!(json["type"], "pillar");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_update_title_edits_in_place() {
        let mut set = sample();
        set.update_title("Compost Bins", Some(" Better Bins ".into()), None)
            .unwrap();
        let item = set.get("compost bins").unwrap();
        assert_eq!(item.title, "Better Bins");
        assert_eq!(item.description, "Everything about bins");
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut set = sample();
        assert!(set.update_title("compost bins", Some("  ".into()), None).is_err());
        assert_eq!(set.items[0].title, "The Complete Guide to Compost Bins");
    }

    #[test]
    fn test_status_transition() {
        let mut set = sample();
        set.set_status("compost bins", TitleStatus::Rejected).unwrap();
        assert_eq!(set.items[0].status, TitleStatus::Rejected);
        assert!(set.set_status("unknown", TitleStatus::Approved).is_err());
    }

    #[test]
    fn test_choose_approves_unless_rejected() {
        let mut set = sample();
        assert_eq!(set.choose("compost bins").unwrap().status, TitleStatus::Approved);

        set.set_status("compost bins", TitleStatus::Rejected).unwrap();
        assert!(matches!(
            set.choose("compost bins"),
            Err(WorkflowError::UserInput(_))
        ));
    }
}
