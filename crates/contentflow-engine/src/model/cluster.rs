//! Keyword clusters and the selection/priority rules over them.
//!
//! Priorities rank the items chosen for blog creation. Across a whole
//! [`ClusterSet`] a priority value is held by at most one item, and only items
//! with [`ItemStatus::Select`] may hold one.

use std::collections::HashSet;

use contentflow_utils::error::WorkflowError;
use serde::{Deserialize, Serialize};

/// What the user decided to do with a clustered keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(rename = "Select for Blog Creation")]
    Select,
    #[serde(rename = "Reject for Blog Creation")]
    Reject,
    #[default]
    #[serde(rename = "Keep for Future")]
    KeepForFuture,
}

impl ItemStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "Select for Blog Creation",
            Self::Reject => "Reject for Blog Creation",
            Self::KeepForFuture => "Keep for Future",
        }
    }

    /// Lenient parse used for upstream data and CLI input.
    ///
    /// Accepts the full labels as well as `select`, `reject` and `keep`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.starts_with("select") {
            Some(Self::Select)
        } else if lowered.starts_with("reject") {
            Some(Self::Reject)
        } else if lowered.starts_with("keep") {
            Some(Self::KeepForFuture)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterItem {
    pub keyword: String,
    pub monthly_search_volume: Option<u64>,
    pub keyword_difficulty: Option<f64>,
    pub competition: Option<String>,
    pub search_intent: Option<String>,
    pub cpc: Option<f64>,
    pub category: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    /// `None` means unassigned.
    pub priority: Option<u32>,
}

impl ClusterItem {
    #[must_use]
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.status == ItemStatus::Select
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterGroup {
    pub cluster_name: String,
    pub intent_pattern: Option<String>,
    pub core_topic: Option<String>,
    pub reasoning: Option<String>,
    pub items: Vec<ClusterItem>,
}

/// Output of the clustering stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterSet {
    pub groups: Vec<ClusterGroup>,
}

fn not_found(keyword: &str) -> WorkflowError {
    WorkflowError::UserInput(format!("Keyword '{keyword}' is not in any cluster"))
}

impl ClusterSet {
    #[must_use]
    pub fn new(groups: Vec<ClusterGroup>) -> Self {
        Self { groups }
    }

    pub fn items(&self) -> impl Iterator<Item = &ClusterItem> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }

    fn items_mut(&mut self) -> impl Iterator<Item = &mut ClusterItem> {
        self.groups.iter_mut().flat_map(|g| g.items.iter_mut())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Case-insensitive lookup by keyword.
    #[must_use]
    pub fn find(&self, keyword: &str) -> Option<&ClusterItem> {
        self.items()
            .find(|item| item.keyword.eq_ignore_ascii_case(keyword.trim()))
    }

    fn find_mut(&mut self, keyword: &str) -> Option<&mut ClusterItem> {
        let keyword = keyword.trim();
        self.items_mut()
            .find(|item| item.keyword.eq_ignore_ascii_case(keyword))
    }

    /// Change an item's status. Leaving `Select` clears its priority.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` if no item has this keyword.
    pub fn set_status(&mut self, keyword: &str, status: ItemStatus) -> Result<(), WorkflowError> {
        let item = self.find_mut(keyword).ok_or_else(|| not_found(keyword))?;
        item.status = status;
        if status != ItemStatus::Select {
            item.priority = None;
        }
        Ok(())
    }

    /// Assign or clear an item's priority.
    ///
    /// `None` and `Some(0)` clear it. A value already held by another item is
    /// moved: the previous holder becomes unassigned.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` if the keyword is unknown or the item is not
    /// selected for blog creation.
    pub fn set_priority(&mut self, keyword: &str, priority: Option<u32>) -> Result<(), WorkflowError> {
        let priority = priority.filter(|p| *p > 0);

        let keyword = keyword.trim();
        let (group_idx, item_idx) = self
            .groups
            .iter()
            .enumerate()
            .find_map(|(g, group)| {
                group
                    .items
                    .iter()
                    .position(|item| item.keyword.eq_ignore_ascii_case(keyword))
                    .map(|i| (g, i))
            })
            .ok_or_else(|| not_found(keyword))?;

        let item = &self.groups[group_idx].items[item_idx];
        if priority.is_some() && !item.is_selected() {
            return Err(WorkflowError::UserInput(format!(
                "Only keywords marked '{}' can be prioritized; '{}' is '{}'",
                ItemStatus::Select,
                item.keyword,
                item.status
            )));
        }

        if priority.is_some() {
            for other in self.items_mut() {
                if other.priority == priority {
                    other.priority = None;
                }
            }
        }
        self.groups[group_idx].items[item_idx].priority = priority;
        Ok(())
    }

    /// Selected items with their cluster, ordered by priority (unassigned
    /// last) and then by position.
    #[must_use]
    pub fn selected_items(&self) -> Vec<(&ClusterGroup, &ClusterItem)> {
        let mut selected: Vec<(usize, &ClusterGroup, &ClusterItem)> = self
            .groups
            .iter()
            .flat_map(|group| group.items.iter().map(move |item| (group, item)))
            .filter(|(_, item)| item.is_selected())
            .enumerate()
            .map(|(position, (group, item))| (position, group, item))
            .collect();
        selected.sort_by_key(|(position, _, item)| (item.priority.unwrap_or(u32::MAX), *position));
        selected
            .into_iter()
            .map(|(_, group, item)| (group, item))
            .collect()
    }

    /// Repair incoming data so the priority rules hold.
    ///
    /// Zero priorities become unassigned, unselected items lose their
    /// priority, and of several items sharing a value only the first keeps it.
    /// Returns one message per repair.
    pub fn enforce_invariants(&mut self) -> Vec<String> {
        let mut repairs = Vec::new();
        let mut taken = HashSet::new();

        for item in self.items_mut() {
            let current = item.priority;
            match current {
                Some(0) => item.priority = None,
                Some(p) if !item.is_selected() => {
                    repairs.push(format!(
                        "cleared priority {p} on '{}' (status '{}')",
                        item.keyword, item.status
                    ));
                    item.priority = None;
                }
                Some(p) if !taken.insert(p) => {
                    repairs.push(format!(
                        "cleared duplicate priority {p} on '{}'",
                        item.keyword
                    ));
                    item.priority = None;
                }
                _ => {}
            }
        }
        repairs
    }

    /// Whether the priority rules currently hold.
    #[must_use]
    pub fn priorities_consistent(&self) -> bool {
        let mut taken = HashSet::new();
        self.items().all(|item| match item.priority {
            None => true,
            Some(0) => false,
            Some(p) => item.is_selected() && taken.insert(p),
        })
    }

    /// Structural problems that make the set unusable, if any.
    pub(crate) fn structural_problem(&self) -> Option<String> {
        if self.groups.is_empty() {
            return Some("clustering returned no clusters".to_string());
        }
        let mut names = HashSet::new();
        for group in &self.groups {
            if !names.insert(group.cluster_name.to_ascii_lowercase()) {
                return Some(format!("duplicate cluster name '{}'", group.cluster_name));
            }
            let mut keywords = HashSet::new();
            for item in &group.items {
                if !keywords.insert(item.keyword.to_ascii_lowercase()) {
                    return Some(format!(
                        "duplicate keyword '{}' in cluster '{}'",
                        item.keyword, group.cluster_name
                    ));
                }
            }
        }
        if !self.priorities_consistent() {
            return Some("priorities are not unique across selected keywords".to_string());
        }
        None
    }
}
