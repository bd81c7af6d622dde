//! Request payloads for each remote stage
//!
//! Every builder here is a pure function of upstream stage outputs and the
//! user's current choices. Missing input the user must supply is reported as
//! `WorkflowError::UserInput` so that nothing reaches the network.

use contentflow_utils::error::WorkflowError;
use serde::Serialize;
use serde_json::Value;

use crate::model::{
    ArticleOutlineCustomization, ClusterSet, ContentType, OutlineHeading, OutlineOption,
    TitleDescriptionItem,
};
use crate::profile::ResearchDefaults;

/// Identifiers attached to every stage request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadIds {
    pub workflow_id: String,
    pub user_id: String,
    pub session_id: String,
}

/// What the user typed into the research form. Unset fields fall back to
/// [`ResearchDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResearchInput {
    pub keyword: String,
    pub country: Option<String>,
    pub language: Option<String>,
    pub content_type: Option<String>,
    pub depth: Option<u32>,
    pub limit: Option<u32>,
}

impl ResearchInput {
    #[must_use]
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }
}

/// Research parameters after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub original_keyword: String,
    pub country: String,
    pub language: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ResearchRequest {
    /// Merge user input over defaults.
    ///
    /// # Errors
    ///
    /// Returns `UserInput` when the keyword is blank.
    pub fn resolve(input: &ResearchInput, defaults: &ResearchDefaults) -> Result<Self, WorkflowError> {
        let keyword = collapse_whitespace(&input.keyword);
        if keyword.is_empty() {
            return Err(WorkflowError::UserInput(
                "Please enter a keyword to research".to_string(),
            ));
        }

        let or_default = |value: &Option<String>, default: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        Ok(Self {
            original_keyword: keyword,
            country: or_default(&input.country, &defaults.country),
            language: or_default(&input.language, &defaults.language),
            content_type: or_default(&input.content_type, &defaults.content_type),
            depth: input.depth.or(defaults.depth),
            limit: input.limit.or(defaults.limit),
        })
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn to_value<T: Serialize>(payload: &T) -> Value {
    // Serializing plain structs of strings and numbers cannot fail.
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WithIds<'a, T: Serialize> {
    #[serde(flatten)]
    ids: &'a PayloadIds,
    #[serde(flatten)]
    body: T,
}

/// Keyword research payload:
/// `{workflowId, userId, sessionId, originalKeyword, country, language, contentType[, depth][, limit]}`.
///
/// # Errors
///
/// Returns `UserInput` when the keyword is blank.
pub fn research_payload(
    ids: &PayloadIds,
    input: &ResearchInput,
    defaults: &ResearchDefaults,
) -> Result<Value, WorkflowError> {
    let request = ResearchRequest::resolve(input, defaults)?;
    Ok(research_request_payload(ids, &request))
}

/// Payload for an already-resolved research request.
#[must_use]
pub fn research_request_payload(ids: &PayloadIds, request: &ResearchRequest) -> Value {
    to_value(&WithIds { ids, body: request })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusteringBody<'a> {
    original_keyword: &'a str,
    keywords: Vec<String>,
}

/// Clustering payload: the selected keyword set plus ids.
///
/// Keywords are trimmed and de-duplicated case-insensitively, keeping the
/// first spelling.
///
/// # Errors
///
/// Returns `UserInput` when no keyword is selected.
pub fn clustering_payload(
    ids: &PayloadIds,
    original_keyword: &str,
    keywords: &[String],
) -> Result<Value, WorkflowError> {
    let mut seen = std::collections::HashSet::new();
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| collapse_whitespace(k))
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .collect();

    if keywords.is_empty() {
        return Err(WorkflowError::UserInput(
            "Select at least one keyword to cluster".to_string(),
        ));
    }

    Ok(to_value(&WithIds {
        ids,
        body: ClusteringBody {
            original_keyword,
            keywords,
        },
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitleClusterItem<'a> {
    keyword: &'a str,
    priority: Option<u32>,
    monthly_search_volume: Option<u64>,
    keyword_difficulty: Option<f64>,
    competition: Option<&'a str>,
    search_intent: Option<&'a str>,
    cpc: Option<f64>,
    category: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitleCluster<'a> {
    cluster_name: &'a str,
    intent_pattern: Option<&'a str>,
    core_topic: Option<&'a str>,
    items: Vec<TitleClusterItem<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitlesBody<'a> {
    original_keyword: &'a str,
    clusters: Vec<TitleCluster<'a>>,
}

/// Title/description payload: selected cluster items grouped by cluster.
///
/// Clusters keep their upstream order; items within a cluster follow
/// priority order.
///
/// # Errors
///
/// Returns `UserInput` when no item is selected for blog creation.
pub fn title_payload(
    ids: &PayloadIds,
    original_keyword: &str,
    clusters: &ClusterSet,
) -> Result<Value, WorkflowError> {
    let selected = clusters.selected_items();
    if selected.is_empty() {
        return Err(WorkflowError::UserInput(
            "Select at least one keyword for blog creation".to_string(),
        ));
    }

    let mut grouped: Vec<TitleCluster<'_>> = Vec::new();
    for group in &clusters.groups {
        let items: Vec<TitleClusterItem<'_>> = selected
            .iter()
            .filter(|(g, _)| std::ptr::eq(*g, group))
            .map(|(_, item)| TitleClusterItem {
                keyword: &item.keyword,
                priority: item.priority,
                monthly_search_volume: item.monthly_search_volume,
                keyword_difficulty: item.keyword_difficulty,
                competition: item.competition.as_deref(),
                search_intent: item.search_intent.as_deref(),
                cpc: item.cpc,
                category: item.category.as_deref(),
            })
            .collect();
        if !items.is_empty() {
            grouped.push(TitleCluster {
                cluster_name: &group.cluster_name,
                intent_pattern: group.intent_pattern.as_deref(),
                core_topic: group.core_topic.as_deref(),
                items,
            });
        }
    }

    Ok(to_value(&WithIds {
        ids,
        body: TitlesBody {
            original_keyword,
            clusters: grouped,
        },
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutlineBody<'a> {
    original_keyword: &'a str,
    title: &'a str,
    description: &'a str,
    primary_keyword: &'a str,
    keyword: &'a str,
    cluster_name: &'a str,
    #[serde(rename = "type")]
    content_type: ContentType,
}

fn require_title(title: &TitleDescriptionItem) -> Result<(), WorkflowError> {
    if title.title.trim().is_empty() {
        return Err(WorkflowError::UserInput(
            "Choose a title before continuing".to_string(),
        ));
    }
    Ok(())
}

/// Outline payload for the chosen title.
///
/// # Errors
///
/// Returns `UserInput` when the title is blank.
pub fn outline_payload(
    ids: &PayloadIds,
    original_keyword: &str,
    title: &TitleDescriptionItem,
) -> Result<Value, WorkflowError> {
    require_title(title)?;
    Ok(to_value(&WithIds {
        ids,
        body: OutlineBody {
            original_keyword,
            title: title.title.trim(),
            description: title.description.trim(),
            primary_keyword: primary_keyword(title),
            keyword: &title.keyword,
            cluster_name: &title.cluster_name,
            content_type: title.content_type,
        },
    }))
}

fn primary_keyword(title: &TitleDescriptionItem) -> &str {
    if title.primary_keyword.trim().is_empty() {
        &title.keyword
    } else {
        &title.primary_keyword
    }
}

/// Full article customization payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArticleBody<'a> {
    original_keyword: &'a str,
    title: &'a str,
    description: &'a str,
    primary_keyword: &'a str,
    keyword: &'a str,
    cluster_name: &'a str,
    #[serde(rename = "type")]
    content_type: ContentType,
    outline_id: &'a str,
    outline: &'a str,
    headings: &'a [OutlineHeading],
    #[serde(flatten)]
    customization: &'a ArticleOutlineCustomization,
}

/// Article payload: chosen title, selected outline and every customization
/// field, with `headingsCount` and `articlePointOfView` defaulted when unset.
///
/// # Errors
///
/// Returns `UserInput` when the title is blank or the outline has no content.
pub fn article_payload(
    ids: &PayloadIds,
    original_keyword: &str,
    title: &TitleDescriptionItem,
    outline: &OutlineOption,
    customization: &ArticleOutlineCustomization,
) -> Result<Value, WorkflowError> {
    require_title(title)?;
    if outline.content.trim().is_empty() {
        return Err(WorkflowError::UserInput(
            "Select an outline or write your own before generating the article".to_string(),
        ));
    }

    let mut payload = to_value(&WithIds {
        ids,
        body: ArticleBody {
            original_keyword,
            title: title.title.trim(),
            description: title.description.trim(),
            primary_keyword: primary_keyword(title),
            keyword: &title.keyword,
            cluster_name: &title.cluster_name,
            content_type: title.content_type,
            outline_id: &outline.id,
            outline: &outline.content,
            headings: &outline.parsed.headings,
            customization,
        },
    });

    if let Value::Object(map) = &mut payload {
        map.insert(
            "headingsCount".to_string(),
            Value::String(customization.headings_count_or_default().to_string()),
        );
        map.insert(
            "articlePointOfView".to_string(),
            Value::String(customization.point_of_view_or_default().to_string()),
        );
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterGroup, ClusterItem, ItemStatus};
    use serde_json::json;

    fn ids() -> PayloadIds {
        PayloadIds {
            workflow_id: "wf-1".into(),
            user_id: "user-1".into(),
            session_id: "sess-1".into(),
        }
    }

    fn title() -> TitleDescriptionItem {
        TitleDescriptionItem {
            cluster_name: "Composting".into(),
            keyword: "compost bins".into(),
            title: "Choosing a Compost Bin".into(),
            description: "A buyer's guide".into(),
            content_type: ContentType::Pillar,
            ..TitleDescriptionItem::default()
        }
    }

    #[test]
    fn test_research_payload_has_exact_fields() {
        let input = ResearchInput {
            country: Some("US".into()),
            language: Some("en".into()),
            ..ResearchInput::new("sustainable gardening")
        };
        let payload = research_payload(&ids(), &input, &ResearchDefaults::default()).unwrap();

        assert_eq!(
            payload,
            json!({
                "workflowId": "wf-1",
                "userId": "user-1",
                "sessionId": "sess-1",
                "originalKeyword": "sustainable gardening",
                "country": "US",
                "language": "en",
                "contentType": "blog",
            })
        );
    }

    #[test]
    fn test_research_payload_uses_profile_depth_and_limit() {
        let defaults = ResearchDefaults {
            depth: Some(2),
            limit: Some(50),
            ..ResearchDefaults::default()
        };
        let input = ResearchInput {
            limit: Some(10),
            ..ResearchInput::new("  rain   barrels ")
        };
        let payload = research_payload(&ids(), &input, &defaults).unwrap();

        assert_eq!(payload["originalKeyword"], "rain barrels");
        assert_eq!(payload["depth"], 2);
        assert_eq!(payload["limit"], 10);
    }

    #[test]
    fn test_blank_keyword_is_user_input_error() {
        let err = research_payload(&ids(), &ResearchInput::new("   "), &ResearchDefaults::default())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UserInput(_)));
    }

    #[test]
    fn test_clustering_payload_dedupes_keywords() {
        let keywords = vec![
            "compost bins".to_string(),
            " Compost  Bins".to_string(),
            String::new(),
            "worm farm".to_string(),
        ];
        let payload = clustering_payload(&ids(), "composting", &keywords).unwrap();
        assert_eq!(payload["keywords"], json!(["compost bins", "worm farm"]));
        assert_eq!(payload["originalKeyword"], "composting");
        assert_eq!(payload["workflowId"], "wf-1");
    }

    #[test]
    fn test_clustering_payload_requires_selection() {
        assert!(matches!(
            clustering_payload(&ids(), "composting", &[]),
            Err(WorkflowError::UserInput(_))
        ));
    }

    #[test]
    fn test_title_payload_only_includes_selected_items() {
        let mut set = ClusterSet::new(vec![
            ClusterGroup {
                cluster_name: "Composting".into(),
                items: vec![ClusterItem::new("compost bins"), ClusterItem::new("worm farm")],
                ..ClusterGroup::default()
            },
            ClusterGroup {
                cluster_name: "Water".into(),
                items: vec![ClusterItem::new("rain barrels")],
                ..ClusterGroup::default()
            },
        ]);
        set.set_status("worm farm", ItemStatus::Select).unwrap();
        set.set_priority("worm farm", Some(1)).unwrap();

        let payload = title_payload(&ids(), "composting", &set).unwrap();

        let clusters = payload["clusters"].as_array().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0]["clusterName"], "Composting");
        assert_eq!(clusters[0]["items"], json!([{
            "keyword": "worm farm",
            "priority": 1,
            "monthlySearchVolume": null,
            "keywordDifficulty": null,
            "competition": null,
            "searchIntent": null,
            "cpc": null,
            "category": null,
        }]));
    }

    #[test]
    fn test_title_payload_requires_selected_items() {
        let set = ClusterSet::new(vec![ClusterGroup {
            cluster_name: "Composting".into(),
            items: vec![ClusterItem::new("compost bins")],
            ..ClusterGroup::default()
        }]);
        assert!(matches!(
            title_payload(&ids(), "composting", &set),
            Err(WorkflowError::UserInput(_))
        ));
    }

    #[test]
    fn test_outline_payload_falls_back_to_keyword() {
        let payload = outline_payload(&ids(), "composting", &title()).unwrap();
        assert_eq!(payload["title"], "Choosing a Compost Bin");
        assert_eq!(payload["primaryKeyword"], "compost bins");
        assert_eq!(payload["type"], "pillar");
    }

    #[test]
    fn test_article_payload_applies_defaults() {
        let outline = OutlineOption::new("outline-1", "# Intro\n## Sizes");
        let payload = article_payload(
            &ids(),
            "composting",
            &title(),
            &outline,
            &ArticleOutlineCustomization {
                include_faq: true,
                ..ArticleOutlineCustomization::default()
            },
        )
        .unwrap();

        assert_eq!(payload["headingsCount"], "4-5");
        assert_eq!(payload["articlePointOfView"], "writer");
        assert_eq!(payload["includeFaq"], true);
        assert_eq!(payload["outline"], "# Intro\n## Sizes");
        assert_eq!(payload["headings"][1]["title"], "Sizes");
        assert_eq!(payload["sessionId"], "sess-1");
    }

    #[test]
    fn test_article_payload_keeps_user_heading_count() {
        let outline = OutlineOption::custom("# Mine");
        let customization = ArticleOutlineCustomization {
            headings_count: Some("7".into()),
            ..ArticleOutlineCustomization::default()
        };
        let payload =
            article_payload(&ids(), "composting", &title(), &outline, &customization).unwrap();
        assert_eq!(payload["headingsCount"], "7");
        assert_eq!(payload["outlineId"], "custom");
    }

    #[test]
    fn test_article_payload_requires_outline_content() {
        let outline = OutlineOption::custom("   ");
        let err = article_payload(
            &ids(),
            "composting",
            &title(),
            &outline,
            &ArticleOutlineCustomization::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::UserInput(_)));
    }
}
