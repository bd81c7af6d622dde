use serde::{Deserialize, Serialize};

/// Output of the keyword research stage.
///
/// Replaced wholesale when the user researches again.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordResearchResult {
    pub original_keyword: String,
    pub country: String,
    pub language: String,
    pub content_type: String,
    pub historical_search_data: Vec<SearchMetric>,
    pub references: Vec<Reference>,
}

impl KeywordResearchResult {
    /// Keywords offered for selection, in upstream order, without duplicates.
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.historical_search_data
            .iter()
            .filter_map(|metric| metric.keyword.as_deref())
            .filter(|keyword| seen.insert(keyword.to_ascii_lowercase()))
            .collect()
    }
}

/// Search metrics for one keyword. Every field is optional upstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetric {
    pub keyword: Option<String>,
    pub search_volume: Option<u64>,
    pub competition: Option<String>,
    pub competition_index: Option<f64>,
    pub cpc: Option<f64>,
    pub keyword_difficulty: Option<f64>,
    pub search_intent: Option<String>,
    #[serde(default)]
    pub monthly_searches: Vec<MonthlySearch>,
    #[serde(default)]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySearch {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub search_volume: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}
