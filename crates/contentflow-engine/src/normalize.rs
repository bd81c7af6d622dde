//! Response normalization
//!
//! Upstream stages return the same logical record in several envelopes. Each
//! response is first decoded into an [`Envelope`], trying in order:
//!
//! 1. `{data: [{…record…}]}`, the record being the first element
//! 2. `{data: […items…]}`
//! 3. a flat object holding one of the stage's primary keys
//! 4. a bare array, either wrapping a record object or holding the items
//!
//! Anything else (null, scalars, `{}`) is `InvalidResponseShape`. Once
//! decoded, fields are read defensively: keys are matched case-insensitively,
//! numbers may arrive as strings, and missing optional fields become `None`
//! plus a warning instead of failing the stage.

use std::collections::{BTreeSet, HashSet};

use contentflow_utils::error::WorkflowError;
use contentflow_utils::logging::log_missing_field;
use contentflow_utils::types::Stage;
use serde_json::{Map, Value};

use crate::model::{
    ClusterGroup, ClusterItem, ClusterSet, ContentType, GeneratedArticle, ItemStatus,
    KeywordResearchResult, MonthlySearch, OutlineOption, Reference, SearchMetric,
    TitleDescriptionItem, TitleSet, TitleStatus,
};
use crate::payload::ResearchRequest;

type Object = Map<String, Value>;

/// A validated stage output plus diagnostics gathered while reading it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    /// Upstream execution id, read from `executionId` in any casing.
    pub execution_id: Option<String>,
    pub warnings: Vec<String>,
}

impl<T> Normalized<T> {
    /// Convert the value, keeping diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        Normalized {
            value: f(self.value),
            execution_id: self.execution_id,
            warnings: self.warnings,
        }
    }
}

/// The envelope a response arrived in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope<'a> {
    /// `{data: [record, …]}` where `record` holds a primary key
    DoublyWrapped { outer: &'a Object, record: &'a Object },
    /// `{data: [item, …]}`
    Wrapped { outer: &'a Object, items: &'a [Value] },
    /// An object holding a primary key, possibly the sole element of an array
    Flat(&'a Object),
    /// `[item, …]`
    FlatArray(&'a [Value]),
}

/// What a stage response must contain.
#[derive(Debug, Clone, Copy)]
pub struct StageSchema {
    pub stage: Stage,
    /// Keys that identify the record, matched case-insensitively.
    pub primary_keys: &'static [&'static str],
    /// Whether the primary keys hold item arrays (all stages but the article).
    pub list: bool,
}

pub const RESEARCH_SCHEMA: StageSchema = StageSchema {
    stage: Stage::KeywordResearch,
    primary_keys: &["historicalSearchData", "data"],
    list: true,
};

pub const CLUSTERS_SCHEMA: StageSchema = StageSchema {
    stage: Stage::Clustering,
    primary_keys: &["clusters", "data"],
    list: true,
};

pub const TITLES_SCHEMA: StageSchema = StageSchema {
    stage: Stage::TitleDescription,
    primary_keys: &["titles", "data"],
    list: true,
};

pub const OUTLINES_SCHEMA: StageSchema = StageSchema {
    stage: Stage::Outline,
    primary_keys: &["outlines", "data"],
    list: true,
};

pub const ARTICLE_SCHEMA: StageSchema = StageSchema {
    stage: Stage::Article,
    primary_keys: &["GeneratedArticle"],
    list: false,
};

fn shape_error(stage: Stage, reason: impl Into<String>) -> WorkflowError {
    WorkflowError::InvalidResponseShape {
        stage,
        reason: reason.into(),
    }
}

/// Case-insensitive key lookup; an exact match wins.
fn get_ci<'a>(object: &'a Object, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

impl StageSchema {
    fn has_primary(&self, object: &Object) -> bool {
        self.primary_keys.iter().any(|key| match get_ci(object, key) {
            Some(Value::Array(_)) => true,
            Some(Value::Null) | None => false,
            Some(_) => !self.list,
        })
    }

    /// First primary key holding a non-empty array.
    fn primary_items<'a>(&self, object: &'a Object) -> Option<&'a [Value]> {
        self.primary_keys.iter().find_map(|key| match get_ci(object, key) {
            Some(Value::Array(items)) if !items.is_empty() => Some(items.as_slice()),
            _ => None,
        })
    }

    fn decode_object<'a>(&self, outer: &'a Object) -> Option<Envelope<'a>> {
        if let Some(Value::Array(data)) = get_ci(outer, "data") {
            if let Some(Value::Object(record)) = data.first()
                && self.has_primary(record)
            {
                return Some(Envelope::DoublyWrapped { outer, record });
            }
            if self.list {
                return Some(Envelope::Wrapped {
                    outer,
                    items: data.as_slice(),
                });
            }
        }
        if self.has_primary(outer) {
            return Some(Envelope::Flat(outer));
        }
        None
    }

    /// Decode the envelope of a response body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponseShape` when no envelope matches.
    pub fn decode<'a>(&self, body: &'a Value) -> Result<Envelope<'a>, WorkflowError> {
        match body {
            Value::Object(outer) => self.decode_object(outer).ok_or_else(|| {
                shape_error(
                    self.stage,
                    format!(
                        "expected one of [{}] in the response object",
                        self.primary_keys.join(", ")
                    ),
                )
            }),
            Value::Array(items) => {
                if let Some(Value::Object(first)) = items.first()
                    && let Some(envelope) = self.decode_object(first)
                {
                    return Ok(envelope);
                }
                if self.list && !items.is_empty() {
                    return Ok(Envelope::FlatArray(items.as_slice()));
                }
                Err(shape_error(self.stage, "response array holds no usable record"))
            }
            Value::Null => Err(shape_error(self.stage, "response body is null")),
            _ => Err(shape_error(self.stage, "response body is not an object or array")),
        }
    }
}

/// Decoded envelope split into the record-level objects and the item list.
struct Resolved<'a> {
    /// Record first, then the outer object, for metadata lookups.
    meta: Vec<&'a Object>,
    items: &'a [Value],
}

impl<'a> Resolved<'a> {
    fn new(schema: &StageSchema, envelope: Envelope<'a>) -> Result<Self, WorkflowError> {
        let (meta, items) = match envelope {
            Envelope::DoublyWrapped { outer, record } => {
                (vec![record, outer], schema.primary_items(record))
            }
            Envelope::Wrapped { outer, items } => (vec![outer], Some(items)),
            Envelope::Flat(record) => (vec![record], schema.primary_items(record)),
            Envelope::FlatArray(items) => (Vec::new(), Some(items)),
        };

        let items = match items {
            Some(items) if !items.is_empty() => items,
            _ if schema.list => {
                return Err(shape_error(
                    schema.stage,
                    format!(
                        "none of [{}] is a non-empty array",
                        schema.primary_keys.join(", ")
                    ),
                ));
            }
            _ => &[],
        };

        Ok(Self { meta, items })
    }

    fn fields(&self) -> Fields<'a> {
        Fields(self.meta.clone())
    }
}

/// Read-only view over one or more JSON objects, searched in order.
struct Fields<'a>(Vec<&'a Object>);

impl<'a> Fields<'a> {
    fn of(object: &'a Object) -> Self {
        Self(vec![object])
    }

    fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        self.0.iter().copied().find_map(|object| {
            keys.iter()
                .find_map(|key| get_ci(object, key).filter(|v| !v.is_null()))
        })
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        match self.get(keys)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn text_or(&self, keys: &[&str], fallback: &str) -> String {
        self.text(keys).unwrap_or_else(|| fallback.to_string())
    }

    fn count(&self, keys: &[&str], diag: &mut Diagnostics) -> Option<u64> {
        let value = self.get(keys)?;
        let parsed = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64)),
            Value::String(s) => {
                let cleaned: String = s.chars().filter(|c| !matches!(c, ',' | ' ' | '_')).collect();
                cleaned.parse::<u64>().ok().or_else(|| {
                    cleaned
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f.round() as u64)
                })
            }
            _ => None,
        };
        if parsed.is_none() {
            diag.warn(format!("ignored non-numeric {} value {value}", keys[0]));
        }
        parsed
    }

    fn decimal(&self, keys: &[&str], diag: &mut Diagnostics) -> Option<f64> {
        let value = self.get(keys)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| !matches!(c, ',' | ' ' | '$' | '%'))
                    .collect();
                cleaned.parse::<f64>().ok()
            }
            _ => None,
        }
        .filter(|f| f.is_finite());
        if parsed.is_none() {
            diag.warn(format!("ignored non-numeric {} value {value}", keys[0]));
        }
        parsed
    }

    fn array(&self, keys: &[&str]) -> &'a [Value] {
        match self.get(keys) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    fn execution_id(&self) -> Option<String> {
        self.text(&["executionId", "execution_id"])
    }
}

/// Collects missing fields and repairs while a response is read.
struct Diagnostics {
    stage: Stage,
    missing: BTreeSet<String>,
    warnings: Vec<String>,
}

impl Diagnostics {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            missing: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    fn missing(&mut self, field: &str) {
        self.missing.insert(field.to_string());
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Log each missing field once and return all diagnostics.
    fn finish(self) -> Vec<String> {
        for field in &self.missing {
            log_missing_field(self.stage, field);
        }
        self.missing
            .iter()
            .map(|field| format!("missing field '{field}'"))
            .chain(self.warnings)
            .collect()
    }
}

/// Object entries of an item array, numbered among themselves.
fn objects<'a>(items: &'a [Value], what: &str, diag: &mut Diagnostics) -> Vec<(usize, &'a Object)> {
    let skipped = items.iter().filter(|v| !v.is_object()).count();
    if skipped > 0 {
        diag.warn(format!("skipped {skipped} non-object {what} entries"));
    }
    items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .collect()
}

/// Normalize a keyword research response.
///
/// Echoed inputs missing from the response are taken from `request`.
///
/// # Errors
///
/// Returns `InvalidResponseShape` if the response has no non-empty
/// `historicalSearchData`/`data` array of metric objects.
pub fn research(
    body: &Value,
    request: &ResearchRequest,
) -> Result<Normalized<KeywordResearchResult>, WorkflowError> {
    let schema = RESEARCH_SCHEMA;
    let resolved = Resolved::new(&schema, schema.decode(body)?)?;
    let meta = resolved.fields();
    let mut diag = Diagnostics::new(schema.stage);

    let historical_search_data: Vec<SearchMetric> = objects(resolved.items, "metric", &mut diag)
        .into_iter()
        .map(|(_, object)| parse_metric(&Fields::of(object), &mut diag))
        .collect();
    if historical_search_data.is_empty() {
        return Err(shape_error(schema.stage, "no keyword metrics in response"));
    }

    let references = meta
        .array(&["references", "sources"])
        .iter()
        .filter_map(|entry| parse_reference(entry, &mut diag))
        .collect();

    let value = KeywordResearchResult {
        original_keyword: meta.text_or(&["originalKeyword", "original_keyword"], &request.original_keyword),
        country: meta.text_or(&["country"], &request.country),
        language: meta.text_or(&["language"], &request.language),
        content_type: meta.text_or(&["contentType", "content_type"], &request.content_type),
        historical_search_data,
        references,
    };

    Ok(Normalized {
        value,
        execution_id: meta.execution_id(),
        warnings: diag.finish(),
    })
}

fn parse_metric(fields: &Fields<'_>, diag: &mut Diagnostics) -> SearchMetric {
    let keyword = fields.text(&["keyword", "term"]);
    if keyword.is_none() {
        diag.missing("keyword");
    }

    let (competition, mut competition_index) = match fields.get(&["competition"]) {
        Some(Value::Number(n)) => (None, n.as_f64()),
        Some(Value::String(s)) if !s.trim().is_empty() => (Some(s.trim().to_string()), None),
        _ => (None, None),
    };
    if competition_index.is_none() {
        competition_index = fields.decimal(&["competitionIndex", "competition_index"], diag);
    }

    let monthly_searches = fields
        .array(&["monthlySearches", "monthly_searches", "searchVolumeTrend"])
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let entry = Fields::of(entry);
            MonthlySearch {
                year: entry.count(&["year"], diag).and_then(|y| i32::try_from(y).ok()),
                month: entry.count(&["month"], diag).and_then(|m| u32::try_from(m).ok()),
                search_volume: entry.count(&["searchVolume", "search_volume", "volume"], diag),
            }
        })
        .collect();

    let variants = fields
        .array(&["variants", "relatedKeywords", "related_keywords"])
        .iter()
        .filter_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .collect();

    SearchMetric {
        keyword,
        search_volume: fields.count(
            &["searchVolume", "search_volume", "volume", "monthlySearchVolume"],
            diag,
        ),
        competition,
        competition_index,
        cpc: fields.decimal(&["cpc"], diag),
        keyword_difficulty: fields.decimal(&["keywordDifficulty", "keyword_difficulty", "difficulty"], diag),
        search_intent: fields.text(&["searchIntent", "search_intent", "intent"]),
        monthly_searches,
        variants,
    }
}

fn parse_reference(entry: &Value, diag: &mut Diagnostics) -> Option<Reference> {
    match entry {
        Value::String(url) if !url.trim().is_empty() => Some(Reference {
            title: url.trim().to_string(),
            url: url.trim().to_string(),
        }),
        Value::Object(object) => {
            let fields = Fields::of(object);
            let Some(url) = fields.text(&["url", "link", "href"]) else {
                diag.warn("skipped reference without url".to_string());
                return None;
            };
            Some(Reference {
                title: fields.text(&["title", "name"]).unwrap_or_else(|| url.clone()),
                url,
            })
        }
        _ => None,
    }
}

/// Normalize a clustering response.
///
/// Clusters with the same name are merged, duplicate keywords within a
/// cluster are dropped, and priorities are repaired so at most one selected
/// item holds each value.
///
/// # Errors
///
/// Returns `InvalidResponseShape` if no cluster can be read.
pub fn clusters(body: &Value) -> Result<Normalized<ClusterSet>, WorkflowError> {
    let schema = CLUSTERS_SCHEMA;
    let resolved = Resolved::new(&schema, schema.decode(body)?)?;
    let mut diag = Diagnostics::new(schema.stage);

    let mut groups: Vec<ClusterGroup> = Vec::new();
    for (index, object) in objects(resolved.items, "cluster", &mut diag) {
        let fields = Fields::of(object);
        let cluster_name = fields
            .text(&["clusterName", "cluster_name", "name", "cluster"])
            .unwrap_or_else(|| {
                diag.missing("clusterName");
                format!("Cluster {}", index + 1)
            });

        let mut items = Vec::new();
        for entry in fields.array(&["items", "keywords"]) {
            match entry {
                Value::String(keyword) if !keyword.trim().is_empty() => {
                    items.push(ClusterItem::new(keyword.trim()));
                }
                Value::Object(item) => {
                    if let Some(item) = parse_cluster_item(&Fields::of(item), &mut diag) {
                        items.push(item);
                    }
                }
                _ => diag.warn(format!("skipped unreadable item in cluster '{cluster_name}'")),
            }
        }

        let group = ClusterGroup {
            intent_pattern: fields.text(&["intentPattern", "intent_pattern"]),
            core_topic: fields.text(&["coreTopic", "core_topic"]),
            reasoning: fields.text(&["reasoning"]),
            cluster_name,
            items,
        };

        match groups
            .iter_mut()
            .find(|g| g.cluster_name.eq_ignore_ascii_case(&group.cluster_name))
        {
            Some(existing) => {
                diag.warn(format!("merged duplicate cluster '{}'", group.cluster_name));
                existing.items.extend(group.items);
            }
            None => groups.push(group),
        }
    }

    for group in &mut groups {
        let mut seen = HashSet::new();
        let before = group.items.len();
        group
            .items
            .retain(|item| seen.insert(item.keyword.to_ascii_lowercase()));
        if group.items.len() != before {
            diag.warn(format!(
                "dropped {} duplicate keyword(s) in cluster '{}'",
                before - group.items.len(),
                group.cluster_name
            ));
        }
    }

    if groups.is_empty() {
        return Err(shape_error(schema.stage, "no readable clusters in response"));
    }

    let mut value = ClusterSet::new(groups);
    for repair in value.enforce_invariants() {
        diag.warn(repair);
    }

    Ok(Normalized {
        value,
        execution_id: resolved.fields().execution_id(),
        warnings: diag.finish(),
    })
}

fn parse_cluster_item(fields: &Fields<'_>, diag: &mut Diagnostics) -> Option<ClusterItem> {
    let Some(keyword) = fields.text(&["keyword", "name"]) else {
        diag.warn("skipped cluster item without keyword".to_string());
        return None;
    };

    let status = match fields.text(&["status"]) {
        Some(raw) => ItemStatus::parse_lenient(&raw).unwrap_or_else(|| {
            diag.warn(format!("unknown status '{raw}' on '{keyword}'"));
            ItemStatus::default()
        }),
        None => ItemStatus::default(),
    };

    let priority = fields
        .count(&["priority"], diag)
        .and_then(|p| u32::try_from(p).ok())
        .filter(|p| *p > 0);

    Some(ClusterItem {
        monthly_search_volume: fields.count(
            &["monthlySearchVolume", "monthly_search_volume", "searchVolume", "search_volume"],
            diag,
        ),
        keyword_difficulty: fields.decimal(&["keywordDifficulty", "keyword_difficulty", "difficulty"], diag),
        competition: fields.text(&["competition"]),
        search_intent: fields.text(&["searchIntent", "search_intent", "intent"]),
        cpc: fields.decimal(&["cpc"], diag),
        category: fields.text(&["category"]),
        status,
        priority,
        keyword,
    })
}

/// Normalize a title/description response.
///
/// # Errors
///
/// Returns `InvalidResponseShape` if no item has both a keyword and a title.
pub fn titles(body: &Value) -> Result<Normalized<TitleSet>, WorkflowError> {
    let schema = TITLES_SCHEMA;
    let resolved = Resolved::new(&schema, schema.decode(body)?)?;
    let mut diag = Diagnostics::new(schema.stage);

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for (_, object) in objects(resolved.items, "title", &mut diag) {
        let fields = Fields::of(object);
        let primary_keyword = fields.text(&["primary_keyword", "primaryKeyword"]);
        let Some(keyword) = fields.text(&["keyword"]).or_else(|| primary_keyword.clone()) else {
            diag.warn("skipped title without keyword".to_string());
            continue;
        };
        let Some(title) = fields.text(&["title"]) else {
            diag.warn(format!("skipped title item for '{keyword}' without title"));
            continue;
        };
        if !seen.insert(keyword.to_ascii_lowercase()) {
            diag.warn(format!("dropped duplicate title item for '{keyword}'"));
            continue;
        }

        let description = fields
            .text(&["description", "metaDescription", "meta_description"])
            .unwrap_or_else(|| {
                diag.missing("description");
                String::new()
            });
        let cluster_name = fields
            .text(&["cluster_name", "clusterName"])
            .unwrap_or_else(|| {
                diag.missing("cluster_name");
                String::new()
            });
        let content_type = match fields.text(&["type", "contentType", "content_type"]) {
            Some(raw) if raw.eq_ignore_ascii_case("pillar") => ContentType::Pillar,
            Some(raw) if raw.eq_ignore_ascii_case("spoke") => ContentType::Spoke,
            Some(raw) => {
                diag.warn(format!("unknown content type '{raw}' for '{keyword}'"));
                ContentType::default()
            }
            None => {
                diag.missing("type");
                ContentType::default()
            }
        };
        let status = fields
            .text(&["status"])
            .and_then(|raw| TitleStatus::parse_lenient(&raw))
            .unwrap_or_default();

        items.push(TitleDescriptionItem {
            cluster_name,
            primary_keyword: primary_keyword.unwrap_or_else(|| keyword.clone()),
            keyword,
            title,
            description,
            content_type,
            reasoning: fields.text(&["reasoning"]),
            category: fields.text(&["category"]),
            status,
        });
    }

    if items.is_empty() {
        return Err(shape_error(schema.stage, "no title items with keyword and title"));
    }

    Ok(Normalized {
        value: TitleSet::new(items),
        execution_id: resolved.fields().execution_id(),
        warnings: diag.finish(),
    })
}

/// Normalize an outline response.
///
/// Entries may be markdown strings or objects with `id` and
/// `content`/`outline`. Ids are made unique and never take the reserved
/// custom id.
///
/// # Errors
///
/// Returns `InvalidResponseShape` if no entry has outline content.
pub fn outlines(body: &Value) -> Result<Normalized<Vec<OutlineOption>>, WorkflowError> {
    let schema = OUTLINES_SCHEMA;
    let resolved = Resolved::new(&schema, schema.decode(body)?)?;
    let mut diag = Diagnostics::new(schema.stage);

    // Explicit ids are reserved up front so generated ids never collide
    // with an entry further down the list.
    let explicit: HashSet<String> = resolved
        .items
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(object) => Fields::of(object).text(&["id"]),
            _ => None,
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut options: Vec<OutlineOption> = Vec::new();
    for (index, entry) in resolved.items.iter().enumerate() {
        let (id, content) = match entry {
            Value::String(content) => (None, Some(content.trim().to_string())),
            Value::Object(object) => {
                let fields = Fields::of(object);
                (
                    fields.text(&["id"]),
                    fields.text(&["content", "outline", "markdown", "text"]),
                )
            }
            _ => (None, None),
        };

        let Some(content) = content.filter(|c| !c.is_empty()) else {
            diag.warn(format!("skipped outline entry {} without content", index + 1));
            continue;
        };

        let id = match id {
            Some(id)
                if !id.eq_ignore_ascii_case(crate::model::CUSTOM_OUTLINE_ID)
                    && !taken.contains(&id) =>
            {
                id
            }
            requested => {
                let generated = (index + 1..)
                    .map(|n| format!("outline-{n}"))
                    .find(|candidate| !taken.contains(candidate) && !explicit.contains(candidate))
                    .unwrap_or_else(|| format!("outline-{}", index + 1));
                if let Some(requested) = requested {
                    diag.warn(format!("renamed outline id '{requested}' to '{generated}'"));
                }
                generated
            }
        };
        taken.insert(id.clone());
        options.push(OutlineOption::new(id, content));
    }

    if options.is_empty() {
        return Err(shape_error(schema.stage, "no outline content in response"));
    }

    Ok(Normalized {
        value: options,
        execution_id: resolved.fields().execution_id(),
        warnings: diag.finish(),
    })
}

/// Normalize an article response.
///
/// `GeneratedArticle`, `HumanizedGeneratedArticle` and `metaTags` are matched
/// case-insensitively. `metaTags` may be a description string or an object
/// with `title`/`description`. Without a title in the response,
/// `fallback_title` is used.
///
/// # Errors
///
/// Returns `InvalidResponseShape` if `GeneratedArticle` is missing or blank.
pub fn article(body: &Value, fallback_title: &str) -> Result<Normalized<GeneratedArticle>, WorkflowError> {
    let schema = ARTICLE_SCHEMA;
    let resolved = Resolved::new(&schema, schema.decode(body)?)?;
    let fields = resolved.fields();
    let mut diag = Diagnostics::new(schema.stage);

    let Some(content) = fields.text(&["GeneratedArticle"]) else {
        return Err(shape_error(schema.stage, "GeneratedArticle is empty"));
    };

    let humanized_content = fields.text(&["HumanizedGeneratedArticle"]);
    if humanized_content.is_none() {
        diag.missing("HumanizedGeneratedArticle");
    }

    let (meta_title, meta_description) = match fields.get(&["metaTags"]) {
        Some(Value::String(description)) => {
            (None, Some(description.trim().to_string()).filter(|d| !d.is_empty()))
        }
        Some(Value::Object(tags)) => {
            let tags = Fields::of(tags);
            (
                tags.text(&["title", "metaTitle", "meta_title"]),
                tags.text(&["description", "metaDescription", "meta_description"]),
            )
        }
        Some(_) => {
            diag.warn("ignored unreadable metaTags".to_string());
            (None, None)
        }
        None => {
            diag.missing("metaTags");
            (None, None)
        }
    };

    let title = meta_title
        .or_else(|| fields.text(&["title"]))
        .unwrap_or_else(|| fallback_title.to_string());

    Ok(Normalized {
        value: GeneratedArticle {
            title,
            content,
            humanized_content,
            meta_description,
        },
        execution_id: fields.execution_id(),
        warnings: diag.finish(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ResearchRequest {
        ResearchRequest {
            original_keyword: "sustainable gardening".into(),
            country: "US".into(),
            language: "en".into(),
            content_type: "blog".into(),
            depth: None,
            limit: None,
        }
    }

    fn metrics() -> Value {
        json!([
            {"keyword": "compost bins", "searchVolume": "1,200", "cpc": "$1.25", "competition": "LOW"},
            {"keyword": "rain barrels", "search_volume": 880, "competition": 0.4}
        ])
    }

    #[test]
    fn test_envelope_priority_order() {
        let doubly = json!({"data": [{"data": [1], "executionId": "e1"}]});
        assert!(matches!(
            RESEARCH_SCHEMA.decode(&doubly).unwrap(),
            Envelope::DoublyWrapped { .. }
        ));

        let wrapped = json!({"data": [{"keyword": "x"}]});
        assert!(matches!(
            RESEARCH_SCHEMA.decode(&wrapped).unwrap(),
            Envelope::Wrapped { .. }
        ));

        let flat = json!({"historicalSearchData": [{"keyword": "x"}]});
        assert!(matches!(RESEARCH_SCHEMA.decode(&flat).unwrap(), Envelope::Flat(_)));

        let bare = json!([{"keyword": "x"}]);
        assert!(matches!(
            RESEARCH_SCHEMA.decode(&bare).unwrap(),
            Envelope::FlatArray(_)
        ));
    }

    #[test]
    fn test_unrecognized_shapes_fail() {
        for body in [json!(null), json!({}), json!(42), json!("text"), json!([])] {
            let err = RESEARCH_SCHEMA.decode(&body).unwrap_err();
            assert!(
                matches!(err, WorkflowError::InvalidResponseShape { .. }),
                "{body} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_research_same_record_across_shapes() {
        let shapes = [
            json!({"data": [{"historicalSearchData": metrics()}]}),
            json!({"data": metrics()}),
            json!({"historicalSearchData": metrics()}),
            metrics(),
        ];
        let results: Vec<_> = shapes
            .iter()
            .map(|body| research(body, &request()).unwrap().value.historical_search_data)
            .collect();
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
        assert_eq!(results[0][0].search_volume, Some(1200));
        assert_eq!(results[0][0].cpc, Some(1.25));
        assert_eq!(results[0][0].competition.as_deref(), Some("LOW"));
        assert_eq!(results[0][1].competition_index, Some(0.4));
    }

    #[test]
    fn test_research_echo_falls_back_to_request() {
        let body = json!({"data": [{"data": metrics(), "country": "CA", "references": [
            {"title": "Guide", "url": "https://example.com/guide"},
            {"title": "No link"}
        ]}]});
        let normalized = research(&body, &request()).unwrap();

        assert_eq!(normalized.value.country, "CA");
        assert_eq!(normalized.value.language, "en");
        assert_eq!(normalized.value.original_keyword, "sustainable gardening");
        assert_eq!(normalized.value.references.len(), 1);
        assert!(normalized.warnings.iter().any(|w| w.contains("without url")));
    }

    #[test]
    fn test_research_without_arrays_fails() {
        let body = json!({"clusters": "none", "message": "ok"});
        assert!(matches!(
            research(&body, &request()),
            Err(WorkflowError::InvalidResponseShape { .. })
        ));

        let empty = json!({"data": []});
        assert!(matches!(
            research(&empty, &request()),
            Err(WorkflowError::InvalidResponseShape { .. })
        ));
    }

    #[test]
    fn test_execution_id_any_casing() {
        let lower = json!({"executionId": "abc", "clusters": [{"clusterName": "A", "items": ["k"]}]});
        let upper = json!({"ExecutionId": "abc", "clusters": [{"clusterName": "A", "items": ["k"]}]});
        assert_eq!(clusters(&lower).unwrap().execution_id.as_deref(), Some("abc"));
        assert_eq!(clusters(&upper).unwrap().execution_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_clusters_merge_dedupe_and_repair() {
        let body = json!({"clusters": [
            {"clusterName": "Composting", "items": [
                {"keyword": "compost bins", "status": "Select for Blog Creation", "priority": 1},
                {"keyword": "Compost Bins", "status": "select"}
            ]},
            {"ClusterName": "composting", "items": [
                {"keyword": "worm farm", "status": "Select for Blog Creation", "priority": "1"},
                {"keyword": "leaf mold", "status": "Reject for Blog Creation", "priority": 2},
                {"monthlySearchVolume": 10}
            ]}
        ]});

        let normalized = clusters(&body).unwrap();
        let set = normalized.value;

        assert_eq!(set.groups.len(), 1);
        assert_eq!(set.groups[0].items.len(), 3);
        assert!(set.priorities_consistent());
        assert_eq!(set.find("compost bins").unwrap().priority, Some(1));
        assert_eq!(set.find("worm farm").unwrap().priority, None);
        assert_eq!(set.find("leaf mold").unwrap().priority, None);
        assert!(normalized.warnings.len() >= 4);
    }

    #[test]
    fn test_missing_cluster_name_defaulted() {
        let body = json!({"data": [{"items": [{"keyword": "k"}]}]});
        let normalized = clusters(&body).unwrap();
        assert_eq!(normalized.value.groups[0].cluster_name, "Cluster 1");
        assert!(normalized.warnings.contains(&"missing field 'clusterName'".to_string()));
    }

    #[test]
    fn test_titles_normalized() {
        let body = json!([{"output": "x", "titles": [
            {"cluster_name": "Composting", "keyword": "compost bins", "title": "Bins 101",
             "description": "All about bins", "type": "Pillar", "primary_keyword": "compost bin"},
            {"keyword": "worm farm", "title": "Worms", "type": "listicle"},
            {"keyword": "no title"}
        ]}]);

        let normalized = titles(&body).unwrap();
        let items = &normalized.value.items;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content_type, ContentType::Pillar);
        assert_eq!(items[0].primary_keyword, "compost bin");
        assert_eq!(items[1].content_type, ContentType::Spoke);
        assert_eq!(items[1].primary_keyword, "worm farm");
        assert_eq!(items[1].status, TitleStatus::Pending);
    }

    #[test]
    fn test_outlines_from_strings_and_objects() {
        let body = json!({"outlines": [
            "# Intro\n## Body",
            {"id": "custom", "content": "# Other"},
            {"id": 7, "outline": "# Seven"},
            {"id": "empty"}
        ]});

        let normalized = outlines(&body).unwrap();
        let ids: Vec<&str> = normalized.value.iter().map(|o| o.id.as_str()).collect();

        assert_eq!(ids, vec!["outline-1", "outline-2", "7"]);
        assert_eq!(normalized.value[0].parsed.headings.len(), 2);
    }

    #[test]
    fn test_outline_ids_never_collide() {
        let body = json!({"outlines": [
            {"id": "outline-2", "content": "# A\n## a1"},
            "# B\n## b1",
            {"id": "outline-2", "content": "# C"},
            "# D",
            {"id": "outline-5", "content": "# E"}
        ]});

        let normalized = outlines(&body).unwrap();
        let ids: Vec<&str> = normalized.value.iter().map(|o| o.id.as_str()).collect();

        assert_eq!(ids, vec!["outline-2", "outline-3", "outline-4", "outline-6", "outline-5"]);
        assert!(
            normalized.warnings.iter().any(|w| w.contains("renamed outline id 'outline-2'")),
            "{:?}",
            normalized.warnings
        );
    }

    #[test]
    fn test_article_keys_case_insensitive() {
        let body = json!({"data": [{
            "generatedarticle": "<h1>Bins</h1>",
            "HUMANIZEDGENERATEDARTICLE": "Bins, explained",
            "MetaTags": {"title": "Bins", "description": "Pick a bin"}
        }]});

        let normalized = article(&body, "fallback").unwrap();

        assert_eq!(normalized.value.content, "<h1>Bins</h1>");
        assert_eq!(normalized.value.humanized_content.as_deref(), Some("Bins, explained"));
        assert_eq!(normalized.value.meta_description.as_deref(), Some("Pick a bin"));
        assert_eq!(normalized.value.title, "Bins");
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_article_string_meta_and_fallback_title() {
        let body = json!([{"GeneratedArticle": "Body", "metaTags": "Short description"}]);
        let normalized = article(&body, "Chosen Title").unwrap();

        assert_eq!(normalized.value.title, "Chosen Title");
        assert_eq!(normalized.value.meta_description.as_deref(), Some("Short description"));
        assert!(
            normalized
                .warnings
                .contains(&"missing field 'HumanizedGeneratedArticle'".to_string())
        );
    }

    #[test]
    fn test_article_requires_content() {
        for body in [
            json!({"GeneratedArticle": "   "}),
            json!({"data": [{"article": "x"}]}),
            json!({"data": []}),
        ] {
            assert!(matches!(
                article(&body, "t"),
                Err(WorkflowError::InvalidResponseShape { .. })
            ));
        }
    }
}
