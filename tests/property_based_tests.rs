//! Property-Based Tests for contentflow
//!
//! **WHITE-BOX TEST**: This test uses internal module APIs (`model`, `normalize`,
//! `context`) and may break with internal refactors.
//!
//! Properties tested:
//! - Outline parsing is a pure function of the text and stable under re-rendering
//! - No two selected cluster items share a priority, whatever edits are applied
//! - Backoff delays double per attempt and calls never exceed `max_retries + 1`
//! - The normalizer reads the same clusters from every supported envelope and
//!   rejects bodies matching none of them
//! - A rejected stage output leaves the step pointer and every store untouched
//!
//! ## Configuration
//!
//! Property test case counts can be configured via environment variables:
//!
//! - `PROPTEST_CASES`: Number of test cases per property (default: 64)
//! - `PROPTEST_MAX_SHRINK_ITERS`: Max shrinking iterations on failure (default: 1000)
//!
//! ### Examples
//!
//! ```bash
//! # Run with default settings (64 cases)
//! cargo test --test property_based_tests
//!
//! # Run with more cases for thorough local testing
//! PROPTEST_CASES=256 cargo test --test property_based_tests
//! ```

use proptest::prelude::*;
use serde_json::{Value, json};
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use contentflow::RetryPolicy;
use contentflow::context::{StageOutput, WorkflowContext};
use contentflow::error::WorkflowError;
use contentflow::model::{
    ClusterGroup, ClusterItem, ClusterSet, GeneratedArticle, ItemStatus, KeywordResearchResult,
    OutlineOption, SearchMetric, TitleSet, parse_outline,
};
use contentflow::normalize;
use contentflow::types::StepId;
use tokio_util::sync::CancellationToken;

/// Default number of test cases per property.
/// This is used when PROPTEST_CASES is not set.
const DEFAULT_PROPTEST_CASES: u32 = 64;

/// Default max shrink iterations.
/// This is used when PROPTEST_MAX_SHRINK_ITERS is not set.
const DEFAULT_MAX_SHRINK_ITERS: u32 = 1000;

/// Creates a ProptestConfig that respects environment variables.
///
/// # Arguments
///
/// * `max_cases` - Optional maximum case count. If the environment specifies
///   more cases than this, the max is used.
fn proptest_config(max_cases: Option<u32>) -> ProptestConfig {
    let env_cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);

    let env_shrink_iters = env::var("PROPTEST_MAX_SHRINK_ITERS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_MAX_SHRINK_ITERS);

    let cases = match max_cases {
        Some(max) => env_cases.min(max),
        None => env_cases,
    };

    ProptestConfig {
        cases,
        max_shrink_iters: env_shrink_iters,
        max_shrink_time: 30000, // 30 seconds max shrink time
        ..ProptestConfig::default()
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Markdown-ish text: headings of any depth (including invalid ones), body
/// lines and blank lines.
fn arb_outline_text() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        ("#{1,8}", "[ \t]{0,2}", ".{0,30}").prop_map(|(h, ws, t)| format!("{h}{ws}{t}")),
        "[ ]{0,3}#{1,6} [A-Za-z0-9 ]{0,20}",
        ".{0,40}",
        Just(String::new()),
    ];
    prop::collection::vec(line, 0..20).prop_map(|lines| lines.join("\n"))
}

#[derive(Debug, Clone)]
enum ClusterEdit {
    Status(ItemStatus),
    Priority(Option<u32>),
}

fn arb_edit() -> impl Strategy<Value = (usize, ClusterEdit)> {
    let status = prop_oneof![
        Just(ItemStatus::Select),
        Just(ItemStatus::Reject),
        Just(ItemStatus::KeepForFuture),
    ];
    let edit = prop_oneof![
        status.prop_map(ClusterEdit::Status),
        prop::option::of(0u32..4).prop_map(ClusterEdit::Priority),
    ];
    (0usize..6, edit)
}

fn keyword_cluster_set() -> ClusterSet {
    let group = |name: &str, keywords: &[&str]| ClusterGroup {
        cluster_name: name.to_string(),
        items: keywords.iter().map(|k| ClusterItem::new(*k)).collect(),
        ..ClusterGroup::default()
    };
    ClusterSet::new(vec![
        group("Composting", &["compost bins", "worm farms", "leaf mould"]),
        group("Water", &["rain barrels", "drip irrigation", "mulching"]),
    ])
}

/// Distinct cluster names, each with distinct lowercase keywords and volumes.
fn arb_cluster_records() -> impl Strategy<Value = Vec<Value>> {
    let items = prop::collection::btree_map("[a-z]{3,10}( [a-z]{3,8})?", 0u64..100_000, 1..5);
    prop::collection::btree_map("[a-z]{3,9}", items, 1..4).prop_map(|clusters| {
        clusters
            .into_iter()
            .map(|(name, items)| {
                let items: Vec<Value> = items
                    .into_iter()
                    .map(|(keyword, volume)| json!({"keyword": keyword, "monthlySearchVolume": volume}))
                    .collect();
                json!({"clusterName": format!("Topic {name}"), "items": items})
            })
            .collect()
    })
}

fn researched_and_clustered() -> WorkflowContext {
    let mut ctx = WorkflowContext::new("sess-prop");
    ctx.advance(StageOutput::Research(KeywordResearchResult {
        original_keyword: "sustainable gardening".into(),
        historical_search_data: vec![SearchMetric {
            keyword: Some("compost bins".into()),
            search_volume: Some(1200),
            ..SearchMetric::default()
        }],
        ..KeywordResearchResult::default()
    }))
    .unwrap();
    ctx.record(StageOutput::Clusters(keyword_cluster_set())).unwrap();
    ctx
}

/// Outputs that must be refused from the select-keywords step (or the keyword
/// step after going back).
fn arb_rejected_output() -> impl Strategy<Value = StageOutput> {
    prop_oneof![
        Just(StageOutput::Titles(TitleSet::default())),
        "[a-z ]{0,20}".prop_map(|keyword| StageOutput::Research(KeywordResearchResult {
            original_keyword: keyword,
            ..KeywordResearchResult::default()
        })),
        "[a-z]{3,8}".prop_map(|name| {
            let group = ClusterGroup {
                cluster_name: name,
                items: vec![ClusterItem::new("compost bins")],
                ..ClusterGroup::default()
            };
            StageOutput::Clusters(ClusterSet::new(vec![group.clone(), group]))
        }),
        "#{1,3} [a-z ]{1,20}".prop_map(|content| {
            StageOutput::Outlines(vec![OutlineOption::new("outline-1", content)])
        }),
        ".{0,20}".prop_map(|content| StageOutput::Article(GeneratedArticle {
            title: "Compost Bins".into(),
            content,
            ..GeneratedArticle::default()
        })),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(proptest_config(None))]

    /// Parsing is deterministic and re-parsing the rendered headings gives the
    /// same list.
    #[test]
    fn prop_outline_parsing_is_stable(text in arb_outline_text()) {
        let once = parse_outline(&text);
        prop_assert_eq!(&once, &parse_outline(&text));

        let reparsed = parse_outline(&once.to_markdown());
        prop_assert_eq!(&reparsed, &once);

        for heading in &once.headings {
            prop_assert!((1..=6).contains(&heading.level));
            prop_assert!(!heading.title.is_empty());
            prop_assert_eq!(heading.title.trim(), heading.title.as_str());
        }
    }

    /// Whatever status and priority edits are applied, selected priorities
    /// stay unique and only selected items hold one.
    #[test]
    fn prop_priorities_stay_unique(edits in prop::collection::vec(arb_edit(), 0..40)) {
        let mut set = keyword_cluster_set();
        let keywords: Vec<String> = set.items().map(|i| i.keyword.clone()).collect();

        for (index, edit) in edits {
            let keyword = &keywords[index % keywords.len()];
            let result = match edit {
                ClusterEdit::Status(status) => set.set_status(keyword, status),
                ClusterEdit::Priority(priority) => set.set_priority(keyword, priority),
            };
            if let Err(err) = result {
                prop_assert!(matches!(err, WorkflowError::UserInput(_)));
            }

            prop_assert!(set.priorities_consistent());
            let mut held = std::collections::HashSet::new();
            for item in set.items() {
                if let Some(priority) = item.priority {
                    prop_assert!(item.is_selected(), "{} holds a priority without being selected", item.keyword);
                    prop_assert!(priority > 0);
                    prop_assert!(held.insert(priority), "priority {} held twice", priority);
                }
            }
        }
    }

    /// Rejecting a selected item always clears its priority.
    #[test]
    fn prop_leaving_select_clears_priority(priority in 1u32..10, index in 0usize..6) {
        let mut set = keyword_cluster_set();
        let keyword = set.items().nth(index).unwrap().keyword.clone();

        set.set_status(&keyword, ItemStatus::Select).unwrap();
        set.set_priority(&keyword, Some(priority)).unwrap();
        set.set_status(&keyword, ItemStatus::Reject).unwrap();

        prop_assert_eq!(set.find(&keyword).unwrap().priority, None);
    }

    /// Delays double per attempt.
    #[test]
    fn prop_backoff_doubles(attempt in 0u32..10) {
        let policy = RetryPolicy::new(3);
        prop_assert_eq!(policy.delay_for(attempt), Duration::from_millis(1000 * 2u64.pow(attempt)));
        prop_assert_eq!(policy.delay_for(attempt + 1), policy.delay_for(attempt) * 2);
    }
}

proptest! {
    #![proptest_config(proptest_config(Some(32)))]

    /// Calls never exceed `max_retries + 1`, and the virtual time spent is the
    /// sum of the backoff delays actually slept.
    #[test]
    fn prop_retry_attempts_bounded(
        max_retries in 0u32..5,
        failures in 0u32..8,
        retryable in any::<bool>(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let (calls, result, elapsed) = rt.block_on(async {
            let calls = Arc::new(AtomicU32::new(0));
            let policy = RetryPolicy::new(max_retries);
            let started = tokio::time::Instant::now();
            let result = policy
                .run(&CancellationToken::new(), |attempt| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        if attempt < failures {
                            Err(if retryable {
                                WorkflowError::Network("connection reset".into())
                            } else {
                                WorkflowError::Timeout { duration: Duration::from_secs(120) }
                            })
                        } else {
                            Ok(attempt)
                        }
                    }
                })
                .await;
            (calls.load(Ordering::SeqCst), result, started.elapsed())
        });

        prop_assert!(calls <= max_retries + 1);

        let expected_calls = if failures == 0 {
            1
        } else if retryable {
            (failures + 1).min(max_retries + 1)
        } else {
            1
        };
        prop_assert_eq!(calls, expected_calls);
        prop_assert_eq!(result.is_ok(), failures == 0 || (retryable && failures <= max_retries));
        if let Ok(outcome) = &result {
            prop_assert_eq!(outcome.attempts, calls);
        }

        let policy = RetryPolicy::new(max_retries);
        let slept: Duration = (0..calls - 1).map(|n| policy.delay_for(n)).sum();
        prop_assert!(elapsed >= slept);
        prop_assert!(elapsed < slept + Duration::from_millis(50));
    }

    /// Every supported envelope yields the same clusters.
    #[test]
    fn prop_normalizer_envelopes_agree(records in arb_cluster_records()) {
        let flat = normalize::clusters(&json!({"clusters": records})).unwrap().value;

        let shapes = [
            json!({"data": [{"data": records}]}),
            json!({"data": [{"clusters": records}]}),
            json!({"data": records}),
            Value::Array(records.clone()),
        ];
        for body in &shapes {
            let normalized = normalize::clusters(body).unwrap();
            prop_assert_eq!(&normalized.value, &flat, "body: {}", body);
        }

        prop_assert_eq!(flat.groups.len(), records.len());
    }

    /// A rejected output changes nothing but the last error.
    #[test]
    fn prop_rejected_output_rolls_back(output in arb_rejected_output(), go_back in any::<bool>()) {
        let mut ctx = researched_and_clustered();
        if go_back {
            ctx.go_back().unwrap();
        }
        let step = ctx.current_step();
        let stores = serde_json::to_vec(ctx.stores()).unwrap();

        let err = ctx.apply(output).unwrap_err();

        prop_assert!(matches!(err, WorkflowError::Validation { .. }), "{err:?}");
        prop_assert_eq!(ctx.current_step(), step);
        prop_assert_eq!(serde_json::to_vec(ctx.stores()).unwrap(), stores);
        prop_assert!(ctx.last_error().is_some());
    }
}

/// Bodies matching no envelope are shape errors for every list stage.
#[test]
fn test_unusable_bodies_are_shape_errors() {
    let bodies = [
        Value::Null,
        json!({}),
        json!([]),
        json!(42),
        json!("Workflow was started"),
        json!({"message": "ok"}),
        json!({"data": []}),
    ];
    for body in &bodies {
        assert!(
            matches!(normalize::clusters(body), Err(WorkflowError::InvalidResponseShape { .. })),
            "clusters accepted {body}"
        );
        assert!(
            matches!(normalize::titles(body), Err(WorkflowError::InvalidResponseShape { .. })),
            "titles accepted {body}"
        );
        assert!(
            matches!(normalize::outlines(body), Err(WorkflowError::InvalidResponseShape { .. })),
            "outlines accepted {body}"
        );
    }
}

/// Going back and returning never loses stores.
#[test]
fn test_navigation_keeps_stores() {
    let mut ctx = researched_and_clustered();
    let stores = ctx.stores().clone();

    assert_eq!(ctx.go_back().unwrap(), StepId::Keyword);
    ctx.go_to(StepId::SelectKeywords).unwrap();

    assert_eq!(ctx.stores(), &stores);
    assert!(ctx.go_to(StepId::Outline).is_err());
}
