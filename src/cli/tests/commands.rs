//! Tests for command implementations against a saved workflow

use contentflow_engine::model::ItemStatus;
use contentflow_engine::profile::ProfileStore;
use contentflow_engine::snapshot;
use contentflow_engine::StageOutput;
use contentflow_utils::error::WorkflowError;
use contentflow_utils::types::{Stage, StepId};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::support::{clustered_context, default_env, generated_context, test_env};
use crate::Config;
use crate::cli::commands;

fn workflow_error(err: &anyhow::Error) -> &WorkflowError {
    err.chain()
        .find_map(|e| e.downcast_ref::<WorkflowError>())
        .expect("typed workflow error")
}

#[test]
fn test_status_on_fresh_state_does_not_create_file() {
    let t = default_env();
    commands::execute_status_command(&t.env, false).unwrap();
    commands::execute_status_command(&t.env, true).unwrap();
    assert!(!t.state_path().exists());
}

#[test]
fn test_stale_results_survive_save_and_status() {
    let t = default_env();
    let mut ctx = generated_context();
    ctx.go_to(StepId::Keyword).unwrap();
    let mut research = ctx.research().unwrap().clone();
    research.original_keyword = "urban composting".into();
    ctx.apply(StageOutput::Research(research)).unwrap();
    snapshot::save(t.state_path(), &ctx).unwrap();

    commands::execute_status_command(&t.env, false).unwrap();

    let reloaded = snapshot::load(t.state_path()).unwrap().context;
    let stale = reloaded.stale_results().unwrap();
    assert_eq!(stale.keyword, "sustainable gardening");
    assert_eq!(
        stale.stages,
        vec![Stage::Clustering, Stage::TitleDescription, Stage::Outline, Stage::Article]
    );
}

#[test]
fn test_reset_keeps_session_and_renews_workflow() {
    let t = default_env();
    let ctx = clustered_context();
    snapshot::save(t.state_path(), &ctx).unwrap();

    commands::execute_reset_command(&t.env).unwrap();

    let reloaded = snapshot::load(t.state_path()).unwrap().context;
    assert_eq!(reloaded.current_step(), StepId::Keyword);
    assert!(reloaded.research().is_none());
    assert_eq!(reloaded.session().session_id, "sess-cli");
    assert_ne!(reloaded.workflow_id(), ctx.workflow_id());
}

#[test]
fn test_select_updates_status_and_priority() {
    let t = default_env();
    snapshot::save(t.state_path(), &clustered_context()).unwrap();

    commands::execute_select_command(&t.env, "compost bins", Some("select"), Some(1)).unwrap();
    commands::execute_select_command(&t.env, "rain barrels", Some("select"), Some(1)).unwrap();

    let ctx = snapshot::load(t.state_path()).unwrap().context;
    let clusters = ctx.clusters().unwrap();
    let compost = clusters.find("compost bins").unwrap();
    let barrels = clusters.find("rain barrels").unwrap();
    assert_eq!(compost.status, ItemStatus::Select);
    assert_eq!(compost.priority, None, "priority 1 moved to the newer holder");
    assert_eq!(barrels.priority, Some(1));
}

#[test]
fn test_select_errors_are_user_input() {
    let t = default_env();

    let err = commands::execute_select_command(&t.env, "compost bins", Some("select"), None).unwrap_err();
    assert!(matches!(workflow_error(&err), WorkflowError::UserInput(_)));

    snapshot::save(t.state_path(), &clustered_context()).unwrap();
    let err = commands::execute_select_command(&t.env, "compost bins", Some("maybe"), None).unwrap_err();
    assert!(matches!(workflow_error(&err), WorkflowError::UserInput(_)));

    let err = commands::execute_select_command(&t.env, "compost bins", None, Some(2)).unwrap_err();
    assert!(matches!(workflow_error(&err), WorkflowError::UserInput(_)));

    let err = commands::execute_select_command(&t.env, "compost bins", None, None).unwrap_err();
    assert!(matches!(workflow_error(&err), WorkflowError::UserInput(_)));
}

#[test]
fn test_navigation_commands() {
    let t = default_env();
    snapshot::save(t.state_path(), &clustered_context()).unwrap();

    commands::execute_back_command(&t.env).unwrap();
    assert_eq!(
        snapshot::load(t.state_path()).unwrap().context.current_step(),
        StepId::Keyword
    );

    commands::execute_goto_command(&t.env, StepId::SelectKeywords).unwrap();
    assert_eq!(
        snapshot::load(t.state_path()).unwrap().context.current_step(),
        StepId::SelectKeywords
    );

    assert!(commands::execute_goto_command(&t.env, StepId::Generated).is_err());
}

#[test]
fn test_profile_set_merges_and_persists() {
    let t = default_env();

    commands::execute_profile_set_command(&t.env, Some("fr".into()), None, Some(3), None).unwrap();
    commands::execute_profile_set_command(&t.env, None, Some("FR".into()), None, None).unwrap();
    commands::execute_profile_show_command(&t.env).unwrap();

    let profile = t.env.profile_store().get("tester").unwrap().unwrap();
    assert_eq!(profile.language.as_deref(), Some("fr"));
    assert_eq!(profile.country.as_deref(), Some("FR"));
    assert_eq!(profile.research_depth, Some(3));
    assert_eq!(
        t.env.profile_store().path().parent(),
        t.state_path().parent(),
        "profiles live next to the workflow state"
    );
}

#[test]
fn test_edit_article_updates_saved_article() {
    let t = default_env();
    snapshot::save(t.state_path(), &generated_context()).unwrap();
    let content = t.state_path().with_file_name("article.html");
    std::fs::write(&content, "<h1>Compost Bins, Revisited</h1>").unwrap();

    let edits = commands::ArticleEdits {
        title: Some("Compost Bins, Revisited".into()),
        content: Some(content.into_std_path_buf()),
        clear_humanized: true,
        meta_description: Some("  ".into()),
        ..commands::ArticleEdits::default()
    };
    commands::execute_edit_article_command(&t.env, &edits).unwrap();

    let ctx = snapshot::load(t.state_path()).unwrap().context;
    let article = ctx.article().unwrap();
    assert_eq!(article.title, "Compost Bins, Revisited");
    assert_eq!(article.content, "<h1>Compost Bins, Revisited</h1>");
    assert_eq!(article.humanized_content, None);
    assert_eq!(article.meta_description, None);
    assert_eq!(article.preferred_content(), article.content);
    assert_eq!(ctx.current_step(), StepId::Generated);
}

#[test]
fn test_edit_article_errors_are_user_input() {
    let t = default_env();
    let title = commands::ArticleEdits {
        title: Some("New".into()),
        ..commands::ArticleEdits::default()
    };

    snapshot::save(t.state_path(), &clustered_context()).unwrap();
    let err = commands::execute_edit_article_command(&t.env, &title).unwrap_err();
    assert!(matches!(workflow_error(&err), WorkflowError::UserInput(_)));

    snapshot::save(t.state_path(), &generated_context()).unwrap();
    let err = commands::execute_edit_article_command(&t.env, &commands::ArticleEdits::default())
        .unwrap_err();
    assert!(matches!(workflow_error(&err), WorkflowError::UserInput(_)));

    let missing = commands::ArticleEdits {
        content: Some(t.state_path().with_file_name("missing.html").into_std_path_buf()),
        ..commands::ArticleEdits::default()
    };
    let err = commands::execute_edit_article_command(&t.env, &missing).unwrap_err();
    assert!(matches!(workflow_error(&err), WorkflowError::UserInput(_)));

    let reloaded = snapshot::load(t.state_path()).unwrap().context;
    assert_eq!(reloaded.article(), generated_context().article());
}

#[tokio::test]
async fn test_research_command_uses_profile_and_saves_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "originalKeyword": "sustainable gardening",
            "language": "fr",
            "userId": "tester",
            "sessionId": "sess-cli"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "executionId": "exec-1",
            "data": [{"historicalSearchData": [
                {"keyword": "jardinage durable", "searchVolume": 900}
            ]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config::builder()
        .endpoint(Stage::KeywordResearch, server.uri())
        .build()
        .unwrap();
    let t = test_env(config);
    commands::execute_profile_set_command(&t.env, Some("fr".into()), None, None, None).unwrap();

    let input = contentflow_engine::ResearchInput::new("sustainable gardening");
    commands::execute_research_command(&t.env, input).await.unwrap();

    let ctx = snapshot::load(t.state_path()).unwrap().context;
    assert_eq!(ctx.current_step(), StepId::SelectKeywords);
    assert_eq!(ctx.research().unwrap().keywords(), vec!["jardinage durable"]);
}

#[tokio::test]
async fn test_failed_stage_still_saves_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "started"})))
        .mount(&server)
        .await;

    let config = Config::builder()
        .endpoint(Stage::KeywordResearch, server.uri())
        .max_retries(0)
        .build()
        .unwrap();
    let t = test_env(config);

    let err = commands::execute_research_command(
        &t.env,
        contentflow_engine::ResearchInput::new("sustainable gardening"),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        workflow_error(&err),
        WorkflowError::InvalidResponseShape { .. }
    ));
    let ctx = snapshot::load(t.state_path()).unwrap().context;
    assert_eq!(ctx.current_step(), StepId::Keyword);
    assert!(ctx.last_error().is_some());
}

#[tokio::test]
async fn test_interrupt_before_call_starts_is_not_latched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [{"historicalSearchData": [{"keyword": "k"}]}]}))
                .set_delay(std::time::Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    let config = Config::builder()
        .endpoint(Stage::KeywordResearch, server.uri())
        .build()
        .unwrap();
    let t = test_env(config);
    let runner = t.env.runner().unwrap();

    // Nothing is in flight yet, so the signal must stay armed.
    assert!(!commands::cancel_on_signal(&runner, Stage::KeywordResearch, true));

    let handle = contentflow_engine::workflow_handle(t.env.load_context().unwrap());
    let input = contentflow_engine::ResearchInput::new("sustainable gardening");
    let defaults = contentflow_engine::ResearchDefaults::resolve(None, &t.env.config.profile);
    let call = runner.research(&handle, &input, &defaults);
    let interrupt = async {
        while !runner.is_busy(Stage::KeywordResearch) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(!commands::cancel_on_signal(&runner, Stage::KeywordResearch, false));
        commands::cancel_on_signal(&runner, Stage::KeywordResearch, true)
    };
    let (result, cancelled) = tokio::join!(call, interrupt);

    assert!(cancelled);
    assert!(matches!(result, Err(WorkflowError::Aborted { .. })));
}

#[tokio::test]
async fn test_missing_endpoint_is_misconfiguration() {
    let t = default_env();
    let err = commands::execute_research_command(
        &t.env,
        contentflow_engine::ResearchInput::new("compost"),
    )
    .await
    .unwrap_err();

    assert!(matches!(workflow_error(&err), WorkflowError::Misconfiguration(_)));
}
