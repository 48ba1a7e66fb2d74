//! Integration tests for the execution pipeline against the mock engine

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use flowpilot::engine::MockEngine;
use flowpilot::error::{FlowError, ValidationError};
use flowpilot::flow::{Flow, Step};
use flowpilot::status::StatusKind;
use flowpilot::FlowExecutor;

fn demo_flow() -> Flow {
    Flow {
        steps: vec![
            Step::new("open_browser").with_param("url", "https://example.com"),
            Step::new("click").with_param("locator", "id=go"),
            Step::new("wait").with_param("seconds", 2),
        ],
        ..Flow::empty("Demo")
    }
}

fn executor_with(engine: Arc<MockEngine>, dir: &TempDir) -> FlowExecutor {
    FlowExecutor::new(
        engine,
        dir.path().join("logs"),
        dir.path().join("resources/keywords.robot"),
    )
}

#[tokio::test]
async fn passing_run_uses_return_code_fallback() {
    let dir = TempDir::new().unwrap();
    // Mock returns code 0 with no native statistics object
    let executor = executor_with(Arc::new(MockEngine::new()), &dir);

    let result = executor.execute(&demo_flow()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.return_code, 0);
    assert_eq!(result.statistics.total, 1);
    assert_eq!(result.statistics.passed, 1);
    assert_eq!(result.statistics.failed, 0);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn script_is_written_with_one_directive_per_step() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(Arc::new(MockEngine::new()), &dir);

    let result = executor.execute(&demo_flow()).await.unwrap();

    let script_path = result.artifacts.script.expect("script artifact");
    let text = std::fs::read_to_string(&script_path).unwrap();
    let body: Vec<&str> = text
        .lines()
        .skip_while(|l| *l != "*** Test Cases ***")
        .skip(3)
        .collect();
    assert_eq!(body.len(), 3);
    assert!(body[0].contains("Open Flow Browser"));
    assert!(body[1].contains("Safe Click Element"));
    assert!(body[2].contains("Sleep    2s"));
}

#[tokio::test]
async fn native_statistics_win_over_fallback() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new()
        .with_return_code(1)
        .with_stats(json!({ "statistics": { "total": 4, "passed": 3, "failed": 1 } }));
    let executor = executor_with(Arc::new(engine), &dir);

    let result = executor.execute(&demo_flow()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.statistics.total, 4);
    assert_eq!(result.statistics.passed, 3);
    assert_eq!(result.statistics.failed, 1);
}

#[tokio::test]
async fn validation_failure_is_synchronous_and_blocks_the_run() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(MockEngine::new());
    let executor = executor_with(Arc::clone(&engine), &dir);

    let bad = Flow {
        steps: vec![Step::new("input_text").with_param("locator", "id=q")],
        ..Flow::empty("Bad")
    };

    let err = executor.execute(&bad).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::Validation(ValidationError::MissingActionParam { step: 0, .. })
    ));
    // Fail fast: nothing reached the engine, nothing was written
    assert!(engine.runs().is_empty());
    assert!(!dir.path().join("logs").exists());
}

#[tokio::test]
async fn engine_failure_is_absorbed_into_the_result() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(Arc::new(MockEngine::new().failing("engine exploded")), &dir);

    let result = executor.execute(&demo_flow()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.execution_time_seconds, 0.0);
    assert!(result.error.as_deref().unwrap().contains("engine exploded"));
    // The compiled script artifact survives the failure
    assert!(result.artifacts.script.is_some());

    let errors = executor.status().filter_kind(StatusKind::Error);
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn events_follow_pipeline_order_with_single_terminal() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(Arc::new(MockEngine::new()), &dir);

    executor.execute(&demo_flow()).await.unwrap();

    let events = executor.status().events();
    let kinds: Vec<StatusKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![StatusKind::Info, StatusKind::Info, StatusKind::Success]
    );
    assert!(events[0].message.contains("Generated test script"));
    assert!(events[1].message.contains("Starting flow execution"));
}

#[tokio::test]
async fn degraded_step_warns_but_still_runs() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(Arc::new(MockEngine::new()), &dir);

    let flow = Flow {
        steps: vec![
            Step::new("open_browser").with_param("url", "https://example.com"),
            // No validator entry for execute_javascript: reaches the
            // compiler without its script and degrades there
            Step::new("execute_javascript"),
        ],
        ..Flow::empty("Degraded")
    };

    let result = executor.execute(&flow).await.unwrap();
    assert!(result.success);

    let warnings = executor.status().filter_kind(StatusKind::Warning);
    assert_eq!(warnings.len(), 1);

    let text = std::fs::read_to_string(result.artifacts.script.unwrap()).unwrap();
    assert!(text.contains("Log    Step 2 misconfigured"));
}

#[tokio::test]
async fn stop_request_aborts_before_engine_start() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(MockEngine::new());
    let executor = executor_with(Arc::clone(&engine), &dir);

    executor.request_stop();
    let result = executor.execute(&demo_flow()).await.unwrap();

    assert!(!result.success);
    assert!(engine.runs().is_empty());
}

#[tokio::test]
async fn execute_from_file_surfaces_parse_errors() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(Arc::new(MockEngine::new()), &dir);

    let err = executor
        .execute_from_file(dir.path().join("missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::FileNotFound(_)));
}

#[tokio::test]
async fn execute_from_file_runs_a_parsed_flow() {
    let dir = TempDir::new().unwrap();
    let flow_path = dir.path().join("demo.yaml");
    std::fs::write(
        &flow_path,
        r#"
flow_name: FromFile
browser: firefox
steps:
  - action: open_browser
    url: https://example.com
  - action: search
    search_box_locator: id=q
    search_text: flowpilot
    search_button_locator: id=s
"#,
    )
    .unwrap();

    let executor = executor_with(Arc::new(MockEngine::new()), &dir);
    let result = executor.execute_from_file(&flow_path).await.unwrap();

    assert!(result.success);
    let text = std::fs::read_to_string(result.artifacts.script.unwrap()).unwrap();
    assert!(text.contains("${BROWSER}        firefox"));
    assert!(text.contains("Perform Search    id=q    flowpilot    id=s"));
}
