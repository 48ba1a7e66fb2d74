//! Integration tests for the FlowPilot CLI
//!
//! These run the actual binary and verify output. Everything executes
//! against the mock engine inside a temp workspace.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn flowpilot_cmd(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("flowpilot").unwrap();
    cmd.current_dir(workspace.path());
    cmd.args(["--engine", "mock"]);
    cmd
}

fn write_flow(workspace: &TempDir, name: &str, contents: &str) -> String {
    let path = workspace.path().join(name);
    fs::write(&path, contents).unwrap();
    name.to_string()
}

const DEMO_FLOW: &str = r#"{
  "flow_name": "Demo",
  "browser": "chrome",
  "steps": [
    { "action": "open_browser", "url": "https://example.com" },
    { "action": "click", "locator": "id=go" },
    { "action": "wait", "seconds": 2 }
  ]
}"#;

#[test]
fn test_help_flag() {
    let workspace = TempDir::new().unwrap();
    flowpilot_cmd(&workspace)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "browser-flow automation runner and scheduler",
        ));
}

#[test]
fn test_validate_valid_flow() {
    let workspace = TempDir::new().unwrap();
    let file = write_flow(&workspace, "demo.json", DEMO_FLOW);

    flowpilot_cmd(&workspace)
        .args(["validate", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Flow 'Demo' is valid"))
        .stdout(predicate::str::contains("Steps: 3"));
}

#[test]
fn test_validate_reports_missing_param_with_fix() {
    let workspace = TempDir::new().unwrap();
    let file = write_flow(
        &workspace,
        "bad.json",
        r#"{ "flow_name": "Bad", "steps": [ { "action": "input_text", "locator": "id=q" } ] }"#,
    );

    flowpilot_cmd(&workspace)
        .args(["validate", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input_text"))
        .stderr(predicate::str::contains("text"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_validate_unknown_action_names_step() {
    let workspace = TempDir::new().unwrap();
    let file = write_flow(
        &workspace,
        "bad.yaml",
        "flow_name: Bad\nsteps:\n  - action: teleport\n",
    );

    flowpilot_cmd(&workspace)
        .args(["validate", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action 'teleport'"));
}

#[test]
fn test_compile_writes_script() {
    let workspace = TempDir::new().unwrap();
    let file = write_flow(&workspace, "demo.json", DEMO_FLOW);

    flowpilot_cmd(&workspace)
        .args(["compile", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiled to"));

    let script = fs::read_dir(workspace.path().join("logs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().ends_with(".robot"))
        .expect("compiled script in logs/");
    let text = fs::read_to_string(script.path()).unwrap();
    assert!(text.contains("Suite Teardown    Close All Browsers"));
}

#[test]
fn test_run_against_mock_engine() {
    let workspace = TempDir::new().unwrap();
    let file = write_flow(&workspace, "demo.json", DEMO_FLOW);

    flowpilot_cmd(&workspace)
        .args(["run", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting flow execution"))
        .stdout(predicate::str::contains("1 passed, 0 failed"));
}

#[test]
fn test_init_then_run_sample_flow() {
    let workspace = TempDir::new().unwrap();

    flowpilot_cmd(&workspace)
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("resources/keywords.robot"));

    flowpilot_cmd(&workspace)
        .args(["run", "flows/sample_flow.json"])
        .assert()
        .success();
}

#[test]
fn test_flow_new_and_list() {
    let workspace = TempDir::new().unwrap();

    flowpilot_cmd(&workspace)
        .args(["flow", "new", "Smoke Test", "--description", "nightly smoke"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Smoke_Test.json"));

    flowpilot_cmd(&workspace)
        .args(["flow", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Smoke Test"))
        .stdout(predicate::str::contains("0 steps"));
}

#[test]
fn test_schedule_add_list_remove() {
    let workspace = TempDir::new().unwrap();
    write_flow(&workspace, "demo.json", DEMO_FLOW);

    flowpilot_cmd(&workspace)
        .args([
            "schedule", "add", "nightly", "demo.json",
            "--kind", "interval",
            "--params", r#"{"minutes": 5}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task 'nightly' added"));

    // Duplicate id fails without clobbering the registry
    flowpilot_cmd(&workspace)
        .args([
            "schedule", "add", "nightly", "other.json",
            "--kind", "interval",
            "--params", r#"{"minutes": 1}"#,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    flowpilot_cmd(&workspace)
        .args(["schedule", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nightly"))
        .stdout(predicate::str::contains("demo.json"));

    flowpilot_cmd(&workspace)
        .args(["schedule", "remove", "nightly"])
        .assert()
        .success();

    flowpilot_cmd(&workspace)
        .args(["schedule", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No scheduled tasks"));
}

#[test]
fn test_schedule_rejects_unknown_trigger_kind() {
    let workspace = TempDir::new().unwrap();
    write_flow(&workspace, "demo.json", DEMO_FLOW);

    flowpilot_cmd(&workspace)
        .args([
            "schedule", "add", "t1", "demo.json",
            "--kind", "weekly",
            "--params", "{}",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown trigger kind"));
}

#[test]
fn test_schedule_disable_persists() {
    let workspace = TempDir::new().unwrap();
    write_flow(&workspace, "demo.json", DEMO_FLOW);

    flowpilot_cmd(&workspace)
        .args([
            "schedule", "add", "t1", "demo.json",
            "--kind", "cron",
            "--params", r#"{"expression": "0 8 * * *"}"#,
        ])
        .assert()
        .success();

    flowpilot_cmd(&workspace)
        .args(["schedule", "disable", "t1"])
        .assert()
        .success();

    flowpilot_cmd(&workspace)
        .args(["schedule", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));
}
