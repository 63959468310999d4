//! Integration tests for the hookwise binary

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const RULES: &str = r#"
[[rules]]
id = "block-rm-rf"
priority = "critical"
events = ["pre_tool_use"]
condition = 'tool_name == "Bash" and "rm -rf" in tool_input.command'
actions = [{ type = "deny", message = "Refusing: ${tool_input.command}" }]

[[rules]]
id = "note-prompt"
events = ["user_prompt_submit"]
condition = '$session_get("mode") == "strict"'
actions = [{ type = "inject", content = "Strict mode is on." }]
"#;

fn write_rules(dir: &Path) -> PathBuf {
    let path = dir.join("rules.toml");
    fs::write(&path, RULES).unwrap();
    path
}

/// Run hookwise with `stdin` piped in
fn run_hookwise(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_hookwise"))
        .args(args)
        .env_remove("HOOKWISE_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run hookwise");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().expect("Failed to wait for hookwise")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn bash_event(command: &str) -> String {
    json!({
        "hook_event_name": "PreToolUse",
        "session_id": "cli-session",
        "tool_name": "Bash",
        "tool_input": {"command": command}
    })
    .to_string()
}

#[test]
fn test_eval_denies_destructive_command() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path());

    let output = run_hookwise(
        &["eval", "--rules", rules.to_str().unwrap()],
        &bash_event("rm -rf /"),
    );

    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": "deny",
                "permissionDecisionReason": "Refusing: rm -rf /"
            }
        })
    );
}

#[test]
fn test_eval_uses_state_file() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path());
    let state = dir.path().join("state.json");
    fs::write(
        &state,
        json!({"sessions": {"cli-session": {"mode": "strict"}}}).to_string(),
    )
    .unwrap();

    let event = json!({
        "hook_event_name": "UserPromptSubmit",
        "session_id": "cli-session",
        "prompt": "hello"
    })
    .to_string();
    let output = run_hookwise(
        &[
            "eval",
            "--rules",
            rules.to_str().unwrap(),
            "--state",
            state.to_str().unwrap(),
        ],
        &event,
    );

    assert_eq!(
        stdout_json(&output),
        json!({
            "hookSpecificOutput": {
                "hookEventName": "UserPromptSubmit",
                "additionalContext": "Strict mode is on."
            }
        })
    );
}

#[test]
fn test_eval_bad_input_prints_empty_response() {
    let output = run_hookwise(&["eval"], "not json");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({}));

    let output = run_hookwise(&["eval", "--strict"], "not json");
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output), json!({}));
}

#[test]
fn test_eval_missing_rules_file_fails() {
    let output = run_hookwise(&["eval", "--rules", "/nonexistent/rules.toml"], &bash_event("ls"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load rules"));
}

#[test]
fn test_validate_reports_syntax_errors() {
    let output = run_hookwise(&["validate", r#"tool_name == "Bash""#], "");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["valid"], json!(true));

    let output = run_hookwise(&["validate", "tool_name =="], "");
    assert!(!output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["valid"], json!(false));
    assert_eq!(report["error_kind"], json!("syntax"));
}

#[test]
fn test_rules_list() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path());

    let output = run_hookwise(&["rules", "list", "--rules", rules.to_str().unwrap()], "");
    assert!(output.status.success());

    let listed = stdout_json(&output);
    let ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["block-rm-rf", "note-prompt"]);
    assert_eq!(listed[0]["priority"], json!("critical"));
    assert_eq!(listed[0]["events"], json!(["pre_tool_use"]));
}

#[test]
fn test_simulate_single_rule() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path());

    let output = run_hookwise(
        &[
            "simulate",
            "--rules",
            rules.to_str().unwrap(),
            "--rule",
            "block-rm-rf",
        ],
        &bash_event("rm -rf target"),
    );
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["trace"][0]["trail"]["verdict"], json!("matched"));
    assert_eq!(report["outcome"]["matched_rule_ids"], json!(["block-rm-rf"]));
    assert_eq!(
        report["outcome"]["blocked"]["reason"],
        json!("Refusing: rm -rf target")
    );
    assert_eq!(
        report["outcome"]["partial"]["rules"][0]["actions"][0],
        json!({"action_type": "deny", "success": true})
    );

    let output = run_hookwise(
        &["simulate", "--rules", rules.to_str().unwrap(), "--rule", "missing"],
        &bash_event("ls"),
    );
    assert!(!output.status.success());
}

#[test]
fn test_rules_test_traces_every_rule() {
    let dir = TempDir::new().unwrap();
    let rules = write_rules(dir.path());
    let event = dir.path().join("event.json");
    fs::write(&event, bash_event("ls")).unwrap();

    let output = run_hookwise(
        &[
            "rules",
            "test",
            "--rules",
            rules.to_str().unwrap(),
            "--event",
            event.to_str().unwrap(),
        ],
        "",
    );
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["trace"][0]["trail"]["verdict"], json!("condition_false"));
    assert_eq!(report["trace"][1]["trail"]["verdict"], json!("event_mismatch"));
    assert_eq!(report["outcome"]["matched_rule_ids"], json!([]));
}
