//! Raw hook JSON in, hook response JSON out

mod common;

use common::{init_test_logging, rules};
use hookwise_core::harness::ClaudeHarness;
use hookwise_core::{Engine, HookContext};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const RULES: &str = r#"
[[rules]]
id = "protect-env"
priority = "critical"
events = ["pre_tool_use"]
condition = 'tool_name in ["Edit", "Write"] and tool_input.file_path matches "*.env"'
actions = [{ type = "deny", message = "Editing ${tool_input.file_path} is not allowed" }]

[[rules]]
id = "quiet-tests"
events = ["pre_tool_use"]
condition = 'tool_name == "Bash" and tool_input.command =~ "^npm test"'
actions = [
    { type = "allow", message = "tests are safe" },
    { type = "modify", field = "command", operation = "append", value = " --silent" },
]

[[rules]]
id = "stop-check"
events = ["stop"]
result = "block"
description = "Run the test suite before stopping"
"#;

async fn respond(raw: Value) -> Value {
    init_test_logging();
    let engine = Engine::from_rule_set(rules(RULES));
    let event = ClaudeHarness::parse_event(&raw.to_string()).unwrap();
    let context = HookContext::from_event(event.clone());
    let outcome = engine.evaluate(&context).await;
    ClaudeHarness::format_response(&event, &outcome).unwrap()
}

#[tokio::test]
async fn test_pre_tool_use_deny_response() {
    let response = respond(json!({
        "hook_event_name": "PreToolUse",
        "session_id": "s",
        "tool_name": "Edit",
        "tool_input": {"file_path": "config/.env", "old_string": "a", "new_string": "b"}
    }))
    .await;

    assert_eq!(
        response,
        json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": "deny",
                "permissionDecisionReason": "Editing config/.env is not allowed"
            }
        })
    );
}

#[tokio::test]
async fn test_pre_tool_use_allow_with_updated_input() {
    let response = respond(json!({
        "hook_event_name": "PreToolUse",
        "session_id": "s",
        "tool_name": "Bash",
        "tool_input": {"command": "npm test", "description": "run tests"}
    }))
    .await;

    assert_eq!(
        response,
        json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": "allow",
                "permissionDecisionReason": "tests are safe",
                "updatedInput": {"command": "npm test --silent", "description": "run tests"}
            }
        })
    );
}

#[tokio::test]
async fn test_stop_block_response() {
    let response = respond(json!({
        "hook_event_name": "Stop",
        "session_id": "s",
        "stop_hook_active": false
    }))
    .await;

    assert_eq!(
        response,
        json!({"decision": "block", "reason": "Run the test suite before stopping"})
    );
}

#[tokio::test]
async fn test_unmatched_event_is_empty() {
    let response = respond(json!({
        "hook_event_name": "Notification",
        "session_id": "s",
        "message": "Claude needs your permission"
    }))
    .await;
    assert_eq!(response, json!({}));
}
