//! `shell` and `python`: general-purpose automation
//!
//! Both produce a JSON payload that may carry directives:
//!
//! | key      | value                 | effect                                  |
//! |----------|-----------------------|-----------------------------------------|
//! | `inject` | string                | context injection (allow-listed events) |
//! | `warn`   | string                | system message                          |
//! | `allow`  | `true`                | allow decision                          |
//! | `deny`   | `true` or reason text | deny decision and the block signal      |
//!
//! Output that is not a JSON object is handled as plain text according to
//! the action's `stdout` mode.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{permission, process, ActionEnv, ActionError};
use crate::engine::action::{ActionConfig, OutputMode, StdinMode};
use crate::engine::outputs::OutputAccumulator;

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn route_text(
    env: &ActionEnv<'_>,
    mode: OutputMode,
    stream: Stream,
    text: &str,
    accumulator: &mut OutputAccumulator,
) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match (mode, stream) {
        (OutputMode::Ignore, _) => {}
        (OutputMode::Log, Stream::Stdout) => {
            info!(rule_id = %env.rule.id, stream = "stdout", "{}", text)
        }
        (OutputMode::Log, Stream::Stderr) => {
            warn!(rule_id = %env.rule.id, stream = "stderr", "{}", text)
        }
        (OutputMode::AppendToStdout, _) => accumulator.add_system_message(text),
    }
}

/// Interpret a result text: JSON objects are directive payloads, anything
/// else follows the stdout mode
fn handle_output(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    text: &str,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(payload)) => apply_directives(env, action, &payload, accumulator),
        _ => {
            let mode = action.stdout.unwrap_or(OutputMode::Log);
            route_text(env, mode, Stream::Stdout, text, accumulator);
            Ok(())
        }
    }
}

pub(super) fn apply_directives(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    payload: &Map<String, Value>,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let event = env.context.hook_event_type;

    if let Some(content) = payload.get("inject").and_then(Value::as_str) {
        if event.supports_context_injection() {
            accumulator.add_context(content);
        } else {
            warn!(
                rule_id = %env.rule.id,
                hook_type = %event,
                "inject directive is not supported for this event, skipping"
            );
        }
    }

    if let Some(message) = payload.get("warn").and_then(Value::as_str) {
        accumulator.add_system_message(message);
    }

    let allow = payload.get("allow").and_then(Value::as_bool) == Some(true);
    let deny_reason = match payload.get("deny") {
        Some(Value::Bool(true)) => Some(env.default_block_reason()),
        Some(Value::String(reason)) if reason.trim().is_empty() => Some(env.default_block_reason()),
        Some(Value::String(reason)) => Some(reason.clone()),
        _ => None,
    };

    if let Some(reason) = deny_reason {
        if allow {
            warn!(
                rule_id = %env.rule.id,
                "Automation returned both allow and deny, deny takes precedence"
            );
        }
        return Err(permission::block(env, reason, action.interrupt, accumulator));
    }
    if allow {
        permission::grant(env, None, accumulator);
    }
    Ok(())
}

pub(super) async fn run_shell(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let output = process::run(env, action, StdinMode::None).await?;

    let stderr_mode = action.stderr.unwrap_or(OutputMode::Log);
    route_text(env, stderr_mode, Stream::Stderr, &output.stderr, accumulator);

    if !output.status.success() {
        return Err(ActionError::Execution(match output.status.code() {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }));
    }
    handle_output(env, action, &output.stdout, accumulator)
}

pub(super) async fn run_python(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let entrypoint = action
        .entrypoint
        .as_deref()
        .ok_or_else(|| ActionError::InvalidConfig("python action requires 'entrypoint'".into()))?;
    let timeout = env.settings.timeout(action.timeout_ms);

    let result = env
        .entrypoints
        .invoke(entrypoint, Value::Object(env.eval_context.clone()), timeout)
        .await?;

    match result {
        Value::Object(payload) => apply_directives(env, action, &payload, accumulator),
        Value::String(text) => handle_output(env, action, &text, accumulator),
        Value::Null => Ok(()),
        other => {
            debug!(rule_id = %env.rule.id, entrypoint, "Ignoring non-directive result {}", other);
            Ok(())
        }
    }
}
