//! `transform`: let a script or callable rewrite the tool input
//!
//! The producer answers with `{"transform_input": {...}}`; the inner object
//! is merged key by key into the accumulated input updates. Anything else is
//! logged and dropped.

use serde_json::Value;
use tracing::{debug, warn};

use super::{process, ActionEnv, ActionError};
use crate::engine::action::{ActionConfig, StdinMode};
use crate::engine::outputs::OutputAccumulator;

enum Producer<'a> {
    Entrypoint(&'a str),
    Process,
}

fn producer<'a>(env: &ActionEnv<'_>, action: &'a ActionConfig) -> Result<Producer<'a>, ActionError> {
    let has_process = action.command.is_some() || action.script.is_some();
    match action.entrypoint.as_deref() {
        Some(entrypoint) => {
            if has_process {
                warn!(
                    rule_id = %env.rule.id,
                    "transform has both an entrypoint and a command, using the entrypoint"
                );
            }
            Ok(Producer::Entrypoint(entrypoint))
        }
        None if has_process => Ok(Producer::Process),
        None => Err(ActionError::InvalidConfig(
            "transform action requires 'entrypoint', 'command' or 'script'".into(),
        )),
    }
}

pub(super) async fn run(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let event = env.context.hook_event_type;
    if !event.supports_input_mutation() {
        warn!(
            rule_id = %env.rule.id,
            hook_type = %event,
            "transform is not supported for this event, skipping"
        );
        return Ok(());
    }

    let payload = match producer(env, action)? {
        Producer::Entrypoint(entrypoint) => {
            let timeout = env.settings.timeout(action.timeout_ms);
            env.entrypoints
                .invoke(entrypoint, Value::Object(env.eval_context.clone()), timeout)
                .await?
        }
        Producer::Process => {
            let output = process::run(env, action, StdinMode::Json).await?;
            if !output.status.success() {
                return Err(ActionError::Execution(format!(
                    "transform exited with {}: {}",
                    output.status,
                    output.stderr.trim()
                )));
            }
            match serde_json::from_str::<Value>(output.stdout.trim()) {
                Ok(value) => value,
                Err(e) => {
                    warn!(rule_id = %env.rule.id, "transform output is not JSON: {}", e);
                    return Ok(());
                }
            }
        }
    };

    let Value::Object(mut payload) = payload else {
        warn!(rule_id = %env.rule.id, "transform output is not a JSON object, ignoring");
        return Ok(());
    };
    match payload.remove("transform_input") {
        Some(Value::Object(fields)) => {
            debug!(
                rule_id = %env.rule.id,
                fields = fields.len(),
                "Merging transformed input"
            );
            accumulator.merge_updated_input(fields);
        }
        Some(_) => warn!(rule_id = %env.rule.id, "transform_input is not an object, ignoring"),
        None => warn!(rule_id = %env.rule.id, "transform output has no transform_input"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::engine::action::ActionKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn transform(command: &str) -> ActionConfig {
        ActionConfig::new(ActionKind::Transform).with_command(command)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transform_merges_input() {
        let fixture = Fixture::pre_tool_use("rm -rf build");
        let mut acc = OutputAccumulator::new();
        acc.update_input_field("description", json!("cleanup"));

        let action = transform(r#"echo '{"transform_input": {"command": "ls"}}'"#);
        run(&fixture.env(), &action, &mut acc).await.unwrap();

        assert_eq!(
            Value::Object(acc.updated_input),
            json!({"description": "cleanup", "command": "ls"})
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transform_reads_context_from_stdin() {
        let fixture = Fixture::pre_tool_use("npm test");
        let mut acc = OutputAccumulator::new();
        let action = transform(
            r#"grep -q '"command":"npm test"' && echo '{"transform_input": {"command": "pnpm test"}}'"#,
        );
        run(&fixture.env(), &action, &mut acc).await.unwrap();
        assert_eq!(acc.updated_input["command"], "pnpm test");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transform_bad_output_is_ignored() {
        let fixture = Fixture::pre_tool_use("ls");
        let mut acc = OutputAccumulator::new();
        for command in [
            "echo not json",
            "echo '[1, 2]'",
            r#"echo '{"transform_input": "ls"}'"#,
            r#"echo '{"other": 1}'"#,
        ] {
            run(&fixture.env(), &transform(command), &mut acc).await.unwrap();
        }
        assert!(acc.updated_input.is_empty());
    }

    #[tokio::test]
    async fn test_transform_entrypoint_wins() {
        let mut fixture = Fixture::pre_tool_use("cargo build");
        fixture
            .entrypoints
            .register("rewrite.cargo:release", |ctx| {
                let command = ctx["tool_input"]["command"].as_str().unwrap_or_default();
                Ok(json!({"transform_input": {"command": format!("{command} --release")}}))
            })
            .unwrap();

        let action = transform("exit 1").with_entrypoint("rewrite.cargo:release");
        let mut acc = OutputAccumulator::new();
        run(&fixture.env(), &action, &mut acc).await.unwrap();
        assert_eq!(acc.updated_input["command"], "cargo build --release");
    }

    #[tokio::test]
    async fn test_transform_unsupported_event_and_missing_producer() {
        let fixture = Fixture::new(json!({
            "hook_event_name": "PostToolUse",
            "session_id": "s",
            "tool_name": "Bash",
            "tool_input": {"command": "ls"}
        }));
        let mut acc = OutputAccumulator::new();
        run(&fixture.env(), &transform("echo '{}'"), &mut acc).await.unwrap();
        assert!(acc.updated_input.is_empty());

        let fixture = Fixture::pre_tool_use("ls");
        let err = run(&fixture.env(), &ActionConfig::new(ActionKind::Transform), &mut acc)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidConfig(_)));
    }
}
