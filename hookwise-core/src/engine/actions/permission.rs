//! `deny` and `allow`

use tracing::{debug, info};

use super::{ActionEnv, ActionError, BlockHook};
use crate::engine::action::ActionConfig;
use crate::engine::outputs::{OutputAccumulator, PermissionDecision, PermissionRequestDecision};

/// Record a deny decision on whichever permission channel the event has and
/// produce the block signal
pub(super) fn block(
    env: &ActionEnv<'_>,
    reason: String,
    interrupt: bool,
    accumulator: &mut OutputAccumulator,
) -> ActionError {
    let event = env.context.hook_event_type;
    if event.supports_permission_decision() {
        accumulator.set_permission(PermissionDecision::Deny, Some(reason.clone()));
    } else if event.is_permission_request() {
        accumulator.permission_request_decision =
            Some(PermissionRequestDecision::deny(reason.clone(), interrupt));
    }

    info!(rule_id = %env.rule.id, hook_type = %event, "Blocking: {}", reason);
    ActionError::Blocked(BlockHook {
        reason,
        rule_id: env.rule.id.clone(),
    })
}

/// Record an allow decision; events without a permission channel ignore it
pub(super) fn grant(env: &ActionEnv<'_>, reason: Option<String>, accumulator: &mut OutputAccumulator) {
    let event = env.context.hook_event_type;
    if event.supports_permission_decision() {
        accumulator.set_permission(PermissionDecision::Allow, reason);
    } else if event.is_permission_request() {
        accumulator.permission_request_decision = Some(PermissionRequestDecision::allow());
    } else {
        debug!(rule_id = %env.rule.id, hook_type = %event, "allow has no effect on this event");
    }
}

pub(super) fn deny(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let reason = action
        .text()
        .map(|message| env.render(message))
        .unwrap_or_else(|| env.default_block_reason());
    Err(block(env, reason, action.interrupt, accumulator))
}

pub(super) fn allow(env: &ActionEnv<'_>, action: &ActionConfig, accumulator: &mut OutputAccumulator) {
    let reason = action.text().map(|message| env.render(message));
    grant(env, reason, accumulator);
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::engine::action::ActionKind;
    use crate::engine::outputs::PermissionBehavior;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn permission_request() -> Fixture {
        Fixture::new(json!({
            "hook_event_name": "PermissionRequest",
            "session_id": "s",
            "tool_name": "Bash",
            "tool_input": {"command": "rm -rf /"}
        }))
    }

    #[test]
    fn test_deny_on_pre_tool_use() {
        let fixture = Fixture::pre_tool_use("rm -rf /tmp/x");
        let mut acc = OutputAccumulator::new();
        let action =
            ActionConfig::new(ActionKind::Deny).with_message("Refusing: ${tool_input.command}");

        let err = deny(&fixture.env(), &action, &mut acc).unwrap_err();
        let ActionError::Blocked(block) = err else {
            panic!("expected block, got {err:?}");
        };
        assert_eq!(block.reason, "Refusing: rm -rf /tmp/x");
        assert_eq!(block.rule_id, "test-rule");
        assert_eq!(acc.permission_decision, Some(PermissionDecision::Deny));
        assert_eq!(
            acc.permission_decision_reason.as_deref(),
            Some("Refusing: rm -rf /tmp/x")
        );
        assert_eq!(acc.permission_request_decision, None);
    }

    #[test]
    fn test_deny_on_permission_request_uses_nested_decision() {
        let fixture = permission_request();
        let mut acc = OutputAccumulator::new();
        let mut action = ActionConfig::new(ActionKind::Deny).with_message("no");
        action.interrupt = true;

        assert!(deny(&fixture.env(), &action, &mut acc).unwrap_err().is_block());
        let decision = acc.permission_request_decision.unwrap();
        assert_eq!(decision.behavior, PermissionBehavior::Deny);
        assert_eq!(decision.message.as_deref(), Some("no"));
        assert!(decision.interrupt);
        assert_eq!(acc.permission_decision, None);
    }

    #[test]
    fn test_deny_without_permission_channel_still_blocks() {
        let fixture = Fixture::new(json!({
            "hook_event_name": "UserPromptSubmit",
            "session_id": "s",
            "prompt": "deploy to prod"
        }));
        let mut acc = OutputAccumulator::new();
        let err = deny(&fixture.env(), &ActionConfig::new(ActionKind::Deny), &mut acc).unwrap_err();

        let ActionError::Blocked(block) = err else {
            panic!("expected block");
        };
        assert_eq!(block.reason, "Blocked by rule 'test-rule'");
        assert_eq!(acc, OutputAccumulator::new());
    }

    #[test]
    fn test_allow_per_event() {
        let fixture = Fixture::pre_tool_use("ls");
        let mut acc = OutputAccumulator::new();
        allow(
            &fixture.env(),
            &ActionConfig::new(ActionKind::Allow).with_message("safe"),
            &mut acc,
        );
        assert_eq!(acc.permission_decision, Some(PermissionDecision::Allow));
        assert_eq!(acc.permission_decision_reason.as_deref(), Some("safe"));

        let fixture = permission_request();
        let mut acc = OutputAccumulator::new();
        allow(&fixture.env(), &ActionConfig::new(ActionKind::Allow), &mut acc);
        assert_eq!(
            acc.permission_request_decision,
            Some(PermissionRequestDecision::allow())
        );

        let fixture = Fixture::new(json!({"hook_event_name": "Stop", "session_id": "s"}));
        let mut acc = OutputAccumulator::new();
        allow(&fixture.env(), &ActionConfig::new(ActionKind::Allow), &mut acc);
        assert_eq!(acc, OutputAccumulator::new());
    }
}
