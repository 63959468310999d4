use super::types::{HookResponse, HookSpecificOutput};
use super::{block_reason, effective_input};
use crate::engine::outputs::PermissionDecision;
use crate::engine::HookOutcome;
use crate::harness::events::HookEvent;

/// PreToolUse answers through `hookSpecificOutput.permissionDecision`
pub(super) fn build(outcome: &HookOutcome, event: &HookEvent) -> HookResponse {
    let acc = &outcome.accumulator;

    if let Some(reason) = block_reason(outcome) {
        let reason = match (acc.permission_decision, &acc.permission_decision_reason) {
            (Some(PermissionDecision::Deny), Some(recorded)) => recorded.clone(),
            _ => reason,
        };
        return HookResponse {
            hook_specific_output: Some(HookSpecificOutput::PreToolUse {
                permission_decision: Some(PermissionDecision::Deny),
                permission_decision_reason: Some(reason),
                updated_input: None,
            }),
            ..HookResponse::empty()
        };
    }

    let updated_input = effective_input(outcome, event);
    if acc.permission_decision.is_none() && updated_input.is_none() {
        return HookResponse::empty();
    }
    HookResponse {
        hook_specific_output: Some(HookSpecificOutput::PreToolUse {
            permission_decision: acc.permission_decision,
            permission_decision_reason: acc.permission_decision_reason.clone(),
            updated_input,
        }),
        ..HookResponse::empty()
    }
}
