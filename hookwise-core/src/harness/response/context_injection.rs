use super::block_reason;
use super::types::{HookResponse, HookSpecificOutput};
use crate::engine::HookOutcome;
use crate::harness::types::HookEventType;

/// UserPromptSubmit, SessionStart and PostToolUse accept
/// `hookSpecificOutput.additionalContext`. Blocks use `decision: "block"`,
/// except SessionStart which can only stop the session.
pub(super) fn build(outcome: &HookOutcome) -> HookResponse {
    let event = outcome.hook_event_type;
    let additional_context = outcome.accumulator.additional_context();

    let mut response = match block_reason(outcome) {
        Some(reason) if event == HookEventType::SessionStart => HookResponse::stop(reason),
        Some(reason) => HookResponse::block(reason),
        None => HookResponse::empty(),
    };

    // context from before the block still reaches PostToolUse feedback
    let blocked_prompt = response.decision.is_some() && event == HookEventType::UserPromptSubmit;
    if additional_context.is_some() && !blocked_prompt {
        response.hook_specific_output = match event {
            HookEventType::UserPromptSubmit => {
                Some(HookSpecificOutput::UserPromptSubmit { additional_context })
            }
            HookEventType::SessionStart => Some(HookSpecificOutput::SessionStart { additional_context }),
            _ => Some(HookSpecificOutput::PostToolUse { additional_context }),
        };
    }
    response
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{event, outcome};
    use super::super::ResponseBuilder;
    use crate::engine::actions::BlockHook;
    use crate::engine::outputs::OutputAccumulator;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn with_context(items: &[&str]) -> OutputAccumulator {
        let mut acc = OutputAccumulator::new();
        for item in items {
            acc.add_context(*item);
        }
        acc
    }

    #[test]
    fn test_additional_context_per_event() {
        for name in ["UserPromptSubmit", "SessionStart", "PostToolUse"] {
            let event = event(name);
            let outcome = outcome(&event, with_context(&["one", "two"]));
            let value = serde_json::to_value(ResponseBuilder::build(&outcome, &event)).unwrap();
            assert_eq!(
                value,
                json!({
                    "hookSpecificOutput": {
                        "hookEventName": name,
                        "additionalContext": "one\n\ntwo"
                    }
                }),
                "{name}"
            );
        }
    }

    #[test]
    fn test_block_envelopes() {
        let block = BlockHook {
            reason: "not now".into(),
            rule_id: "r".into(),
        };

        let event = event("UserPromptSubmit");
        let mut blocked = outcome(&event, with_context(&["dropped"]));
        blocked.result = None;
        blocked.blocked = Some(block.clone());
        assert_eq!(
            serde_json::to_value(ResponseBuilder::build(&blocked, &event)).unwrap(),
            json!({"decision": "block", "reason": "not now"})
        );

        let event = super::super::test_support::event("SessionStart");
        let mut blocked = outcome(&event, OutputAccumulator::new());
        blocked.result = None;
        blocked.blocked = Some(block);
        assert_eq!(
            serde_json::to_value(ResponseBuilder::build(&blocked, &event)).unwrap(),
            json!({"continue": false, "stopReason": "not now"})
        );
    }
}
