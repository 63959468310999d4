use super::block_reason;
use super::types::HookResponse;
use crate::engine::HookOutcome;

/// Stop and SubagentStop use `decision: "block"` to keep the agent working
pub(super) fn build(outcome: &HookOutcome) -> HookResponse {
    block_reason(outcome)
        .map(HookResponse::block)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{event, outcome};
    use super::super::ResponseBuilder;
    use crate::engine::outputs::OutputAccumulator;
    use serde_json::json;

    #[test]
    fn test_stop_block_keeps_agent_going() {
        for name in ["Stop", "SubagentStop"] {
            let event = event(name);
            let mut outcome = outcome(&event, OutputAccumulator::new());
            if let Some(result) = outcome.result.as_mut() {
                result.should_block = true;
                result.block_reason = Some("tests are failing".into());
            }
            assert_eq!(
                serde_json::to_value(ResponseBuilder::build(&outcome, &event)).unwrap(),
                json!({"decision": "block", "reason": "tests are failing"}),
                "{name}"
            );
        }
    }
}
