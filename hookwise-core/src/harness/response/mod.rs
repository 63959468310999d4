//! Hook-protocol responses
//!
//! Translates a [`HookOutcome`] into the JSON object the agent reads from the
//! hook's stdout. Each event family has its own envelope; this module routes
//! to the matching builder and adds the shared `systemMessage`.

mod context_injection;
mod feedback_loop;
mod permission_request;
mod pre_tool_use;
pub mod types;

pub use types::{HookResponse, HookSpecificOutput};

use serde_json::{Map, Value};

use crate::engine::HookOutcome;
use crate::harness::events::HookEvent;
use crate::harness::types::HookEventType;

const DEFAULT_BLOCK_REASON: &str = "Blocked by hook rules";

/// The block reason when the outcome blocks, `None` otherwise
pub(crate) fn block_reason(outcome: &HookOutcome) -> Option<String> {
    outcome.is_blocked().then(|| {
        outcome
            .block_reason()
            .unwrap_or(DEFAULT_BLOCK_REASON)
            .to_string()
    })
}

/// The tool input the agent should run with: the original input overlaid
/// with every accumulated update. `None` when nothing was updated.
pub(crate) fn effective_input(outcome: &HookOutcome, event: &HookEvent) -> Option<Map<String, Value>> {
    if !outcome.accumulator.has_updated_input() {
        return None;
    }
    let mut input = event
        .tool_input()
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for (field, value) in &outcome.accumulator.updated_input {
        input.insert(field.clone(), value.clone());
    }
    Some(input)
}

/// System messages from actions followed by rule-level warnings
fn system_message(outcome: &HookOutcome) -> Option<String> {
    let lines: Vec<&str> = outcome
        .accumulator
        .system_messages
        .iter()
        .chain(outcome.warnings())
        .map(String::as_str)
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    pub fn build(outcome: &HookOutcome, event: &HookEvent) -> HookResponse {
        let mut response = match outcome.hook_event_type {
            HookEventType::PreToolUse => pre_tool_use::build(outcome, event),
            HookEventType::PermissionRequest => permission_request::build(outcome, event),
            HookEventType::UserPromptSubmit
            | HookEventType::SessionStart
            | HookEventType::PostToolUse => context_injection::build(outcome),
            HookEventType::Stop | HookEventType::SubagentStop => feedback_loop::build(outcome),
            HookEventType::SessionEnd | HookEventType::PreCompact | HookEventType::Notification => {
                block_reason(outcome)
                    .map(HookResponse::stop)
                    .unwrap_or_default()
            }
        };
        response.system_message = system_message(outcome);
        response
    }
}
