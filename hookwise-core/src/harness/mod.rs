//! The hook-protocol boundary
//!
//! The harness is a pure translator: raw hook JSON in, [`HookEvent`] out;
//! [`HookOutcome`] in, response JSON out. It never evaluates rules itself.

pub mod events;
pub mod response;
pub mod types;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::engine::HookOutcome;
use events::HookEvent;
use response::ResponseBuilder;

pub struct ClaudeHarness;

impl ClaudeHarness {
    /// Parse the raw hook event read from stdin
    pub fn parse_event(input: &str) -> Result<HookEvent> {
        serde_json::from_str(input).context("Invalid hook event JSON")
    }

    pub fn format_response(event: &HookEvent, outcome: &HookOutcome) -> Result<Value> {
        let response = ResponseBuilder::build(outcome, event);
        Ok(serde_json::to_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_reports_bad_input() {
        let err = ClaudeHarness::parse_event(r#"{"hook_event_name": "Teleport"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid hook event JSON"));

        let event = ClaudeHarness::parse_event(
            r#"{"hook_event_name": "Stop", "session_id": "s", "stop_hook_active": true}"#,
        )
        .unwrap();
        assert_eq!(event.event_type(), types::HookEventType::Stop);
    }
}
