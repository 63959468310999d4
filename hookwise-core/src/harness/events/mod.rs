//! Hook event payloads as the agent sends them
//!
//! One JSON object arrives per invocation, tagged by `hook_event_name`. Every
//! payload flattens [`CommonEventData`] next to its own fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod session;
mod tool_use;

pub use session::{
    CompactTrigger, NotificationPayload, PreCompactPayload, SessionEndPayload, SessionEndReason,
    SessionSource, SessionStartPayload, StopPayload, SubagentStopPayload, UserPromptSubmitPayload,
};
pub use tool_use::{PermissionRequestPayload, PostToolUsePayload, PreToolUsePayload};

use super::types::HookEventType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    #[default]
    Default,
    Plan,
    AcceptEdits,
    BypassPermissions,
}

impl PermissionMode {
    /// Wire spelling, also what conditions compare against
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::Plan => "plan",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Session fields shared by every event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonEventData {
    pub session_id: String,

    #[serde(default)]
    pub transcript_path: String,

    /// Agent working directory; empty when the agent omitted it
    #[serde(default)]
    pub cwd: String,

    #[serde(default)]
    pub permission_mode: PermissionMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookEvent {
    PreToolUse(PreToolUsePayload),
    PostToolUse(PostToolUsePayload),
    PermissionRequest(PermissionRequestPayload),
    UserPromptSubmit(UserPromptSubmitPayload),
    SessionStart(SessionStartPayload),
    SessionEnd(SessionEndPayload),
    Stop(StopPayload),
    SubagentStop(SubagentStopPayload),
    PreCompact(PreCompactPayload),
    Notification(NotificationPayload),
}

/// Apply `$body` to whichever payload the event carries
macro_rules! each_payload {
    ($event:expr, $payload:ident => $body:expr) => {
        match $event {
            HookEvent::PreToolUse($payload) => $body,
            HookEvent::PostToolUse($payload) => $body,
            HookEvent::PermissionRequest($payload) => $body,
            HookEvent::UserPromptSubmit($payload) => $body,
            HookEvent::SessionStart($payload) => $body,
            HookEvent::SessionEnd($payload) => $body,
            HookEvent::Stop($payload) => $body,
            HookEvent::SubagentStop($payload) => $body,
            HookEvent::PreCompact($payload) => $body,
            HookEvent::Notification($payload) => $body,
        }
    };
}

impl HookEvent {
    pub fn event_type(&self) -> HookEventType {
        match self {
            HookEvent::PreToolUse(_) => HookEventType::PreToolUse,
            HookEvent::PostToolUse(_) => HookEventType::PostToolUse,
            HookEvent::PermissionRequest(_) => HookEventType::PermissionRequest,
            HookEvent::UserPromptSubmit(_) => HookEventType::UserPromptSubmit,
            HookEvent::SessionStart(_) => HookEventType::SessionStart,
            HookEvent::SessionEnd(_) => HookEventType::SessionEnd,
            HookEvent::Stop(_) => HookEventType::Stop,
            HookEvent::SubagentStop(_) => HookEventType::SubagentStop,
            HookEvent::PreCompact(_) => HookEventType::PreCompact,
            HookEvent::Notification(_) => HookEventType::Notification,
        }
    }

    pub fn common(&self) -> &CommonEventData {
        each_payload!(self, payload => &payload.common)
    }

    /// The tool half of the payload, for the three tool events
    fn tool_call(&self) -> Option<(&str, &Value)> {
        match self {
            HookEvent::PreToolUse(p) => Some((&p.tool_name, &p.tool_input)),
            HookEvent::PostToolUse(p) => Some((&p.tool_name, &p.tool_input)),
            HookEvent::PermissionRequest(p) => Some((&p.tool_name, &p.tool_input)),
            _ => None,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_call().map(|(name, _)| name)
    }

    pub fn tool_input(&self) -> Option<&Value> {
        self.tool_call().map(|(_, input)| input)
    }

    /// Only PostToolUse has one
    pub fn tool_response(&self) -> Option<&Value> {
        match self {
            HookEvent::PostToolUse(p) => Some(&p.tool_response),
            _ => None,
        }
    }

    pub fn tool_use_id(&self) -> Option<&str> {
        match self {
            HookEvent::PreToolUse(p) => p.tool_use_id.as_deref(),
            HookEvent::PostToolUse(p) => p.tool_use_id.as_deref(),
            HookEvent::PermissionRequest(p) => p.tool_use_id.as_deref(),
            _ => None,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            HookEvent::UserPromptSubmit(p) => Some(&p.prompt),
            _ => None,
        }
    }

    pub fn permission_mode(&self) -> PermissionMode {
        self.common().permission_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_tool_event_accessors() {
        let event: HookEvent = serde_json::from_value(json!({
            "hook_event_name": "PreToolUse",
            "session_id": "abc",
            "transcript_path": "/logs/abc.jsonl",
            "cwd": "/repo",
            "permission_mode": "acceptEdits",
            "tool_name": "Bash",
            "tool_input": {"command": "cargo build"}
        }))
        .unwrap();

        assert_eq!(event.event_type(), HookEventType::PreToolUse);
        assert_eq!(event.tool_name(), Some("Bash"));
        assert_eq!(event.tool_input().unwrap()["command"], "cargo build");
        assert_eq!(event.tool_use_id(), None);
        assert_eq!(event.common().session_id, "abc");
        assert_eq!(event.permission_mode(), PermissionMode::AcceptEdits);
        assert_eq!(event.permission_mode().as_str(), "acceptEdits");
        assert_eq!(event.prompt(), None);
    }

    #[test]
    fn test_prompt_event_has_no_tool() {
        let event: HookEvent = serde_json::from_value(json!({
            "hook_event_name": "UserPromptSubmit",
            "session_id": "abc",
            "prompt": "refactor the parser"
        }))
        .unwrap();

        assert_eq!(event.prompt(), Some("refactor the parser"));
        assert_eq!(event.tool_name(), None);
        assert!(event.tool_input().is_none());
        assert_eq!(event.common().cwd, "");
    }

    #[test]
    fn test_unknown_event_name_is_rejected() {
        let parsed = serde_json::from_value::<HookEvent>(json!({
            "hook_event_name": "BeforeLunch",
            "session_id": "abc"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_every_wire_name_round_trips_through_event_type() {
        for name in [
            "PreToolUse",
            "PostToolUse",
            "PermissionRequest",
            "UserPromptSubmit",
            "SessionStart",
            "SessionEnd",
            "Stop",
            "SubagentStop",
            "PreCompact",
            "Notification",
        ] {
            let mut raw = json!({"hook_event_name": name, "session_id": "abc"});
            if matches!(name, "PreToolUse" | "PostToolUse" | "PermissionRequest") {
                raw["tool_name"] = json!("Read");
                raw["tool_input"] = json!({});
            }
            if name == "UserPromptSubmit" {
                raw["prompt"] = json!("");
            }
            let event: HookEvent = serde_json::from_value(raw).unwrap();
            assert_eq!(event.event_type().wire_name(), name);
        }
    }
}
