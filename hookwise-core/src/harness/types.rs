//! Hook event type definitions
//!
//! Every hook event the agent can raise has two spellings: the PascalCase
//! wire name used in the hook protocol (`PreToolUse`) and the snake_case name
//! rules use in their `events` list (`pre_tool_use`). The capability
//! predicates here decide which side-effect channels an event offers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported hook events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventType {
    /// Before a tool executes
    PreToolUse,
    /// After a tool executed successfully
    PostToolUse,
    /// User submitted a prompt
    UserPromptSubmit,
    /// Session started, resumed or cleared
    SessionStart,
    /// Session ended
    SessionEnd,
    /// The permission dialog is about to be shown
    PermissionRequest,
    /// Main agent stopping
    Stop,
    /// Subagent (Task tool) stopping
    SubagentStop,
    /// Before context compaction
    PreCompact,
    /// Agent notification
    Notification,
}

impl HookEventType {
    pub const ALL: [HookEventType; 10] = [
        HookEventType::PreToolUse,
        HookEventType::PostToolUse,
        HookEventType::UserPromptSubmit,
        HookEventType::SessionStart,
        HookEventType::SessionEnd,
        HookEventType::PermissionRequest,
        HookEventType::Stop,
        HookEventType::SubagentStop,
        HookEventType::PreCompact,
        HookEventType::Notification,
    ];

    /// Rule-facing name (snake_case)
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEventType::PreToolUse => "pre_tool_use",
            HookEventType::PostToolUse => "post_tool_use",
            HookEventType::UserPromptSubmit => "user_prompt_submit",
            HookEventType::SessionStart => "session_start",
            HookEventType::SessionEnd => "session_end",
            HookEventType::PermissionRequest => "permission_request",
            HookEventType::Stop => "stop",
            HookEventType::SubagentStop => "subagent_stop",
            HookEventType::PreCompact => "pre_compact",
            HookEventType::Notification => "notification",
        }
    }

    /// Hook protocol name (PascalCase)
    pub fn wire_name(&self) -> &'static str {
        match self {
            HookEventType::PreToolUse => "PreToolUse",
            HookEventType::PostToolUse => "PostToolUse",
            HookEventType::UserPromptSubmit => "UserPromptSubmit",
            HookEventType::SessionStart => "SessionStart",
            HookEventType::SessionEnd => "SessionEnd",
            HookEventType::PermissionRequest => "PermissionRequest",
            HookEventType::Stop => "Stop",
            HookEventType::SubagentStop => "SubagentStop",
            HookEventType::PreCompact => "PreCompact",
            HookEventType::Notification => "Notification",
        }
    }

    /// Event carries a binary allow/deny/ask permission decision
    pub fn supports_permission_decision(&self) -> bool {
        matches!(self, HookEventType::PreToolUse)
    }

    /// Event carries the nested permission-request decision structure
    pub fn is_permission_request(&self) -> bool {
        matches!(self, HookEventType::PermissionRequest)
    }

    /// Event lets rules rewrite the tool input before it runs
    pub fn supports_input_mutation(&self) -> bool {
        matches!(
            self,
            HookEventType::PreToolUse | HookEventType::PermissionRequest
        )
    }

    /// Event accepts additional context for the agent
    pub fn supports_context_injection(&self) -> bool {
        matches!(
            self,
            HookEventType::UserPromptSubmit
                | HookEventType::SessionStart
                | HookEventType::PostToolUse
        )
    }

    /// Event concerns a single tool invocation
    pub fn is_tool_event(&self) -> bool {
        matches!(
            self,
            HookEventType::PreToolUse
                | HookEventType::PostToolUse
                | HookEventType::PermissionRequest
        )
    }
}

impl fmt::Display for HookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookEventType::ALL
            .iter()
            .find(|event| event.as_str() == s || event.wire_name() == s)
            .copied()
            .ok_or_else(|| {
                let valid: Vec<&str> = HookEventType::ALL.iter().map(|e| e.as_str()).collect();
                format!(
                    "Unknown hook event type: '{s}'. Valid options: {}",
                    valid.join(", ")
                )
            })
    }
}
