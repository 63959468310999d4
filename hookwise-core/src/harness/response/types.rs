use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::outputs::{PermissionDecision, PermissionRequestDecision};

/// The JSON object written to stdout for one hook invocation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
    /// Only ever `"block"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `Some(false)` halts the agent
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_execution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl HookResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    /// `decision: "block"` with a reason, for feedback-loop style events
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: Some("block".to_string()),
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// `continue: false` with a stop reason
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            continue_execution: Some(false),
            stop_reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Per-event payload, keyed by `hookEventName`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "hookEventName", rename_all_fields = "camelCase")]
pub enum HookSpecificOutput {
    PreToolUse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission_decision: Option<PermissionDecision>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        permission_decision_reason: Option<String>,
        /// Complete replacement input, not a patch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_input: Option<Map<String, Value>>,
    },
    PermissionRequest {
        decision: PermissionRequestDecision,
    },
    UserPromptSubmit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        additional_context: Option<String>,
    },
    SessionStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        additional_context: Option<String>,
    },
    PostToolUse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        additional_context: Option<String>,
    },
}
