use super::CommonEventData;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreToolUsePayload {
    #[serde(flatten)]
    pub common: CommonEventData,
    pub tool_name: String,
    /// Tool arguments; shape depends on the tool
    pub tool_input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostToolUsePayload {
    #[serde(flatten)]
    pub common: CommonEventData,
    pub tool_name: String,
    pub tool_input: Value,
    /// What the tool returned; null when the agent left it out
    #[serde(default)]
    pub tool_response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

/// Sent right before the agent would show its permission dialog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequestPayload {
    #[serde(flatten)]
    pub common: CommonEventData,
    pub tool_name: String,
    pub tool_input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_permission_request_keeps_tool_use_id() {
        let payload: PermissionRequestPayload = serde_json::from_value(json!({
            "session_id": "abc",
            "cwd": "/repo",
            "tool_name": "Bash",
            "tool_input": {"command": "rm -rf target"},
            "tool_use_id": "toolu_9"
        }))
        .unwrap();

        assert_eq!(payload.tool_use_id.as_deref(), Some("toolu_9"));
        assert_eq!(payload.tool_input["command"], "rm -rf target");
    }

    #[test]
    fn test_post_tool_use_response_defaults_to_null() {
        let payload: PostToolUsePayload = serde_json::from_value(json!({
            "session_id": "abc",
            "tool_name": "Write",
            "tool_input": {"file_path": "a.txt", "content": "x"}
        }))
        .unwrap();

        assert!(payload.tool_response.is_null());
        assert!(payload.common.transcript_path.is_empty());
    }
}
