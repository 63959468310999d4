//! Side-effect channels collected while actions run
//!
//! One [`OutputAccumulator`] exists per `execute_rules` call. Action handlers
//! write into it; the response builder reads it once at the end.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    Deny,
    Ask,
}

impl PermissionDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionDecision::Allow => "allow",
            PermissionDecision::Deny => "deny",
            PermissionDecision::Ask => "ask",
        }
    }
}

impl fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior of a permission-request decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionBehavior {
    Allow,
    Deny,
}

/// The nested decision answered to a `PermissionRequest` hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequestDecision {
    pub behavior: PermissionBehavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub interrupt: bool,
}

impl PermissionRequestDecision {
    pub fn allow() -> Self {
        Self {
            behavior: PermissionBehavior::Allow,
            message: None,
            updated_input: None,
            interrupt: false,
        }
    }

    pub fn deny(message: impl Into<String>, interrupt: bool) -> Self {
        Self {
            behavior: PermissionBehavior::Deny,
            message: Some(message.into()),
            updated_input: None,
            interrupt,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputAccumulator {
    pub permission_decision: Option<PermissionDecision>,
    pub permission_decision_reason: Option<String>,
    pub permission_request_decision: Option<PermissionRequestDecision>,
    pub system_messages: Vec<String>,
    pub additional_context_items: Vec<String>,
    pub updated_input: Map<String, Value>,
}

impl OutputAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_permission(&mut self, decision: PermissionDecision, reason: Option<String>) {
        self.permission_decision = Some(decision);
        self.permission_decision_reason = reason;
    }

    pub fn add_system_message(&mut self, message: impl Into<String>) {
        self.system_messages.push(message.into());
    }

    pub fn add_context(&mut self, content: impl Into<String>) {
        self.additional_context_items.push(content.into());
    }

    /// Merge one field into the updated input, replacing only that key
    pub fn update_input_field(&mut self, field: impl Into<String>, value: Value) {
        self.updated_input.insert(field.into(), value);
    }

    pub fn merge_updated_input(&mut self, fields: Map<String, Value>) {
        for (field, value) in fields {
            self.updated_input.insert(field, value);
        }
    }

    /// `additional_context_items` joined for the wire, `None` when empty
    pub fn additional_context(&self) -> Option<String> {
        (!self.additional_context_items.is_empty())
            .then(|| self.additional_context_items.join("\n\n"))
    }

    pub fn system_message(&self) -> Option<String> {
        (!self.system_messages.is_empty()).then(|| self.system_messages.join("\n"))
    }

    pub fn has_updated_input(&self) -> bool {
        !self.updated_input.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_updated_input_merges_per_field() {
        let mut acc = OutputAccumulator::new();
        acc.update_input_field("command", json!("ls"));
        acc.update_input_field("timeout", json!(30));
        acc.merge_updated_input(json!({"command": "ls -la"}).as_object().cloned().unwrap());

        assert_eq!(
            Value::Object(acc.updated_input),
            json!({"command": "ls -la", "timeout": 30})
        );
    }

    #[test]
    fn test_joined_channels() {
        let mut acc = OutputAccumulator::new();
        assert_eq!(acc.additional_context(), None);
        assert_eq!(acc.system_message(), None);

        acc.add_context("first");
        acc.add_context("second");
        acc.add_system_message("warn a");
        acc.add_system_message("warn b");
        assert_eq!(acc.additional_context().as_deref(), Some("first\n\nsecond"));
        assert_eq!(acc.system_message().as_deref(), Some("warn a\nwarn b"));
    }

    #[test]
    fn test_permission_request_decision_wire_shape() {
        let decision = PermissionRequestDecision::deny("nope", true);
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            json!({"behavior": "deny", "message": "nope", "interrupt": true})
        );
        assert_eq!(
            serde_json::to_value(PermissionRequestDecision::allow()).unwrap(),
            json!({"behavior": "allow"})
        );
    }
}
