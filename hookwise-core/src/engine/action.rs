//! Action configuration model
//!
//! One flat struct keyed by `type`, carrying every optional field an action
//! kind may read. Handlers pick the fields they need; the rest stay `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Deny,
    Allow,
    Warn,
    Suggest,
    Inject,
    Modify,
    Transform,
    Log,
    Shell,
    /// In-process automation callable resolved from the entrypoint registry
    #[serde(rename = "python", alias = "callable")]
    Python,
    /// Unrecognized `type` values land here and do nothing
    #[serde(other)]
    Noop,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Deny => "deny",
            ActionKind::Allow => "allow",
            ActionKind::Warn => "warn",
            ActionKind::Suggest => "suggest",
            ActionKind::Inject => "inject",
            ActionKind::Modify => "modify",
            ActionKind::Transform => "transform",
            ActionKind::Log => "log",
            ActionKind::Shell => "shell",
            ActionKind::Python => "python",
            ActionKind::Noop => "noop",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `modify` combines `value` with the current field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyOperation {
    #[default]
    Set,
    Append,
    Prepend,
    Replace,
}

/// What an automation action writes on the child's stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdinMode {
    None,
    Json,
}

/// What happens to captured stdout/stderr text that is not a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Ignore,
    Log,
    AppendToStdout,
}

/// Severity for the `log` action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl From<String> for LogLevel {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "warning" | "warn" => LogLevel::Warning,
            "error" | "critical" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(rename = "type")]
    pub kind: ActionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool input field targeted by `modify`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<ModifyOperation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Regex for `modify` with `operation = "replace"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Shell command line, run through `shell -c`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Script path plus arguments, run without a shell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Shell binary overriding the engine default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// `module.path:function` in the entrypoint registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<StdinMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<OutputMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<OutputMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,

    /// Deny only: also stop the agent (permission requests)
    #[serde(default)]
    pub interrupt: bool,
}

impl ActionConfig {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            message: None,
            content: None,
            field: None,
            operation: None,
            value: None,
            pattern: None,
            command: None,
            script: None,
            shell: None,
            entrypoint: None,
            env: BTreeMap::new(),
            cwd: None,
            timeout_ms: None,
            stdin: None,
            stdout: None,
            stderr: None,
            level: None,
            interrupt: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn with_field(
        mut self,
        field: impl Into<String>,
        operation: ModifyOperation,
        value: impl Into<Value>,
    ) -> Self {
        self.field = Some(field.into());
        self.operation = Some(operation);
        self.value = Some(value.into());
        self
    }

    /// Text shown by message-style actions; `content` is accepted as a fallback
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.content.as_deref())
    }

    /// Injected text for suggest/inject; `message` is accepted as a fallback
    pub fn injected_text(&self) -> Option<&str> {
        self.content.as_deref().or(self.message.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_action_type_becomes_noop() {
        let action: ActionConfig = toml::from_str(
            r#"
            type = "teleport"
            message = "ignored"
            "#,
        )
        .unwrap();
        assert_eq!(action.kind, ActionKind::Noop);
    }

    #[test]
    fn test_shell_action_fields() {
        let action: ActionConfig = toml::from_str(
            r#"
            type = "shell"
            command = "echo hi"
            timeout_ms = 2500
            stdin = "json"
            stdout = "append_to_stdout"
            stderr = "ignore"
            env = { FOO = "bar" }
            "#,
        )
        .unwrap();
        assert_eq!(action.kind, ActionKind::Shell);
        assert_eq!(action.command.as_deref(), Some("echo hi"));
        assert_eq!(action.timeout_ms, Some(2500));
        assert_eq!(action.stdin, Some(StdinMode::Json));
        assert_eq!(action.stdout, Some(OutputMode::AppendToStdout));
        assert_eq!(action.stderr, Some(OutputMode::Ignore));
        assert_eq!(action.env.get("FOO").map(String::as_str), Some("bar"));
    }

    #[test]
    fn test_python_action_accepts_callable_alias() {
        let action: ActionConfig = serde_json::from_value(serde_json::json!({
            "type": "callable",
            "entrypoint": "checks.lint:run"
        }))
        .unwrap();
        assert_eq!(action.kind, ActionKind::Python);
    }

    #[test]
    fn test_log_level_parsing() {
        let action: ActionConfig =
            serde_json::from_value(serde_json::json!({"type": "log", "level": "WARN"})).unwrap();
        assert_eq!(action.level, Some(LogLevel::Warning));

        let action: ActionConfig =
            serde_json::from_value(serde_json::json!({"type": "log", "level": "loud"})).unwrap();
        assert_eq!(action.level, Some(LogLevel::Info));
    }

    #[test]
    fn test_modify_value_keeps_json_type() {
        let action: ActionConfig = toml::from_str(
            r#"
            type = "modify"
            field = "timeout"
            operation = "set"
            value = 30
            "#,
        )
        .unwrap();
        assert_eq!(action.value, Some(serde_json::json!(30)));
        assert_eq!(action.operation, Some(ModifyOperation::Set));
    }
}
