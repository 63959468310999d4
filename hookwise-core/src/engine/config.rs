//! Engine configuration: settings, rule sets and shell detection.
//!
//! Only the shape of the configuration lives here. Finding rule files and
//! merging them is left to the caller.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::rule::Rule;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// Detects the appropriate shell command for the current platform
///
/// On Windows, looks for Git Bash so shell snippets written for sh keep
/// working; falls back to `bash.exe` from PATH. On Unix, uses `sh`.
fn find_shell_command() -> &'static str {
    if cfg!(windows) {
        if Path::new(r"C:\Program Files\Git\bin\bash.exe").exists() {
            debug!("Found Git Bash at standard 64-bit location");
            return r"C:\Program Files\Git\bin\bash.exe";
        }

        if Path::new(r"C:\Program Files (x86)\Git\bin\bash.exe").exists() {
            debug!("Found Git Bash at 32-bit location");
            return r"C:\Program Files (x86)\Git\bin\bash.exe";
        }

        debug!("No Git Bash found at standard locations, trying bash.exe from PATH");
        "bash.exe"
    } else {
        "sh"
    }
}

/// Cached shell command determined at first use
pub static SHELL_COMMAND: Lazy<&'static str> = Lazy::new(find_shell_command);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read rule file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Duplicate rule id '{id}' (first defined in {first}, again in {second})")]
    DuplicateRuleId {
        id: String,
        first: String,
        second: String,
    },
}

/// Engine-wide defaults for automation actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Default wall-clock limit for shell, python and transform actions
    pub timeout_ms: u64,
    /// Cap applied to captured stdout and stderr
    pub max_output_bytes: usize,
    /// Shell used for `command` actions; platform default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            shell: None,
        }
    }
}

impl EngineSettings {
    pub fn timeout(&self, action_timeout_ms: Option<u64>) -> Duration {
        Duration::from_millis(action_timeout_ms.unwrap_or(self.timeout_ms))
    }

    pub fn shell<'a>(&'a self, action_shell: Option<&'a str>) -> &'a str {
        action_shell
            .or(self.shell.as_deref())
            .unwrap_or(*SHELL_COMMAND)
    }
}

/// Settings overrides as written in a rule file. Unset fields keep the
/// value from earlier files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SettingsOverride {
    timeout_ms: Option<u64>,
    max_output_bytes: Option<usize>,
    shell: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RuleFile {
    #[serde(default)]
    settings: SettingsOverride,
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Rules plus settings, in definition order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub settings: EngineSettings,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Parse one TOML document. `origin` is recorded as each rule's
    /// `source_file` unless the rule names its own.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut set = RuleSet::default();
        set.extend_from_toml(content, origin)?;
        Ok(set)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut set = RuleSet::default();
        set.extend_from_file(path)?;
        Ok(set)
    }

    pub fn extend_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.extend_from_toml(&content, path)
    }

    /// Append another document's rules after the existing ones
    pub fn extend_from_toml(&mut self, content: &str, origin: &Path) -> Result<(), ConfigError> {
        let file: RuleFile = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        if let Some(timeout_ms) = file.settings.timeout_ms {
            self.settings.timeout_ms = timeout_ms;
        }
        if let Some(max_output_bytes) = file.settings.max_output_bytes {
            self.settings.max_output_bytes = max_output_bytes;
        }
        if let Some(shell) = file.settings.shell {
            self.settings.shell = Some(shell);
        }

        let origin_name = origin.display().to_string();
        for mut rule in file.rules {
            if rule.source_file.is_none() {
                rule.source_file = Some(origin_name.clone());
            }
            if let Some(existing) = self.rules.iter().find(|r| r.id == rule.id) {
                return Err(ConfigError::DuplicateRuleId {
                    id: rule.id.clone(),
                    first: existing.source_file.clone().unwrap_or_default(),
                    second: origin_name,
                });
            }
            self.rules.push(rule);
        }

        debug!(
            "Loaded rules from {} ({} total)",
            origin_name,
            self.rules.len()
        );
        Ok(())
    }
}
