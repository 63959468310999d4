//! Rule configuration model
//!
//! Rules are plain serde data. They are created by whatever loads the rule
//! files and stay immutable for the lifetime of an evaluation pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::action::ActionConfig;
use crate::harness::types::HookEventType;

/// Scheduling priority. Lower rank runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Unknown priority names fall back to medium
impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "critical" => Priority::Critical,
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule-level outcome label, aggregated by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleResult {
    Block,
    #[default]
    Ok,
    Warn,
}

impl RuleResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleResult::Block => "block",
            RuleResult::Ok => "ok",
            RuleResult::Warn => "warn",
        }
    }
}

/// The set of events a rule listens to. `"all"` matches every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EventsRepr", into = "Vec<String>")]
pub struct EventFilter(BTreeSet<String>);

pub const ALL_EVENTS: &str = "all";

#[derive(Deserialize)]
#[serde(untagged)]
enum EventsRepr {
    One(String),
    Many(Vec<String>),
}

impl From<EventsRepr> for EventFilter {
    fn from(repr: EventsRepr) -> Self {
        match repr {
            EventsRepr::One(name) => EventFilter::from_names([name]),
            EventsRepr::Many(names) => EventFilter::from_names(names),
        }
    }
}

impl From<EventFilter> for Vec<String> {
    fn from(filter: EventFilter) -> Self {
        filter.0.into_iter().collect()
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        EventFilter::all()
    }
}

impl EventFilter {
    pub fn all() -> Self {
        EventFilter::from_names([ALL_EVENTS])
    }

    /// Names are normalised to the snake_case event spelling, so both
    /// `PreToolUse` and `pre_tool_use` work in rule files.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        EventFilter(
            names
                .into_iter()
                .map(|name| {
                    let name = name.as_ref().trim();
                    name.parse::<HookEventType>()
                        .map(|event| event.as_str().to_string())
                        .unwrap_or_else(|_| name.to_string())
                })
                .collect(),
        )
    }

    pub fn applies_to(&self, event: HookEventType) -> bool {
        self.0.contains(ALL_EVENTS) || self.0.contains(event.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn default_true() -> bool {
    true
}

/// A configured condition + action list + scheduling metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub events: EventFilter,

    /// Expression; empty means always match
    #[serde(default)]
    pub condition: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Stop processing further rules once this one ran
    #[serde(default)]
    pub terminal: bool,

    #[serde(default)]
    pub result: RuleResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub actions: Vec<ActionConfig>,

    /// Where the rule was loaded from, for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl Rule {
    /// Minimal enabled rule matching every event, mostly for tests and tooling
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: Priority::default(),
            events: EventFilter::default(),
            condition: String::new(),
            enabled: true,
            terminal: false,
            result: RuleResult::default(),
            description: None,
            actions: Vec::new(),
            source_file: None,
        }
    }

    pub fn applies_to(&self, event: HookEventType) -> bool {
        self.events.applies_to(event)
    }
}
