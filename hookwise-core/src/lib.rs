//! Hookwise - rule matching and execution for coding-agent hook events

pub mod debug;
pub mod engine;
pub mod harness;

pub use engine::actions::{BlockHook, EntrypointRegistry};
pub use engine::config::{EngineSettings, RuleSet};
pub use engine::context::HookContext;
pub use engine::{Engine, HookOutcome};
pub use harness::events::HookEvent;
pub use harness::types::HookEventType;
