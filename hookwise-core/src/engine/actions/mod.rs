//! Action handlers
//!
//! One handler per [`ActionKind`]. Handlers write into the shared
//! [`OutputAccumulator`] and report failure through [`ActionError`]. Every
//! error except [`ActionError::Blocked`] is logged by the executor and the
//! pass continues; `Blocked` aborts the whole pass.

mod automation;
pub mod entrypoints;
mod messages;
mod modify;
mod permission;
mod process;
mod transform;

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::action::{ActionConfig, ActionKind};
use super::config::EngineSettings;
use super::context::{EvalContext, HookContext};
use super::outputs::OutputAccumulator;
use super::rule::Rule;
use super::templates;

pub use entrypoints::{Callable, EntrypointRegistry, Symbol};
pub use process::truncate_output;

/// The block signal: a deny decision that stops all further processing
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{reason}")]
pub struct BlockHook {
    pub reason: String,
    pub rule_id: String,
}

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Blocked by rule '{}': {}", .0.rule_id, .0.reason)]
    Blocked(BlockHook),

    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid action configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid entrypoint '{0}' (expected 'module.path:function')")]
    InvalidEntrypoint(String),

    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    #[error("Symbol '{symbol}' not found in module '{module}'")]
    SymbolNotFound { module: String, symbol: String },

    #[error("'{0}' is not callable")]
    NotCallable(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    pub fn is_block(&self) -> bool {
        matches!(self, ActionError::Blocked(_))
    }
}

/// Everything a handler may read
pub struct ActionEnv<'a> {
    pub context: &'a HookContext,
    pub eval_context: &'a EvalContext,
    pub rule: &'a Rule,
    pub settings: &'a EngineSettings,
    pub entrypoints: &'a EntrypointRegistry,
}

impl ActionEnv<'_> {
    pub fn render(&self, template: &str) -> String {
        templates::substitute(template, self.eval_context)
    }

    pub fn default_block_reason(&self) -> String {
        format!("Blocked by rule '{}'", self.rule.id)
    }

    pub fn default_warning(&self) -> String {
        format!("Warning from rule '{}'", self.rule.id)
    }
}

/// Run a single action
pub async fn run_action(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    match action.kind {
        ActionKind::Deny => permission::deny(env, action, accumulator),
        ActionKind::Allow => {
            permission::allow(env, action, accumulator);
            Ok(())
        }
        ActionKind::Warn => {
            messages::warn(env, action, accumulator);
            Ok(())
        }
        ActionKind::Suggest | ActionKind::Inject => messages::inject(env, action, accumulator),
        ActionKind::Log => {
            messages::log(env, action);
            Ok(())
        }
        ActionKind::Modify => modify::run(env, action, accumulator),
        ActionKind::Transform => transform::run(env, action, accumulator).await,
        ActionKind::Shell => automation::run_shell(env, action, accumulator).await,
        ActionKind::Python => automation::run_python(env, action, accumulator).await,
        ActionKind::Noop => Ok(()),
    }
}
