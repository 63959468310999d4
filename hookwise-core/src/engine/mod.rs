//! The hook engine
//!
//! One evaluation runs in three steps:
//! 1. bind a [`FunctionRegistry`] to the invocation (cwd, session, git, stores)
//! 2. match and order the rules ([`matcher::match_rules`])
//! 3. run the matched rules' actions into an [`OutputAccumulator`]
//!    ([`executor::RuleExecutor`])
//!
//! Nothing in the engine is shared between evaluations except the read-only
//! rule list and settings, so one [`Engine`] may serve concurrent events.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod action;
pub mod actions;
pub mod config;
pub mod context;
pub mod executor;
pub mod expression;
pub mod functions;
pub mod matcher;
pub mod outputs;
pub mod rule;
pub mod state;
pub mod templates;
pub mod trace;

use actions::{BlockHook, EntrypointRegistry};
use config::{EngineSettings, RuleSet};
use context::HookContext;
use executor::{ExecutionResult, RuleExecutor};
use functions::{EnvLookup, FunctionRegistry};
use outputs::OutputAccumulator;
use rule::Rule;
use state::{ProjectStore, SessionStore};

use crate::harness::types::HookEventType;

/// Everything one evaluation produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookOutcome {
    pub hook_event_type: HookEventType,
    /// `None` when a block signal aborted the pass
    pub result: Option<ExecutionResult>,
    pub blocked: Option<BlockHook>,
    /// Rules that ran before the block signal, for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<ExecutionResult>,
    pub accumulator: OutputAccumulator,
    /// In execution order
    pub matched_rule_ids: Vec<String>,
}

impl HookOutcome {
    /// Either a block signal or a rule labelled `result = "block"`
    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some() || self.result.as_ref().is_some_and(|r| r.should_block)
    }

    pub fn block_reason(&self) -> Option<&str> {
        match &self.blocked {
            Some(block) => Some(block.reason.as_str()),
            None => self.result.as_ref().and_then(|r| r.block_reason.as_deref()),
        }
    }

    pub fn warnings(&self) -> &[String] {
        self.result.as_ref().map(|r| r.warnings.as_slice()).unwrap_or_default()
    }
}

pub struct Engine {
    rules: Vec<Rule>,
    settings: EngineSettings,
    entrypoints: EntrypointRegistry,
    session_store: Option<Arc<dyn SessionStore>>,
    project_store: Option<Arc<dyn ProjectStore>>,
    env: Option<EnvLookup>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.rules.len())
            .field("settings", &self.settings)
            .field("entrypoints", &self.entrypoints)
            .field("has_session_store", &self.session_store.is_some())
            .field("has_project_store", &self.project_store.is_some())
            .finish()
    }
}

impl Engine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            settings: EngineSettings::default(),
            entrypoints: EntrypointRegistry::new(),
            session_store: None,
            project_store: None,
            env: None,
        }
    }

    pub fn from_rule_set(rule_set: RuleSet) -> Self {
        Self::new(rule_set.rules).with_settings(rule_set.settings)
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_entrypoints(mut self, entrypoints: EntrypointRegistry) -> Self {
        self.entrypoints = entrypoints;
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_project_store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.project_store = Some(store);
        self
    }

    /// Grant `$env()` access; without it every lookup yields null
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = Some(env);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn entrypoints(&self) -> &EntrypointRegistry {
        &self.entrypoints
    }

    /// Function registry bound to this invocation
    pub fn function_registry(&self, context: &HookContext) -> FunctionRegistry {
        let mut builder = FunctionRegistry::for_context(context);
        if let Some(store) = &self.session_store {
            builder = builder.session_store(store.clone());
        }
        if let Some(store) = &self.project_store {
            builder = builder.project_store(store.clone());
        }
        if let Some(env) = &self.env {
            builder = builder.env(env.clone());
        }
        builder.build()
    }

    pub fn executor(&self) -> RuleExecutor<'_> {
        RuleExecutor::new(&self.settings, &self.entrypoints)
    }

    /// Evaluate all rules against one event
    #[instrument(
        name = "evaluate",
        skip_all,
        fields(
            trace_id = %context.trace_id,
            hook_type = %context.hook_event_type,
            session_id = %context.claude_session_id,
            matched_count = tracing::field::Empty,
            blocked = tracing::field::Empty
        )
    )]
    pub async fn evaluate(&self, context: &HookContext) -> HookOutcome {
        self.evaluate_rules(&self.rules, context).await
    }

    /// Evaluate an explicit subset of rules, e.g. a single rule under simulation
    pub async fn evaluate_rules(&self, rules: &[Rule], context: &HookContext) -> HookOutcome {
        let functions = self.function_registry(context);
        let matched = matcher::match_rules(rules, context, &functions);
        let matched_rule_ids: Vec<String> = matched.iter().map(|m| m.rule.id.clone()).collect();
        tracing::Span::current().record("matched_count", matched.len());

        let mut accumulator = OutputAccumulator::new();
        let mut executed = ExecutionResult::default();
        let (result, blocked, partial) = match self
            .executor()
            .execute_rules_into(&matched, context, &mut accumulator, &mut executed)
            .await
        {
            Ok(()) => (Some(executed), None, None),
            Err(block) => (None, Some(block), Some(executed)),
        };

        let outcome = HookOutcome {
            hook_event_type: context.hook_event_type,
            result,
            blocked,
            partial,
            accumulator,
            matched_rule_ids,
        };
        tracing::Span::current().record("blocked", outcome.is_blocked());
        info!(
            matched = outcome.matched_rule_ids.len(),
            blocked = outcome.is_blocked(),
            "Evaluation complete"
        );
        outcome
    }
}
