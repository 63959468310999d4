//! Rule executor - runs the action pipelines of matched rules.
//!
//! The executor is an ephemeral struct created for each evaluation, holding
//! references to the settings and automation registry the actions need.
//! Rules and actions run strictly in order and every action failure is
//! isolated: it is logged, recorded in the rule's result, and the pass moves
//! on. The one exception is the block signal raised by `deny`, which aborts
//! the whole pass and is returned as `Err(BlockHook)`.

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::action::ActionKind;
use super::actions::{run_action, ActionEnv, ActionError, BlockHook, EntrypointRegistry};
use super::config::EngineSettings;
use super::context::HookContext;
use super::matcher::MatchedRule;
use super::outputs::OutputAccumulator;
use super::rule::{Rule, RuleResult};

/// What happened to one action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub action_type: ActionKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleExecutionResult {
    pub rule_id: String,
    pub match_order: usize,
    pub result: RuleResult,
    pub terminal: bool,
    pub actions: Vec<ActionOutcome>,
}

impl RuleExecutionResult {
    pub fn failed_actions(&self) -> usize {
        self.actions.iter().filter(|a| !a.success).count()
    }
}

/// Aggregate of one `execute_rules` pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// Set by rules labelled `result = "block"`
    pub should_block: bool,
    /// Reason of the first such rule
    pub block_reason: Option<String>,
    pub warnings: Vec<String>,
    /// A terminal rule stopped the pass before every match ran
    pub terminated_early: bool,
    pub rules: Vec<RuleExecutionResult>,
}

fn rule_label(rule: &Rule, fallback: String) -> String {
    rule.description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or(fallback)
}

pub struct RuleExecutor<'a> {
    pub settings: &'a EngineSettings,
    pub entrypoints: &'a EntrypointRegistry,
}

impl<'a> RuleExecutor<'a> {
    pub fn new(settings: &'a EngineSettings, entrypoints: &'a EntrypointRegistry) -> Self {
        Self {
            settings,
            entrypoints,
        }
    }

    /// Execute matched rules in the order given.
    ///
    /// Effects already written to `accumulator` stay there when the pass
    /// ends early, whether through a terminal rule or a block signal.
    pub async fn execute_rules(
        &self,
        matched: &[MatchedRule<'_>],
        context: &HookContext,
        accumulator: &mut OutputAccumulator,
    ) -> Result<ExecutionResult, BlockHook> {
        let mut result = ExecutionResult::default();
        self.execute_rules_into(matched, context, accumulator, &mut result)
            .await?;
        Ok(result)
    }

    /// Like [`execute_rules`](Self::execute_rules), recording into `result`
    /// as it goes. On a block signal `result` holds every rule that ran,
    /// the blocking rule last.
    #[tracing::instrument(
        skip_all,
        fields(
            hook_type = %context.hook_event_type,
            rule_count = matched.len(),
            duration_ms = tracing::field::Empty
        )
    )]
    pub async fn execute_rules_into(
        &self,
        matched: &[MatchedRule<'_>],
        context: &HookContext,
        accumulator: &mut OutputAccumulator,
        result: &mut ExecutionResult,
    ) -> Result<(), BlockHook> {
        let start = Instant::now();
        let eval_context = context.to_eval_context();

        for (position, matched_rule) in matched.iter().enumerate() {
            let rule = matched_rule.rule;
            let env = ActionEnv {
                context,
                eval_context: &eval_context,
                rule,
                settings: self.settings,
                entrypoints: self.entrypoints,
            };

            debug!(rule_id = %rule.id, match_order = matched_rule.match_order, "Executing rule");
            let mut rule_result = RuleExecutionResult {
                rule_id: rule.id.clone(),
                match_order: matched_rule.match_order,
                result: rule.result,
                terminal: rule.terminal,
                actions: Vec::with_capacity(rule.actions.len()),
            };

            for action in &rule.actions {
                match run_action(&env, action, accumulator).await {
                    Ok(()) => rule_result.actions.push(ActionOutcome {
                        action_type: action.kind,
                        success: true,
                        error: None,
                    }),
                    Err(ActionError::Blocked(block)) => {
                        info!(rule_id = %rule.id, "Block signal raised, aborting pass");
                        rule_result.actions.push(ActionOutcome {
                            action_type: action.kind,
                            success: true,
                            error: None,
                        });
                        result.rules.push(rule_result);
                        tracing::Span::current()
                            .record("duration_ms", start.elapsed().as_millis() as u64);
                        return Err(block);
                    }
                    Err(e) => {
                        warn!(
                            rule_id = %rule.id,
                            action = %action.kind,
                            "Action failed, continuing: {}",
                            e
                        );
                        rule_result.actions.push(ActionOutcome {
                            action_type: action.kind,
                            success: false,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }

            match rule.result {
                RuleResult::Block => {
                    result.should_block = true;
                    if result.block_reason.is_none() {
                        result.block_reason =
                            Some(rule_label(rule, format!("Blocked by rule '{}'", rule.id)));
                    }
                }
                RuleResult::Warn => result
                    .warnings
                    .push(rule_label(rule, format!("Warning from rule '{}'", rule.id))),
                RuleResult::Ok => {}
            }
            result.rules.push(rule_result);

            if rule.terminal {
                let remaining = matched.len() - position - 1;
                if remaining > 0 {
                    result.terminated_early = true;
                }
                debug!(rule_id = %rule.id, remaining, "Terminal rule, stopping");
                break;
            }
        }

        tracing::Span::current().record("duration_ms", start.elapsed().as_millis() as u64);
        Ok(())
    }
}
