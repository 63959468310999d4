//! Rule matching and scheduling
//!
//! Filters rules by enabled flag, event applicability and condition, then
//! orders the survivors by priority rank with definition order as the tie
//! break. A condition that fails to compile or evaluate only drops its own
//! rule; the pass always completes.

use tracing::{debug, warn};

use super::context::{EvalContext, HookContext};
use super::expression::{ExpressionError, ExpressionEvaluator};
use super::functions::FunctionRegistry;
use super::rule::Rule;
use crate::harness::types::HookEventType;

/// A rule selected for execution plus its position in execution order
#[derive(Debug, Clone, Copy)]
pub struct MatchedRule<'a> {
    pub rule: &'a Rule,
    /// 0-based position after sorting; diagnostics only
    pub match_order: usize,
}

/// Why a single rule did or did not match
#[derive(Debug, Clone, PartialEq)]
pub enum RuleVerdict {
    Disabled,
    EventMismatch,
    ConditionFalse,
    ConditionError(ExpressionError),
    Matched,
}

impl RuleVerdict {
    pub fn is_match(&self) -> bool {
        matches!(self, RuleVerdict::Matched)
    }
}

/// The per-rule decision shared by [`match_rules`] and the debug trail
pub fn rule_verdict(
    rule: &Rule,
    event: HookEventType,
    context: &EvalContext,
    functions: &FunctionRegistry,
) -> RuleVerdict {
    if !rule.enabled {
        return RuleVerdict::Disabled;
    }
    if !rule.applies_to(event) {
        return RuleVerdict::EventMismatch;
    }

    let outcome = ExpressionEvaluator::compile(&rule.condition, functions)
        .and_then(|evaluator| evaluator.evaluate_with(context));
    match outcome {
        Ok(true) => RuleVerdict::Matched,
        Ok(false) => RuleVerdict::ConditionFalse,
        Err(e) => RuleVerdict::ConditionError(e),
    }
}

/// Select and order the rules that apply to this event
pub fn match_rules<'a>(
    rules: &'a [Rule],
    context: &HookContext,
    functions: &FunctionRegistry,
) -> Vec<MatchedRule<'a>> {
    let eval_context = context.to_eval_context();
    let event = context.hook_event_type;

    let mut survivors: Vec<(usize, &'a Rule)> = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        match rule_verdict(rule, event, &eval_context, functions) {
            RuleVerdict::Matched => survivors.push((index, rule)),
            RuleVerdict::ConditionError(e) => {
                warn!(rule_id = %rule.id, hook_type = %event, "Condition failed, skipping rule: {}", e);
            }
            verdict => {
                debug!(rule_id = %rule.id, hook_type = %event, "Rule not matched: {:?}", verdict);
            }
        }
    }

    // rank first, then definition order
    survivors.sort_by_key(|(index, rule)| (rule.priority.rank(), *index));

    let matched: Vec<MatchedRule<'a>> = survivors
        .into_iter()
        .enumerate()
        .map(|(match_order, (_, rule))| MatchedRule { rule, match_order })
        .collect();

    debug!(
        hook_type = %event,
        "Matched {} of {} rules: {:?}",
        matched.len(),
        rules.len(),
        matched.iter().map(|m| m.rule.id.as_str()).collect::<Vec<_>>()
    );
    matched
}
