//! Read-only diagnostics over the engine
//!
//! Everything here reuses the engine's own decision functions, so a trail
//! printed by the CLI always agrees with what real evaluation does.

use serde::Serialize;

use crate::engine::context::HookContext;
use crate::engine::expression::{self, ExpressionErrorKind};
use crate::engine::functions::FunctionRegistry;
use crate::engine::matcher::{rule_verdict, RuleVerdict};
use crate::engine::rule::{Priority, Rule};

/// Result of checking one expression in isolation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionReport {
    pub expression: String,
    pub valid: bool,
    pub always_matches: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

pub fn validate_expression(source: &str) -> ExpressionReport {
    let mut report = ExpressionReport {
        expression: source.to_string(),
        valid: true,
        always_matches: source.trim().is_empty(),
        error_kind: None,
        error: None,
        position: None,
    };
    if let Err(e) = expression::validate(source) {
        report.valid = false;
        report.error = Some(e.kind.to_string());
        let (kind, position) = match e.kind {
            ExpressionErrorKind::Syntax { position, .. } => ("syntax", Some(position)),
            ExpressionErrorKind::UnknownFunction(_) => ("unknown_function", None),
            ExpressionErrorKind::UnknownVariable(_) => ("unknown_variable", None),
            ExpressionErrorKind::Evaluation(_) => ("evaluation", None),
        };
        report.error_kind = Some(kind);
        report.position = position;
    }
    report
}

/// One step of the match trail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum MatchTrail {
    Disabled,
    EventMismatch,
    ConditionFalse,
    ConditionError(String),
    Matched,
}

impl From<RuleVerdict> for MatchTrail {
    fn from(verdict: RuleVerdict) -> Self {
        match verdict {
            RuleVerdict::Disabled => MatchTrail::Disabled,
            RuleVerdict::EventMismatch => MatchTrail::EventMismatch,
            RuleVerdict::ConditionFalse => MatchTrail::ConditionFalse,
            RuleVerdict::ConditionError(e) => MatchTrail::ConditionError(e.to_string()),
            RuleVerdict::Matched => MatchTrail::Matched,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleTrace {
    pub rule_id: String,
    pub priority: Priority,
    pub condition: String,
    pub trail: MatchTrail,
    /// Execution position when matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_order: Option<usize>,
}

/// Trace every rule against an event, in definition order
pub fn trace_rules(
    rules: &[Rule],
    context: &HookContext,
    functions: &FunctionRegistry,
) -> Vec<RuleTrace> {
    let eval_context = context.to_eval_context();
    let mut traces: Vec<RuleTrace> = rules
        .iter()
        .map(|rule| RuleTrace {
            rule_id: rule.id.clone(),
            priority: rule.priority,
            condition: rule.condition.clone(),
            trail: rule_verdict(rule, context.hook_event_type, &eval_context, functions).into(),
            match_order: None,
        })
        .collect();

    let mut order: Vec<usize> = (0..rules.len())
        .filter(|&i| traces[i].trail == MatchTrail::Matched)
        .collect();
    order.sort_by_key(|&i| (rules[i].priority.rank(), i));
    for (match_order, index) in order.into_iter().enumerate() {
        traces[index].match_order = Some(match_order);
    }
    traces
}
