//! Diagnostic commands: validate, simulate, rules list/test
//!
//! All output is JSON on stdout so it can be piped into `jq`.

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

use hookwise_core::debug::{trace_rules, validate_expression};
use hookwise_core::engine::rule::{Priority, RuleResult};
use hookwise_core::{Engine, HookContext};

use crate::{load_context, Cli};

#[derive(Parser, Debug)]
pub(crate) enum RulesCommand {
    /// List loaded rules in definition order
    List,

    /// Trace every rule against an event, then evaluate it
    Test {
        /// Event JSON file, or '-' for stdin
        #[clap(long, default_value = "-")]
        event: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct RuleSummary<'a> {
    id: &'a str,
    priority: Priority,
    events: Vec<&'a str>,
    condition: &'a str,
    enabled: bool,
    terminal: bool,
    result: RuleResult,
    actions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<&'a str>,
}

impl RulesCommand {
    pub(crate) async fn execute(&self, cli: &Cli, engine: &Engine) -> Result<()> {
        match self {
            RulesCommand::List => {
                let summaries: Vec<RuleSummary> = engine
                    .rules()
                    .iter()
                    .map(|rule| RuleSummary {
                        id: &rule.id,
                        priority: rule.priority,
                        events: rule.events.names().collect(),
                        condition: &rule.condition,
                        enabled: rule.enabled,
                        terminal: rule.terminal,
                        result: rule.result,
                        actions: rule.actions.len(),
                        source_file: rule.source_file.as_deref(),
                    })
                    .collect();
                print_json(&summaries)
            }
            RulesCommand::Test { event } => {
                let context = load_context(cli, event)?;
                let functions = engine.function_registry(&context);
                let traces = trace_rules(engine.rules(), &context, &functions);
                let outcome = engine.evaluate(&context).await;
                print_json(&json!({ "trace": traces, "outcome": outcome }))
            }
        }
    }
}

pub(crate) fn validate_command(expression: &str) -> Result<()> {
    let report = validate_expression(expression);
    print_json(&report)?;
    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one rule in isolation; the rule's own `enabled` flag still applies
pub(crate) async fn simulate_command(engine: &Engine, context: &HookContext, rule_id: &str) -> Result<()> {
    let Some(rule) = engine.rule(rule_id) else {
        bail!("No rule with id '{}'", rule_id);
    };
    let rules = std::slice::from_ref(rule);

    let functions = engine.function_registry(context);
    let trace = trace_rules(rules, context, &functions);
    let outcome = engine.evaluate_rules(rules, context).await;
    print_json(&json!({ "trace": trace, "outcome": outcome }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
