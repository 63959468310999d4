//! `modify`: rewrite one tool-input field

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ActionEnv, ActionError};
use crate::engine::action::{ActionConfig, ModifyOperation};
use crate::engine::outputs::OutputAccumulator;

pub(super) fn run(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let event = env.context.hook_event_type;
    if !event.supports_input_mutation() {
        warn!(
            rule_id = %env.rule.id,
            hook_type = %event,
            "modify is not supported for this event, skipping"
        );
        return Ok(());
    }

    let field = action
        .field
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ActionError::InvalidConfig("modify action requires 'field'".into()))?;
    let operation = action.operation.unwrap_or_default();
    let value = action.value.clone().unwrap_or(Value::Null);

    // earlier modifications win over the original input
    let current = accumulator.updated_input.get(field).cloned().or_else(|| {
        env.context
            .hook_input
            .tool_input()
            .and_then(|input| input.get(field))
            .cloned()
    });

    let updated = match operation {
        ModifyOperation::Set => Some(value),
        ModifyOperation::Append | ModifyOperation::Prepend => {
            match (current.as_ref(), value.as_str()) {
                (Some(Value::String(existing)), Some(extra)) => {
                    Some(Value::String(if operation == ModifyOperation::Append {
                        format!("{existing}{extra}")
                    } else {
                        format!("{extra}{existing}")
                    }))
                }
                (None | Some(Value::Null), Some(extra)) => Some(Value::String(extra.to_string())),
                _ => None,
            }
        }
        ModifyOperation::Replace => {
            let pattern = action.pattern.as_deref().ok_or_else(|| {
                ActionError::InvalidConfig("replace operation requires 'pattern'".into())
            })?;
            let regex = Regex::new(pattern)
                .map_err(|e| ActionError::InvalidConfig(format!("invalid pattern: {e}")))?;
            let replacement = value.as_str().unwrap_or_default();
            match current.as_ref() {
                Some(Value::String(existing)) => Some(Value::String(
                    regex.replace_all(existing, replacement).into_owned(),
                )),
                _ => None,
            }
        }
    };

    match updated {
        Some(new_value) => {
            debug!(rule_id = %env.rule.id, field, "Modified tool input field");
            accumulator.update_input_field(field, new_value);
        }
        None => warn!(
            rule_id = %env.rule.id,
            field,
            "Cannot apply {:?} to a non-string value, leaving field unchanged",
            operation
        ),
    }
    Ok(())
}
