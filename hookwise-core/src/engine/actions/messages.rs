//! `warn`, `suggest` / `inject` and `log`

use tracing::{debug, error, info, warn as log_warn};

use super::{ActionEnv, ActionError};
use crate::engine::action::{ActionConfig, LogLevel};
use crate::engine::outputs::OutputAccumulator;

pub(super) fn warn(env: &ActionEnv<'_>, action: &ActionConfig, accumulator: &mut OutputAccumulator) {
    let message = action
        .text()
        .map(|text| env.render(text))
        .unwrap_or_else(|| env.default_warning());
    accumulator.add_system_message(message);
}

/// Append context when the event accepts it; anywhere else this is a logged
/// no-op
pub(super) fn inject(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    accumulator: &mut OutputAccumulator,
) -> Result<(), ActionError> {
    let event = env.context.hook_event_type;
    if !event.supports_context_injection() {
        log_warn!(
            rule_id = %env.rule.id,
            action = %action.kind,
            hook_type = %event,
            "Context injection is not supported for this event, skipping"
        );
        return Ok(());
    }

    let content = action.injected_text().ok_or_else(|| {
        ActionError::InvalidConfig(format!("{} action requires 'content'", action.kind))
    })?;
    accumulator.add_context(env.render(content));
    Ok(())
}

pub(super) fn log(env: &ActionEnv<'_>, action: &ActionConfig) {
    let message = env.render(action.text().unwrap_or_default());
    let rule_id = env.rule.id.as_str();
    let hook_type = env.context.hook_event_type.as_str();

    match action.level.unwrap_or_default() {
        LogLevel::Debug => debug!(target: "hookwise::rules", rule_id, hook_type, "{}", message),
        LogLevel::Info => info!(target: "hookwise::rules", rule_id, hook_type, "{}", message),
        LogLevel::Warning => {
            log_warn!(target: "hookwise::rules", rule_id, hook_type, "{}", message)
        }
        LogLevel::Error => error!(target: "hookwise::rules", rule_id, hook_type, "{}", message),
    }
}
