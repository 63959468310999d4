//! `${var}` / `${var.field}` substitution in action messages

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::context::EvalContext;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z_][A-Za-z0-9_]*))?\}")
        .expect("invalid regex")
});

/// Substitute placeholders against the adapted context.
///
/// Missing variables, missing fields and `null` all render as the empty
/// string. Strings are inserted verbatim; other values as compact JSON.
pub fn substitute(template: &str, context: &EvalContext) -> String {
    if !template.contains("${") {
        return template.to_string();
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let root = context.get(&caps[1]);
            let value = match caps.get(2) {
                Some(field) => root.and_then(|v| v.get(field.as_str())),
                None => root,
            };
            value.map(render).unwrap_or_default()
        })
        .into_owned()
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
