//! `session_get` / `project_get`

use serde_json::Value;
use tracing::warn;

use crate::engine::state::{ProjectStore, SessionStore};

/// Objects and arrays are not exposed to expressions
fn scalar(value: Option<Value>) -> Value {
    match value {
        Some(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
        _ => Value::Null,
    }
}

pub fn session_get(store: Option<&dyn SessionStore>, session_id: &str, key: &str) -> Value {
    let Some(store) = store else {
        return Value::Null;
    };
    match store.get(session_id, key) {
        Ok(value) => scalar(value),
        Err(e) => {
            warn!(session_id, key, "session_get failed: {}", e);
            Value::Null
        }
    }
}

pub fn project_get(store: Option<&dyn ProjectStore>, key: &str) -> Value {
    let Some(store) = store else {
        return Value::Null;
    };
    match store.get(key) {
        Ok(value) => scalar(value),
        Err(e) => {
            warn!(key, "project_get failed: {}", e);
            Value::Null
        }
    }
}
