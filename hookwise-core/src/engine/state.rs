//! Session and project key-value capabilities
//!
//! The engine only reads from these stores (through `session_get` and
//! `project_get`). Persistence is the host's business; [`MemoryStore`] is
//! the in-process implementation used by tests and the CLI.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State store lock poisoned")]
    Poisoned,

    #[error("State store backend error: {0}")]
    Backend(String),

    #[error("Invalid state document: {0}")]
    InvalidDocument(String),
}

/// Per-session key-value state
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, session_id: &str, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Project-wide key-value state
pub trait ProjectStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, HashMap<String, Value>>>,
    project: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON document of the form
    /// `{"sessions": {"<id>": {...}}, "project": {...}}`. Both keys are optional.
    pub fn from_json(document: &Value) -> Result<Self, StoreError> {
        let root = document
            .as_object()
            .ok_or_else(|| StoreError::InvalidDocument("expected a JSON object".into()))?;

        let store = MemoryStore::new();
        if let Some(sessions) = root.get("sessions") {
            let sessions = object(sessions, "sessions")?;
            for (session_id, entries) in sessions {
                for (key, value) in object(entries, session_id)? {
                    SessionStore::set(&store, session_id, key, value.clone())?;
                }
            }
        }
        if let Some(project) = root.get("project") {
            for (key, value) in object(project, "project")? {
                ProjectStore::set(&store, key, value.clone())?;
            }
        }
        Ok(store)
    }
}

fn object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, StoreError> {
    value
        .as_object()
        .ok_or_else(|| StoreError::InvalidDocument(format!("'{what}' must be an object")))
}

impl SessionStore for MemoryStore {
    fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions
            .get(session_id)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn set(&self, session_id: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}

impl ProjectStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let project = self.project.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(project.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut project = self.project.lock().map_err(|_| StoreError::Poisoned)?;
        project.insert(key.to_string(), value);
        Ok(())
    }
}
