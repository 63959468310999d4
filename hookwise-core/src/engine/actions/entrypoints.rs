//! In-process automation callables
//!
//! Hosts register Rust functions under `module.path:function` names. The
//! `python` and `transform` actions look them up by that name and call them
//! with the adapted context.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::ActionError;

pub type Callable = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone)]
pub enum Symbol {
    Callable(Callable),
    /// A registered non-callable value, reported as `NotCallable`
    Value(Value),
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Callable(_) => f.write_str("Symbol::Callable(..)"),
            Symbol::Value(value) => f.debug_tuple("Symbol::Value").field(value).finish(),
        }
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split `module.path:function`, validating every identifier
pub fn parse_entrypoint(entrypoint: &str) -> Result<(&str, &str), ActionError> {
    let invalid = || ActionError::InvalidEntrypoint(entrypoint.to_string());
    let (module, function) = entrypoint.trim().split_once(':').ok_or_else(invalid)?;
    if !module.split('.').all(is_identifier) || !is_identifier(function) {
        return Err(invalid());
    }
    Ok((module, function))
}

#[derive(Clone, Default)]
pub struct EntrypointRegistry {
    modules: HashMap<String, HashMap<String, Symbol>>,
}

impl fmt::Debug for EntrypointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .modules
            .iter()
            .flat_map(|(module, symbols)| symbols.keys().map(move |s| format!("{module}:{s}")))
            .collect();
        names.sort();
        f.debug_struct("EntrypointRegistry")
            .field("entrypoints", &names)
            .finish()
    }
}

impl EntrypointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, entrypoint: &str, symbol: Symbol) -> Result<(), ActionError> {
        let (module, name) = parse_entrypoint(entrypoint)?;
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn register<F>(&mut self, entrypoint: &str, function: F) -> Result<(), ActionError>
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.insert(entrypoint, Symbol::Callable(Arc::new(function)))
    }

    pub fn register_value(&mut self, entrypoint: &str, value: Value) -> Result<(), ActionError> {
        self.insert(entrypoint, Symbol::Value(value))
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Resolve to a callable, classifying each way the lookup can fail
    pub fn resolve(&self, entrypoint: &str) -> Result<Callable, ActionError> {
        let (module, name) = parse_entrypoint(entrypoint)?;
        let symbols = self
            .modules
            .get(module)
            .ok_or_else(|| ActionError::ModuleNotFound(module.to_string()))?;
        match symbols.get(name) {
            Some(Symbol::Callable(callable)) => Ok(callable.clone()),
            Some(Symbol::Value(_)) => Err(ActionError::NotCallable(entrypoint.to_string())),
            None => Err(ActionError::SymbolNotFound {
                module: module.to_string(),
                symbol: name.to_string(),
            }),
        }
    }

    /// Call an entrypoint on the blocking pool under `timeout`.
    ///
    /// A callable that overruns is abandoned, not stopped: the blocking
    /// thread finishes on its own and its result is dropped.
    pub async fn invoke(
        &self,
        entrypoint: &str,
        argument: Value,
        timeout: Duration,
    ) -> Result<Value, ActionError> {
        let callable = self.resolve(entrypoint)?;
        let task = tokio::task::spawn_blocking(move || callable(&argument));

        match tokio::time::timeout(timeout, task).await {
            Err(_) => Err(ActionError::Timeout(timeout)),
            Ok(Err(join_error)) if join_error.is_panic() => Err(ActionError::Execution(
                format!("{entrypoint} panicked"),
            )),
            Ok(Err(join_error)) => Err(ActionError::Execution(join_error.to_string())),
            Ok(Ok(Err(e))) => Err(ActionError::Execution(format!("{e:#}"))),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> EntrypointRegistry {
        let mut registry = EntrypointRegistry::new();
        registry
            .register("checks.lint:run", |ctx| {
                Ok(json!({"warn": format!("linted {}", ctx["tool_name"])}))
            })
            .unwrap();
        registry
            .register("checks.lint:explode", |_| anyhow::bail!("lint crashed"))
            .unwrap();
        registry
            .register("checks.lint:panic", |_| panic!("boom"))
            .unwrap();
        registry
            .register("checks.slow:run", |_| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(Value::Null)
            })
            .unwrap();
        registry
            .register_value("checks.lint:VERSION", json!("1.0"))
            .unwrap();
        registry
    }

    #[test]
    fn test_parse_entrypoint() {
        assert_eq!(parse_entrypoint("a.b_c:run").unwrap(), ("a.b_c", "run"));
        for bad in ["", "no_colon", "a..b:run", "a:", ":run", "a-b:run", "a:run:x", "1a:run"] {
            assert!(
                matches!(parse_entrypoint(bad), Err(ActionError::InvalidEntrypoint(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_resolution_errors_are_classified() {
        let registry = registry();
        assert!(registry.resolve("checks.lint:run").is_ok());
        assert!(matches!(
            registry.resolve("checks.missing:run"),
            Err(ActionError::ModuleNotFound(m)) if m == "checks.missing"
        ));
        assert!(matches!(
            registry.resolve("checks.lint:nothing"),
            Err(ActionError::SymbolNotFound { .. })
        ));
        assert!(matches!(
            registry.resolve("checks.lint:VERSION"),
            Err(ActionError::NotCallable(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_outcomes() {
        let registry = registry();
        let timeout = Duration::from_secs(5);

        let value = registry
            .invoke("checks.lint:run", json!({"tool_name": "Bash"}), timeout)
            .await
            .unwrap();
        assert_eq!(value, json!({"warn": "linted \"Bash\""}));

        let err = registry
            .invoke("checks.lint:explode", Value::Null, timeout)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Execution(ref m) if m.contains("lint crashed")));

        let err = registry
            .invoke("checks.lint:panic", Value::Null, timeout)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Execution(ref m) if m.contains("panicked")));

        let err = registry
            .invoke("checks.slow:run", Value::Null, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Timeout(_)));
    }
}
