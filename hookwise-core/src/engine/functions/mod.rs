//! Builtin functions callable from condition expressions
//!
//! The catalog is fixed: expressions are checked against [`FUNCTIONS`] at
//! compile time, so an unknown name never reaches evaluation. A
//! [`FunctionRegistry`] binds the catalog to one invocation's data (cwd, git
//! snapshot, state stores, environment capability) and is built fresh for
//! every hook event.
//!
//! Every function fails open on bad arguments: a wrong type yields `false`
//! (predicates) or `null` (accessors) rather than an error. Only the number
//! of arguments is enforced.

mod git;
mod paths;
mod state;

use regex::Regex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use super::context::{GitState, HookContext};
use super::state::{ProjectStore, SessionStore};

pub use paths::{is_path_under, resolve_path};

/// Capability used by `env(name)`
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment capability backed by the process environment
pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

/// Environment capability backed by a fixed set of variables
pub fn fixed_env<I, K, V>(vars: I) -> EnvLookup
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: std::collections::HashMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Arc::new(move |name| vars.get(name).cloned())
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub signature: &'static str,
}

const fn spec(
    name: &'static str,
    min_args: usize,
    max_args: usize,
    signature: &'static str,
) -> FunctionSpec {
    FunctionSpec {
        name,
        min_args,
        max_args,
        signature,
    }
}

pub const FUNCTIONS: &[FunctionSpec] = &[
    spec("is_path_under", 2, 2, "is_path_under(path, base)"),
    spec("file_exists", 1, 1, "file_exists(path)"),
    spec("is_executable", 1, 1, "is_executable(path)"),
    spec("is_dir", 1, 1, "is_dir(path)"),
    spec("matches_glob", 2, 2, "matches_glob(path, pattern)"),
    spec("env", 1, 1, "env(name)"),
    spec("is_git_repo", 0, 0, "is_git_repo()"),
    spec("is_staged", 1, 1, "is_staged(path)"),
    spec("is_modified", 1, 1, "is_modified(path)"),
    spec("has_conflicts", 0, 0, "has_conflicts()"),
    spec("current_branch", 0, 0, "current_branch()"),
    spec("git_has_staged", 0, 1, "git_has_staged(pattern?)"),
    spec("git_has_modified", 0, 1, "git_has_modified(pattern?)"),
    spec("git_has_untracked", 0, 1, "git_has_untracked(pattern?)"),
    spec("git_has_conflicts", 0, 1, "git_has_conflicts(pattern?)"),
    spec("git_file_in", 2, 2, "git_file_in(path, set_name)"),
    spec("session_get", 1, 1, "session_get(key)"),
    spec("project_get", 1, 1, "project_get(key)"),
    spec("regex_match", 2, 2, "regex_match(value, pattern)"),
    spec("lower", 1, 1, "lower(value)"),
];

pub fn lookup(name: &str) -> Option<&'static FunctionSpec> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

pub fn is_known_function(name: &str) -> bool {
    lookup(name).is_some()
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    #[error("Unknown function '{0}'")]
    Unknown(String),

    #[error("{signature} takes {expected} argument(s), got {got}")]
    Arity {
        signature: &'static str,
        expected: String,
        got: usize,
    },
}

/// The catalog bound to one invocation
pub struct FunctionRegistry {
    cwd: PathBuf,
    git: Option<GitState>,
    session_id: String,
    session_store: Option<Arc<dyn SessionStore>>,
    project_store: Option<Arc<dyn ProjectStore>>,
    env: EnvLookup,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("cwd", &self.cwd)
            .field("session_id", &self.session_id)
            .field("has_git", &self.git.is_some())
            .field("has_session_store", &self.session_store.is_some())
            .field("has_project_store", &self.project_store.is_some())
            .finish()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        FunctionRegistry::builder().build()
    }
}

impl FunctionRegistry {
    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::default()
    }

    /// Registry bound to a context's cwd, session and git snapshot. Stores
    /// and environment stay unset.
    pub fn for_context(context: &HookContext) -> FunctionRegistryBuilder {
        let mut builder = FunctionRegistry::builder()
            .cwd(context.cwd.clone())
            .session_id(context.claude_session_id.clone());
        if let Some(git) = &context.git {
            builder = builder.git(git.clone());
        }
        builder
    }

    pub fn contains(&self, name: &str) -> bool {
        is_known_function(name)
    }

    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, FunctionError> {
        let spec = lookup(name).ok_or_else(|| FunctionError::Unknown(name.to_string()))?;
        if args.len() < spec.min_args || args.len() > spec.max_args {
            let expected = if spec.min_args == spec.max_args {
                spec.min_args.to_string()
            } else {
                format!("{}-{}", spec.min_args, spec.max_args)
            };
            return Err(FunctionError::Arity {
                signature: spec.signature,
                expected,
                got: args.len(),
            });
        }

        let arg = |i: usize| args.get(i).and_then(Value::as_str);
        let git = self.git.as_ref();

        let value = match name {
            "is_path_under" => Value::Bool(match (arg(0), arg(1)) {
                (Some(path), Some(base)) => is_path_under(&self.cwd, path, base),
                _ => false,
            }),
            "file_exists" => bool_or_false(arg(0).map(|p| paths::file_exists(&self.cwd, p))),
            "is_executable" => bool_or_false(arg(0).map(|p| paths::is_executable(&self.cwd, p))),
            "is_dir" => bool_or_false(arg(0).map(|p| paths::is_dir(&self.cwd, p))),
            "matches_glob" => Value::Bool(match (arg(0), arg(1)) {
                (Some(path), Some(pattern)) => paths::matches_glob(path, pattern),
                _ => false,
            }),
            "env" => arg(0)
                .and_then(|name| (self.env)(name))
                .map(Value::String)
                .unwrap_or(Value::Null),
            "is_git_repo" => Value::Bool(git::is_git_repo(&self.cwd)),
            "is_staged" => {
                bool_or_false(arg(0).map(|p| git::file_in(git, &self.cwd, p, "staged")))
            }
            "is_modified" => {
                bool_or_false(arg(0).map(|p| git::file_in(git, &self.cwd, p, "modified")))
            }
            "has_conflicts" => Value::Bool(git.is_some_and(GitState::has_conflicts)),
            "current_branch" => git
                .and_then(|g| g.branch.clone())
                .map(Value::String)
                .unwrap_or(Value::Null),
            "git_has_staged" => Value::Bool(git::has_any(git, "staged", args.first())),
            "git_has_modified" => Value::Bool(git::has_any(git, "modified", args.first())),
            "git_has_untracked" => Value::Bool(git::has_any(git, "untracked", args.first())),
            "git_has_conflicts" => Value::Bool(git::has_any(git, "conflict", args.first())),
            "git_file_in" => Value::Bool(match (arg(0), arg(1)) {
                (Some(path), Some(set)) => git::file_in(git, &self.cwd, path, set),
                _ => false,
            }),
            "session_get" => arg(0)
                .map(|key| {
                    state::session_get(self.session_store.as_deref(), &self.session_id, key)
                })
                .unwrap_or(Value::Null),
            "project_get" => arg(0)
                .map(|key| state::project_get(self.project_store.as_deref(), key))
                .unwrap_or(Value::Null),
            "regex_match" => Value::Bool(match (arg(0), arg(1)) {
                (Some(value), Some(pattern)) => Regex::new(pattern)
                    .map(|re| re.is_match(value))
                    .unwrap_or(false),
                _ => false,
            }),
            "lower" => arg(0)
                .map(|s| Value::String(s.to_lowercase()))
                .unwrap_or(Value::Null),
            _ => return Err(FunctionError::Unknown(name.to_string())),
        };
        Ok(value)
    }
}

fn bool_or_false(result: Option<bool>) -> Value {
    Value::Bool(result.unwrap_or(false))
}

#[derive(Default)]
pub struct FunctionRegistryBuilder {
    cwd: Option<PathBuf>,
    git: Option<GitState>,
    session_id: String,
    session_store: Option<Arc<dyn SessionStore>>,
    project_store: Option<Arc<dyn ProjectStore>>,
    env: Option<EnvLookup>,
}

impl FunctionRegistryBuilder {
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn git(mut self, git: GitState) -> Self {
        self.git = Some(git);
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn project_store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.project_store = Some(store);
        self
    }

    pub fn env(mut self, env: EnvLookup) -> Self {
        self.env = Some(env);
        self
    }

    /// Without an explicit environment capability `env()` always yields null
    pub fn build(self) -> FunctionRegistry {
        FunctionRegistry {
            cwd: self
                .cwd
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_default()),
            git: self.git,
            session_id: self.session_id,
            session_store: self.session_store,
            project_store: self.project_store,
            env: self.env.unwrap_or_else(|| Arc::new(|_| None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::MemoryStore;
    use serde_json::json;

    fn registry() -> FunctionRegistry {
        FunctionRegistry::builder()
            .cwd("/work/project")
            .env(fixed_env([("CI", "true")]))
            .build()
    }

    #[test]
    fn test_catalog_has_twenty_functions() {
        assert_eq!(FUNCTIONS.len(), 20);
        assert!(is_known_function("is_path_under"));
        assert!(!is_known_function("eval"));
    }

    #[test]
    fn test_arity_is_enforced() {
        let err = registry().call("file_exists", &[]).unwrap_err();
        assert!(matches!(err, FunctionError::Arity { got: 0, .. }));

        let err = registry()
            .call("git_has_staged", &[json!("a"), json!("b")])
            .unwrap_err();
        assert!(err.to_string().contains("0-1"));
    }

    #[test]
    fn test_wrong_argument_types_fail_open() {
        let r = registry();
        let cases = [
            ("is_path_under", vec![json!(1), json!("/tmp")]),
            ("file_exists", vec![json!(null)]),
            ("is_executable", vec![json!([1])]),
            ("is_dir", vec![json!({})]),
            ("matches_glob", vec![json!("a.rs"), json!(3)]),
            ("is_staged", vec![json!(true)]),
            ("is_modified", vec![json!(1.5)]),
            ("git_has_staged", vec![json!(7)]),
            ("git_file_in", vec![json!("a"), json!(false)]),
            ("regex_match", vec![json!(1), json!("\\d")]),
        ];
        for (name, args) in cases {
            assert_eq!(r.call(name, &args).unwrap(), json!(false), "{name}");
        }

        for (name, args) in [
            ("env", vec![json!(1)]),
            ("session_get", vec![json!(1)]),
            ("project_get", vec![json!(null)]),
            ("lower", vec![json!(42)]),
        ] {
            assert_eq!(r.call(name, &args).unwrap(), Value::Null, "{name}");
        }
    }

    #[test]
    fn test_env_uses_injected_capability() {
        let r = registry();
        assert_eq!(r.call("env", &[json!("CI")]).unwrap(), json!("true"));
        assert_eq!(r.call("env", &[json!("HOME_NOT_SET")]).unwrap(), Value::Null);

        let bare = FunctionRegistry::builder().cwd("/").build();
        assert_eq!(bare.call("env", &[json!("CI")]).unwrap(), Value::Null);
    }

    #[test]
    #[serial_test::serial(process_env)]
    fn test_process_env_reads_live_environment() {
        let r = FunctionRegistry::builder()
            .cwd("/")
            .env(process_env())
            .build();

        std::env::set_var("HOOKWISE_FN_TEST", "one");
        assert_eq!(r.call("env", &[json!("HOOKWISE_FN_TEST")]).unwrap(), json!("one"));
        std::env::remove_var("HOOKWISE_FN_TEST");
        assert_eq!(r.call("env", &[json!("HOOKWISE_FN_TEST")]).unwrap(), Value::Null);
    }

    #[test]
    fn test_regex_match_and_lower() {
        let r = registry();
        assert_eq!(
            r.call("regex_match", &[json!("git push --force"), json!("--force\\b")])
                .unwrap(),
            json!(true)
        );
        assert_eq!(
            r.call("regex_match", &[json!("abc"), json!("(")]).unwrap(),
            json!(false)
        );
        assert_eq!(r.call("lower", &[json!("README.MD")]).unwrap(), json!("readme.md"));
    }

    #[test]
    fn test_state_lookups() {
        let store = Arc::new(
            MemoryStore::from_json(&json!({
                "sessions": {"s1": {"mode": "plan", "nested": {"a": 1}}},
                "project": {"frozen": true}
            }))
            .unwrap(),
        );
        let r = FunctionRegistry::builder()
            .session_id("s1")
            .session_store(store.clone())
            .project_store(store)
            .build();

        assert_eq!(r.call("session_get", &[json!("mode")]).unwrap(), json!("plan"));
        assert_eq!(r.call("session_get", &[json!("nested")]).unwrap(), Value::Null);
        assert_eq!(r.call("project_get", &[json!("frozen")]).unwrap(), json!(true));
        assert_eq!(r.call("project_get", &[json!("missing")]).unwrap(), Value::Null);
    }
}
