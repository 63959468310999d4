//! Test helpers shared by the integration tests (tests/common/ pattern)

#![allow(dead_code)]

use hookwise_core::{HookContext, HookEvent, RuleSet};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn context(event: Value) -> HookContext {
    let event: HookEvent = serde_json::from_value(event).expect("valid hook event");
    HookContext::from_event(event)
}

pub fn bash_event(command: &str, cwd: &Path) -> Value {
    json!({
        "hook_event_name": "PreToolUse",
        "session_id": "it-session",
        "transcript_path": "/tmp/transcript.jsonl",
        "cwd": cwd,
        "tool_name": "Bash",
        "tool_use_id": "toolu_01",
        "tool_input": {"command": command, "description": "test command"}
    })
}

pub fn rules(toml: &str) -> RuleSet {
    RuleSet::from_toml_str(toml, Path::new("inline.toml")).expect("valid rules")
}

/// Write an executable script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).expect("script metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod script");
    }
    path
}
