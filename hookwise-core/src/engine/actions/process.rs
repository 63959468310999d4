//! Subprocess execution for `shell` and `transform`

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

use super::{ActionEnv, ActionError};
use crate::engine::action::{ActionConfig, StdinMode};
use crate::engine::functions::resolve_path;

#[derive(Debug)]
pub(super) struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// Decode lossily and cut to at most `max_bytes` on a char boundary.
/// Returns the text and whether anything was dropped.
pub fn truncate_output(bytes: &[u8], max_bytes: usize) -> (String, bool) {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= max_bytes {
        return (text.into_owned(), false);
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (text[..end].to_string(), true)
}

fn build_command(env: &ActionEnv<'_>, action: &ActionConfig) -> Result<(Command, String), ActionError> {
    let workdir = action
        .cwd
        .as_deref()
        .map(|dir| resolve_path(&env.context.cwd, dir))
        .unwrap_or_else(|| env.context.cwd.clone());

    let (mut command, program) = if let Some(line) = action.command.as_deref() {
        let shell = env.settings.shell(action.shell.as_deref());
        let mut command = Command::new(shell);
        command.arg("-c").arg(line);
        (command, shell.to_string())
    } else if let Some(script) = action.script.as_deref() {
        let words = shell_words::split(script)
            .map_err(|e| ActionError::InvalidConfig(format!("cannot split script '{script}': {e}")))?;
        let Some((program, args)) = words.split_first() else {
            return Err(ActionError::InvalidConfig("script is empty".into()));
        };
        // relative script paths are relative to the action's working directory
        let program_path = if program.contains('/') || program.starts_with('~') {
            resolve_path(&workdir, program)
        } else {
            PathBuf::from(program)
        };
        let mut command = Command::new(&program_path);
        command.args(args);
        (command, program_path.display().to_string())
    } else {
        return Err(ActionError::InvalidConfig(format!(
            "{} action requires 'command' or 'script'",
            action.kind
        )));
    };

    if workdir.is_dir() {
        command.current_dir(&workdir);
    } else {
        warn!(
            rule_id = %env.rule.id,
            "Working directory {} does not exist, inheriting the current one",
            workdir.display()
        );
    }

    command
        .envs(&action.env)
        .env("HOOKWISE_HOOK_TYPE", env.context.hook_event_type.as_str())
        .env("HOOKWISE_SESSION_ID", &env.context.claude_session_id)
        .env("HOOKWISE_RULE_ID", &env.rule.id)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    Ok((command, program))
}

/// Write the context and close the pipe. The child may exit without
/// reading it, which is not an action failure.
async fn feed_stdin(mut stdin: ChildStdin, payload: Vec<u8>, rule_id: String) {
    let written = match stdin.write_all(&payload).await {
        Ok(()) => stdin.shutdown().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        debug!(rule_id = %rule_id, "stdin not consumed: {}", e);
    }
}

/// Spawn the action's command, feed stdin, and wait under the timeout.
/// The child is killed if the timeout fires.
pub(super) async fn run(
    env: &ActionEnv<'_>,
    action: &ActionConfig,
    default_stdin: StdinMode,
) -> Result<ProcessOutput, ActionError> {
    let (mut command, program) = build_command(env, action)?;
    let stdin_mode = action.stdin.unwrap_or(default_stdin);
    command.stdin(match stdin_mode {
        StdinMode::Json => Stdio::piped(),
        StdinMode::None => Stdio::null(),
    });

    debug!(rule_id = %env.rule.id, action = %action.kind, "Spawning {}", program);
    let mut child = command
        .spawn()
        .map_err(|source| ActionError::Spawn { program, source })?;

    // fed concurrently with the wait; the deadline covers the write
    let feeder = match child.stdin.take() {
        Some(stdin) => {
            let payload = serde_json::to_vec(env.eval_context)
                .map_err(|e| ActionError::Execution(format!("cannot serialize context: {e}")))?;
            Some(tokio::spawn(feed_stdin(stdin, payload, env.rule.id.clone())))
        }
        None => None,
    };

    let timeout = env.settings.timeout(action.timeout_ms);
    let waited = tokio::time::timeout(timeout, child.wait_with_output()).await;
    if let Some(feeder) = feeder {
        feeder.abort();
    }
    let output = waited.map_err(|_| ActionError::Timeout(timeout))??;

    let max = env.settings.max_output_bytes;
    let (stdout, stdout_truncated) = truncate_output(&output.stdout, max);
    let (stderr, stderr_truncated) = truncate_output(&output.stderr, max);
    if stdout_truncated || stderr_truncated {
        warn!(rule_id = %env.rule.id, "Output truncated to {} bytes", max);
    }

    Ok(ProcessOutput {
        stdout,
        stderr,
        status: output.status,
    })
}
