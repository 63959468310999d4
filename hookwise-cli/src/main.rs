//! Hookwise - hook rule engine for coding agents
//!
//! `hookwise eval` is the hook entrypoint: it reads one hook event on stdin
//! and prints the response JSON on stdout. Every other command is a read-only
//! diagnostic over the same engine.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use hookwise_core::engine::context::GitState;
use hookwise_core::engine::functions::process_env;
use hookwise_core::engine::state::MemoryStore;
use hookwise_core::harness::ClaudeHarness;
use hookwise_core::{Engine, HookContext, HookEvent, RuleSet};

mod debug_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "hookwise",
    about = "Rule matching and execution for coding-agent hook events",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Rule file (TOML); repeat to concatenate several in order
    #[clap(long = "rules", global = true)]
    rules: Vec<PathBuf>,

    /// Session/project state document: {"sessions": {...}, "project": {...}}
    #[clap(long, global = true)]
    state: Option<PathBuf>,

    /// Git status snapshot (JSON) exposed to git functions
    #[clap(long, global = true)]
    git: Option<PathBuf>,

    /// Set log level (HOOKWISE_LOG takes precedence when set)
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Parser, Debug)]
enum Command {
    /// Evaluate a hook event read from stdin and print the hook response
    Eval {
        /// Exit non-zero when the event cannot be read or parsed
        #[clap(long)]
        strict: bool,
    },

    /// Check an expression without evaluating it
    Validate {
        /// Expression source
        expression: String,
    },

    /// Run a single rule against an event and print its trail and outcome
    Simulate {
        /// Rule id
        #[clap(long)]
        rule: String,

        /// Event JSON file, or '-' for stdin
        #[clap(long, default_value = "-")]
        event: PathBuf,
    },

    /// Inspect the configured rules
    Rules {
        #[clap(subcommand)]
        command: debug_cli::RulesCommand,
    },
}

/// Logs always go to stderr; stdout carries the hook response
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::try_from_env("HOOKWISE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    match &cli.command {
        Command::Eval { strict } => eval_command(&cli, *strict).await,
        Command::Validate { expression } => debug_cli::validate_command(expression),
        Command::Simulate { rule, event } => {
            let engine = build_engine(&cli)?;
            let context = load_context(&cli, event)?;
            debug_cli::simulate_command(&engine, &context, rule).await
        }
        Command::Rules { command } => {
            let engine = build_engine(&cli)?;
            command.execute(&cli, &engine).await
        }
    }
}

fn load_rules(paths: &[PathBuf]) -> Result<RuleSet> {
    let mut set = RuleSet::default();
    for path in paths {
        set.extend_from_file(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?;
    }
    if paths.is_empty() {
        tracing::warn!("No --rules given, evaluating with an empty rule set");
    }
    Ok(set)
}

fn build_engine(cli: &Cli) -> Result<Engine> {
    let mut engine = Engine::from_rule_set(load_rules(&cli.rules)?).with_env(process_env());

    if let Some(path) = &cli.state {
        let document: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(path)
                .with_context(|| format!("Failed to read state file {}", path.display()))?,
        )
        .context("State file is not valid JSON")?;
        let store = Arc::new(MemoryStore::from_json(&document)?);
        engine = engine
            .with_session_store(store.clone())
            .with_project_store(store);
    }
    debug!("Engine ready with {} rules", engine.rules().len());
    Ok(engine)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read hook event from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn build_context(cli: &Cli, event: HookEvent) -> Result<HookContext> {
    let mut context = HookContext::from_event(event);
    if let Some(path) = &cli.git {
        let git: GitState = serde_json::from_str(
            &fs::read_to_string(path)
                .with_context(|| format!("Failed to read git snapshot {}", path.display()))?,
        )
        .context("Git snapshot is not valid JSON")?;
        context = context.with_git(git);
    }
    if let Ok(dir) = std::env::var("CLAUDE_PROJECT_DIR") {
        context = context.with_project_dir(dir);
    }
    Ok(context)
}

fn load_context(cli: &Cli, path: &Path) -> Result<HookContext> {
    let event = ClaudeHarness::parse_event(&read_input(path)?)?;
    build_context(cli, event)
}

async fn eval_command(cli: &Cli, strict: bool) -> Result<()> {
    // configuration errors are fatal; a bad event degrades to an empty response
    let engine = build_engine(cli)?;

    let event = match read_input(Path::new("-")).and_then(|raw| ClaudeHarness::parse_event(&raw)) {
        Ok(event) => event,
        Err(e) => {
            error!("Cannot evaluate hook event: {:#}", e);
            println!("{{}}");
            if strict {
                std::process::exit(1);
            }
            return Ok(());
        }
    };

    let context = build_context(cli, event.clone())?;
    let outcome = engine.evaluate(&context).await;
    let response = ClaudeHarness::format_response(&event, &outcome)?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
