//! Hook context and the flat evaluation view derived from it.
//!
//! A [`HookContext`] is built fresh for every hook invocation and is read-only
//! for the rest of the pass. Conditions, templates and automation actions never
//! see it directly: they consume the flat map produced by
//! [`HookContext::to_eval_context`], whose key set is fixed ([`CONTEXT_FIELDS`])
//! so that expressions can be checked for unknown names at compile time.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::trace::generate_trace_id;
use crate::harness::events::HookEvent;
use crate::harness::types::HookEventType;

/// Flat evaluation dictionary consumed by expressions and templates
pub type EvalContext = Map<String, Value>;

/// Every key [`HookContext::to_eval_context`] produces
pub const CONTEXT_FIELDS: &[&str] = &[
    "hook_type",
    "session_id",
    "timestamp",
    "cwd",
    "project_dir",
    "permission_mode",
    "transcript_path",
    "tool_name",
    "tool_input",
    "tool_output",
    "tool_use_id",
    "prompt",
    "git_branch",
    "git_head_commit",
    "git_is_dirty",
    "git_has_conflicts",
    "git_staged_files",
    "git_modified_files",
    "git_untracked_files",
    "git_conflict_files",
    "project_staged_count",
    "project_modified_count",
    "project_untracked_count",
    "project_files_changed",
    "project_insertions",
    "project_deletions",
    "project_recent_commits",
];

/// Snapshot of the repository's git status at event time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitState {
    pub branch: Option<String>,
    pub head_commit: Option<String>,
    pub is_dirty: bool,
    pub staged_files: BTreeSet<String>,
    pub modified_files: BTreeSet<String>,
    pub untracked_files: BTreeSet<String>,
    pub conflict_files: BTreeSet<String>,
}

/// Named file sets inside a [`GitState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitFileSet {
    Staged,
    Modified,
    Untracked,
    Conflict,
}

impl GitFileSet {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "staged" => Some(GitFileSet::Staged),
            "modified" => Some(GitFileSet::Modified),
            "untracked" => Some(GitFileSet::Untracked),
            "conflict" | "conflicts" => Some(GitFileSet::Conflict),
            _ => None,
        }
    }
}

impl GitState {
    pub fn files(&self, set: GitFileSet) -> &BTreeSet<String> {
        match set {
            GitFileSet::Staged => &self.staged_files,
            GitFileSet::Modified => &self.modified_files,
            GitFileSet::Untracked => &self.untracked_files,
            GitFileSet::Conflict => &self.conflict_files,
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflict_files.is_empty()
    }
}

/// Line-level diff totals for the working tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffStats {
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: String,
}

/// Snapshot of project-level change statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectState {
    pub staged_count: u64,
    pub modified_count: u64,
    pub untracked_count: u64,
    pub diff_stats: DiffStats,
    pub recent_commits: Vec<CommitSummary>,
}

/// Per-invocation input to the engine
#[derive(Debug, Clone)]
pub struct HookContext {
    pub hook_event_type: HookEventType,
    pub hook_input: HookEvent,
    pub claude_session_id: String,
    pub cwd: PathBuf,
    pub project_dir: Option<PathBuf>,
    pub git: Option<GitState>,
    pub project: Option<ProjectState>,
    /// Correlates every log line of one evaluation
    pub trace_id: String,
}

impl HookContext {
    pub fn from_event(event: HookEvent) -> Self {
        let common = event.common();
        let claude_session_id = common.session_id.clone();
        let cwd = if common.cwd.is_empty() {
            std::env::current_dir().unwrap_or_default()
        } else {
            PathBuf::from(&common.cwd)
        };

        Self {
            hook_event_type: event.event_type(),
            hook_input: event,
            claude_session_id,
            cwd,
            project_dir: None,
            git: None,
            project: None,
            trace_id: generate_trace_id(),
        }
    }

    pub fn with_git(mut self, git: GitState) -> Self {
        self.git = Some(git);
        self
    }

    pub fn with_project(mut self, project: ProjectState) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Map this context to the flat evaluation dictionary.
    ///
    /// Never fails: every optional part degrades to `null` or an empty
    /// collection. Identical inputs yield identical maps apart from
    /// `timestamp`.
    pub fn to_eval_context(&self) -> EvalContext {
        let event = &self.hook_input;
        let common = event.common();
        let mut ctx = Map::new();

        ctx.insert("hook_type".into(), json!(self.hook_event_type.as_str()));
        ctx.insert("session_id".into(), json!(self.claude_session_id));
        ctx.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
        ctx.insert("cwd".into(), json!(self.cwd.display().to_string()));
        ctx.insert(
            "project_dir".into(),
            self.project_dir
                .as_ref()
                .map(|p| json!(p.display().to_string()))
                .unwrap_or(Value::Null),
        );
        ctx.insert(
            "permission_mode".into(),
            json!(common.permission_mode.as_str()),
        );
        ctx.insert("transcript_path".into(), json!(common.transcript_path));
        ctx.insert("tool_name".into(), opt_str(event.tool_name()));
        ctx.insert(
            "tool_input".into(),
            event.tool_input().cloned().unwrap_or(Value::Null),
        );
        ctx.insert(
            "tool_output".into(),
            event.tool_response().cloned().unwrap_or(Value::Null),
        );
        ctx.insert("tool_use_id".into(), opt_str(event.tool_use_id()));
        ctx.insert("prompt".into(), opt_str(event.prompt()));

        let git = self.git.as_ref();
        ctx.insert(
            "git_branch".into(),
            opt_str(git.and_then(|g| g.branch.as_deref())),
        );
        ctx.insert(
            "git_head_commit".into(),
            opt_str(git.and_then(|g| g.head_commit.as_deref())),
        );
        ctx.insert("git_is_dirty".into(), json!(git.is_some_and(|g| g.is_dirty)));
        ctx.insert(
            "git_has_conflicts".into(),
            json!(git.is_some_and(|g| g.has_conflicts())),
        );
        for (key, set) in [
            ("git_staged_files", GitFileSet::Staged),
            ("git_modified_files", GitFileSet::Modified),
            ("git_untracked_files", GitFileSet::Untracked),
            ("git_conflict_files", GitFileSet::Conflict),
        ] {
            let files: Vec<&String> = git.map(|g| g.files(set).iter().collect()).unwrap_or_default();
            ctx.insert(key.into(), json!(files));
        }

        let project = self.project.as_ref();
        let count = |f: fn(&ProjectState) -> u64| json!(project.map(f).unwrap_or(0));
        ctx.insert("project_staged_count".into(), count(|p| p.staged_count));
        ctx.insert("project_modified_count".into(), count(|p| p.modified_count));
        ctx.insert("project_untracked_count".into(), count(|p| p.untracked_count));
        ctx.insert(
            "project_files_changed".into(),
            count(|p| p.diff_stats.files_changed),
        );
        ctx.insert("project_insertions".into(), count(|p| p.diff_stats.insertions));
        ctx.insert("project_deletions".into(), count(|p| p.diff_stats.deletions));
        ctx.insert(
            "project_recent_commits".into(),
            project
                .and_then(|p| serde_json::to_value(&p.recent_commits).ok())
                .unwrap_or_else(|| json!([])),
        );

        ctx
    }
}

fn opt_str(value: Option<&str>) -> Value {
    value.map(|s| json!(s)).unwrap_or(Value::Null)
}
