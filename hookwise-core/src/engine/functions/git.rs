//! Git predicates over the per-invocation [`GitState`] snapshot

use glob::Pattern;
use serde_json::Value;
use std::path::Path;

use crate::engine::context::{GitFileSet, GitState};

/// Walks up from `cwd` looking for a `.git` directory or file (worktrees
/// and submodules use a file)
pub fn is_git_repo(cwd: &Path) -> bool {
    cwd.ancestors().any(|dir| dir.join(".git").exists())
}

/// Set entries are repository-relative; accept either that form or a path
/// carrying the cwd prefix.
fn entry_matches(entry: &str, path: &str, cwd: &Path) -> bool {
    if entry == path {
        return true;
    }
    let relative = Path::new(path)
        .strip_prefix(cwd)
        .ok()
        .and_then(|p| p.to_str())
        .map(|p| p.trim_start_matches("./"));
    relative.is_some_and(|rel| rel == entry) || path.trim_start_matches("./") == entry
}

pub fn file_in(git: Option<&GitState>, cwd: &Path, path: &str, set_name: &str) -> bool {
    let (Some(git), Some(set)) = (git, GitFileSet::parse(set_name)) else {
        return false;
    };
    git.files(set)
        .iter()
        .any(|entry| entry_matches(entry, path, cwd))
}

/// `false` on an empty set, `true` without a pattern, otherwise any entry
/// matching the glob pattern. A non-string pattern is `false`.
pub fn has_any(git: Option<&GitState>, set_name: &str, pattern: Option<&Value>) -> bool {
    let (Some(git), Some(set)) = (git, GitFileSet::parse(set_name)) else {
        return false;
    };
    let files = git.files(set);
    if files.is_empty() {
        return false;
    }

    match pattern {
        None | Some(Value::Null) => true,
        Some(Value::String(pattern)) => match Pattern::new(pattern) {
            Ok(glob) => files
                .iter()
                .any(|file| file == pattern || glob.matches(file)),
            Err(_) => files.iter().any(|file| file == pattern),
        },
        Some(_) => false,
    }
}
