//! Path and file predicates

use glob::Pattern;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolve a user-supplied path: `~` expands to the home directory and
/// relative paths are joined onto `cwd`. No filesystem access.
pub fn resolve_path(cwd: &Path, raw: &str) -> PathBuf {
    let expanded = if raw == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw))
    } else if let Some(rest) = raw.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        }
    } else {
        PathBuf::from(raw)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    }
}

/// Drop `.` and fold `..` without touching the filesystem. `..` never climbs
/// above the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component.as_os_str());
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str())
            }
        }
    }
    out
}

/// Canonicalise the longest existing ancestor (following symlinks) and
/// normalise the non-existent remainder lexically.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(canonical) = fs::canonicalize(ancestor) {
            let rest = path.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return normalize_lexically(&canonical.join(rest));
        }
    }
    normalize_lexically(path)
}

/// True when `path` resolves to `base` or somewhere below it. Both sides go
/// through the same resolution, so `..` segments and symlinks cannot escape.
pub fn is_path_under(cwd: &Path, path: &str, base: &str) -> bool {
    if path.is_empty() || base.is_empty() {
        return false;
    }
    let resolved = canonicalize_lenient(&resolve_path(cwd, path));
    let base = canonicalize_lenient(&resolve_path(cwd, base));
    let under = resolved.starts_with(&base);
    debug!(
        "is_path_under: {} under {} = {}",
        resolved.display(),
        base.display(),
        under
    );
    under
}

pub fn file_exists(cwd: &Path, path: &str) -> bool {
    !path.is_empty() && resolve_path(cwd, path).exists()
}

pub fn is_dir(cwd: &Path, path: &str) -> bool {
    !path.is_empty() && resolve_path(cwd, path).is_dir()
}

#[cfg(unix)]
pub fn is_executable(cwd: &Path, path: &str) -> bool {
    use std::os::unix::fs::PermissionsExt;

    if path.is_empty() {
        return false;
    }
    fs::metadata(resolve_path(cwd, path))
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(cwd: &Path, path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let resolved = resolve_path(cwd, path);
    resolved.is_file()
        && resolved
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ["exe", "bat", "cmd", "com"].contains(&ext.to_ascii_lowercase().as_str())
            })
}

/// Glob match against the whole path; a pattern without a separator also
/// matches against the file name alone.
pub fn matches_glob(path: &str, pattern: &str) -> bool {
    let Ok(compiled) = Pattern::new(pattern) else {
        debug!("Invalid glob pattern '{}'", pattern);
        return false;
    };
    if compiled.matches(path) {
        return true;
    }
    if !pattern.contains('/') {
        if let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) {
            return compiled.matches(name);
        }
    }
    false
}
