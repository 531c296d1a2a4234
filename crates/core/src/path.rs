//! Remote key derivation
//!
//! Maps a local file to the key it is stored under. All functions here are
//! pure: the workspace root is passed in explicitly and nothing touches the
//! filesystem.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Destination of an upload: bucket plus object key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub bucket: String,
    pub key: String,
}

impl RemotePath {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// User-facing relative identity of a file
///
/// `local` relative to `workspace_root`, with forward slashes, no leading
/// slash and `strip_prefix` removed. The prefix is matched as a literal
/// string, not on path-segment boundaries: `"src"` turns `"srcmap/x"` into
/// `"map/x"`.
pub fn display_path(local: &Path, workspace_root: &Path, strip_prefix: Option<&str>) -> String {
    let relative = relative_to(local, workspace_root);
    let normalized = relative.to_string_lossy().replace('\\', "/");
    let normalized = normalized.trim_start_matches('/');

    match strip_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => normalized
            .strip_prefix(prefix)
            .unwrap_or(normalized)
            .to_string(),
        None => normalized.to_string(),
    }
}

/// Remote key for `local`: [`display_path`] joined under `target_path`
///
/// The result never starts with a slash and never contains a backslash.
pub fn map_key(
    local: &Path,
    workspace_root: &Path,
    target_path: &str,
    strip_prefix: Option<&str>,
) -> String {
    let relative = display_path(local, workspace_root, strip_prefix);
    posix_join(target_path, &relative)
        .trim_start_matches('/')
        .to_string()
}

/// Join two forward-slash paths and normalize the result
///
/// Empty parts are skipped, redundant slashes collapse, `.` segments drop
/// out and `..` consumes the preceding segment. A trailing slash survives.
/// Joining nothing yields `"."`.
pub fn posix_join(base: &str, tail: &str) -> String {
    let joined = match (base.is_empty(), tail.is_empty()) {
        (true, true) => return ".".to_string(),
        (true, false) => tail.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{tail}"),
    };
    normalize(&joined)
}

fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let mut out = segments.join("/");
    if out.is_empty() {
        if absolute {
            return "/".to_string();
        }
        out.push('.');
    }
    if trailing {
        out.push('/');
    }
    if absolute {
        out.insert(0, '/');
    }
    out
}

/// Lexical relative path from `base` to `path`
///
/// Paths outside `base` get `..` segments; nothing is canonicalized.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if let Ok(rel) = path.strip_prefix(base) {
        return rel.to_path_buf();
    }

    let path_components: Vec<Component> = path.components().collect();
    let base_components: Vec<Component> = base.components().collect();
    let common = path_components
        .iter()
        .zip(&base_components)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for c in &base_components[common..] {
        if !matches!(c, Component::CurDir) {
            rel.push("..");
        }
    }
    for c in &path_components[common..] {
        rel.push(c.as_os_str());
    }
    rel
}
