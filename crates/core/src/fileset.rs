//! File-set resolution
//!
//! Expands include/exclude glob patterns into the ordered list of local files
//! to upload. Exclusion is a set difference on the resolved paths, so an
//! exclude pattern only removes files it resolves to exactly.
//!
//! Symbolic links to directories are never descended into, whether the glob
//! reaches them or the walk below a matched directory does. Links to regular
//! files are kept.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Patterns parsed from one pattern argument
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternList<'a> {
    pub include: Vec<&'a str>,
    /// Lines written as `!pattern`, without the `!`
    pub negated: Vec<&'a str>,
}

/// Split a pattern argument into individual patterns
///
/// One pattern per line; blank lines and `#` comments are skipped. A line
/// starting with `!` removes its matches from the files selected by the other
/// lines, wherever it appears in the list.
pub fn split_patterns(raw: &str) -> Result<PatternList<'_>> {
    let mut list = PatternList::default();

    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.strip_prefix('!').map(str::trim_start) {
            Some(negated) if negated.is_empty() || negated.starts_with('!') => {
                return Err(Error::Pattern(format!("unsupported negation '{line}'")));
            }
            Some(negated) => list.negated.push(negated),
            None => list.include.push(line),
        }
    }

    Ok(list)
}

/// Resolves glob patterns relative to a workspace root
#[derive(Debug, Clone)]
pub struct FileSetResolver {
    workspace_root: PathBuf,
}

impl FileSetResolver {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    /// Files matched by `include`, minus files matched by `exclude`
    ///
    /// Order of the include expansion is kept for retained entries. An empty
    /// result is logged as a warning and returned as `Ok`.
    pub fn resolve(&self, include: &str, exclude: Option<&str>) -> Result<Vec<PathBuf>> {
        let patterns = split_patterns(include)?;
        let mut files = self.expand(&patterns.include)?;

        let mut removed: HashSet<PathBuf> = self.expand(&patterns.negated)?.into_iter().collect();
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "Files matched negated patterns");
        }
        if let Some(exclude) = exclude.filter(|e| !e.trim().is_empty()) {
            removed.extend(self.excluded_files(exclude)?);
        }
        if !removed.is_empty() {
            files.retain(|f| !removed.contains(f));
        }

        if files.is_empty() {
            tracing::warn!(
                "No files found matching the glob pattern or all files were excluded. Nothing to upload."
            );
        } else {
            tracing::info!("Found {} files to upload.", files.len());
        }

        Ok(files)
    }

    /// Expand `patterns` into absolute file paths
    ///
    /// A pattern that matches a directory contributes every file below it.
    /// Results are de-duplicated, first occurrence wins.
    pub fn expand(&self, patterns: &[&str]) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for pattern in patterns {
            let anchored = self.anchor(pattern);
            let base = if Path::new(pattern).is_absolute() {
                literal_base(pattern)
            } else {
                self.workspace_root.clone()
            };
            tracing::debug!(pattern = %anchored, "Expanding glob pattern");

            for entry in glob::glob(&anchored)? {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable path");
                        continue;
                    }
                };

                // `**` follows directory links; drop whatever it found through one
                if below_symlink(&path, &base) {
                    continue;
                }

                let file_type = match std::fs::symlink_metadata(&path) {
                    Ok(meta) => meta.file_type(),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable path");
                        continue;
                    }
                };

                if file_type.is_dir() {
                    for file in walk_files(&path) {
                        if seen.insert(file.clone()) {
                            files.push(file);
                        }
                    }
                } else if path.is_file() {
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                } else {
                    tracing::debug!(path = %path.display(), "Skipping match that is not a file");
                }
            }
        }

        Ok(files)
    }

    /// Files matched by the exclude argument, in expansion order
    fn excluded_files(&self, exclude: &str) -> Result<Vec<PathBuf>> {
        let patterns = split_patterns(exclude)?;
        if let Some(negated) = patterns.negated.first() {
            return Err(Error::Pattern(format!(
                "negated pattern '!{negated}' is only allowed in the files list"
            )));
        }

        let excluded = self.expand(&patterns.include)?;
        if excluded.is_empty() {
            tracing::info!("No files matched the exclude pattern.");
        } else {
            let names: Vec<String> = excluded.iter().map(|p| p.display().to_string()).collect();
            tracing::info!(
                count = excluded.len(),
                "Excluded files {} from upload.",
                names.join(", ")
            );
        }

        Ok(excluded)
    }

    fn anchor(&self, pattern: &str) -> String {
        if Path::new(pattern).is_absolute() {
            return pattern.to_string();
        }
        let root = glob::Pattern::escape(&self.workspace_root.to_string_lossy());
        let pattern = pattern.trim_start_matches("./");
        format!("{}/{}", root.trim_end_matches('/'), pattern)
    }
}

/// Regular files below `dir` (and links to them), depth first in name order
fn walk_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(
                    path = %e.path().unwrap_or(dir).display(),
                    error = %e,
                    "Skipping unreadable directory entry"
                );
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Whether a directory strictly between `base` and `path` is a symbolic link
fn below_symlink(path: &Path, base: &Path) -> bool {
    path.ancestors()
        .skip(1)
        .take_while(|dir| *dir != base && dir.starts_with(base))
        .any(|dir| std::fs::symlink_metadata(dir).is_ok_and(|m| m.file_type().is_symlink()))
}

/// Leading components of an absolute pattern that contain no wildcard
fn literal_base(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| !c.as_os_str().to_string_lossy().contains(['*', '?', '[']))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_log::LogBuffer;
    use std::fs;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::create_dir_all(root.join("sub/nested")).unwrap();
        fs::write(root.join("sub/b.txt"), "b").unwrap();
        fs::write(root.join("sub/c.log"), "c").unwrap();
        fs::write(root.join("sub/nested/d.txt"), "d").unwrap();
        dir
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_split_patterns() {
        let raw = "dist/**/*.js\n\n  # comment\n  docs/*.md  \n! dist/**/*.map\n";
        let list = split_patterns(raw).unwrap();
        assert_eq!(list.include, vec!["dist/**/*.js", "docs/*.md"]);
        assert_eq!(list.negated, vec!["dist/**/*.map"]);
    }

    #[test]
    fn test_split_patterns_rejects_bare_and_double_negation() {
        assert!(matches!(split_patterns("a.txt\n!"), Err(Error::Pattern(_))));
        assert!(matches!(split_patterns("!!a.txt"), Err(Error::Pattern(_))));
    }

    #[test]
    fn test_resolve_only_files_absolute() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let files = resolver.resolve("sub/*", None).unwrap();

        assert!(files.iter().all(|f| f.is_absolute() && f.is_file()));
        // sub/nested is a directory and contributes its files
        assert_eq!(
            names(ws.path(), &files),
            vec!["sub/b.txt", "sub/c.log", "sub/nested/d.txt"]
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let first = resolver.resolve("**/*.txt", None).unwrap();
        let second = resolver.resolve("**/*.txt", None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_exclude_is_set_difference_preserving_order() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());

        let include = resolver.resolve("**/*", None).unwrap();
        let files = resolver.resolve("**/*", Some("**/*.txt")).unwrap();
        let expected: Vec<PathBuf> = include
            .into_iter()
            .filter(|f| f.extension().is_none_or(|e| e != "txt"))
            .collect();

        assert_eq!(files, expected);
        assert_eq!(names(ws.path(), &files), vec!["sub/c.log"]);
    }

    #[test]
    fn test_exclude_matching_nothing_has_no_effect() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let files = resolver.resolve("sub/*.txt", Some("*.bin")).unwrap();
        assert_eq!(names(ws.path(), &files), vec!["sub/b.txt"]);
    }

    #[test]
    fn test_exclude_outside_include_set() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let files = resolver.resolve("a.txt", Some("sub/b.txt")).unwrap();
        assert_eq!(names(ws.path(), &files), vec!["a.txt"]);
    }

    #[test]
    fn test_empty_match_is_not_an_error() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        assert!(resolver.resolve("*.nothing", None).unwrap().is_empty());
        assert!(resolver.resolve("*.txt", Some("*.txt")).unwrap().is_empty());
    }

    #[test]
    fn test_multiple_patterns_deduplicated() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let files = resolver.resolve("a.txt\nsub/*.txt\n*.txt", None).unwrap();
        assert_eq!(names(ws.path(), &files), vec!["a.txt", "sub/b.txt"]);
    }

    #[test]
    fn test_absolute_pattern() {
        let ws = workspace();
        let resolver = FileSetResolver::new("/nonexistent");
        let pattern = format!(
            "{}/sub/*.log",
            glob::Pattern::escape(&ws.path().to_string_lossy())
        );
        let files = resolver.resolve(&pattern, None).unwrap();
        assert_eq!(names(ws.path(), &files), vec!["sub/c.log"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let result = resolver.resolve("sub/[*.txt", None);
        assert!(matches!(result, Err(Error::Pattern(_))));
    }

    #[test]
    fn test_negated_line_removes_matches() {
        let ws = TempDir::new().unwrap();
        fs::create_dir(ws.path().join("dist")).unwrap();
        fs::write(ws.path().join("dist/app.js"), "js").unwrap();
        fs::write(ws.path().join("dist/app.js.map"), "map").unwrap();
        let resolver = FileSetResolver::new(ws.path());

        let files = resolver.resolve("dist/*\n!dist/*.map", None).unwrap();
        assert_eq!(names(ws.path(), &files), vec!["dist/app.js"]);

        // position in the list does not matter
        let files = resolver.resolve("!dist/*.map\ndist/*", None).unwrap();
        assert_eq!(names(ws.path(), &files), vec!["dist/app.js"]);
    }

    #[test]
    fn test_negated_line_in_exclude_is_rejected() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let result = resolver.resolve("**/*", Some("*.log\n!sub/c.log"));
        assert!(matches!(result, Err(Error::Pattern(_))));
    }

    #[test]
    fn test_excluded_files_keep_pattern_order() {
        let ws = workspace();
        let resolver = FileSetResolver::new(ws.path());
        let logs = LogBuffer::default();
        let _guard = logs.install();

        let excluded = resolver
            .excluded_files("sub/nested/*.txt\nsub/*.log\na.txt")
            .unwrap();
        assert_eq!(
            names(ws.path(), &excluded),
            vec!["sub/nested/d.txt", "sub/c.log", "a.txt"]
        );

        let root = ws.path().display().to_string();
        let expected = format!(
            "Excluded files {root}/sub/nested/d.txt, {root}/sub/c.log, {root}/a.txt from upload."
        );
        assert!(logs.contents().contains(&expected), "{}", logs.contents());
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_symlink_cycle_is_not_followed() {
        let ws = TempDir::new().unwrap();
        let root = ws.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(root.join("sub"), root.join("sub/loop")).unwrap();
        let resolver = FileSetResolver::new(root);

        let files = resolver.resolve("sub/*", None).unwrap();
        assert_eq!(names(root, &files), vec!["sub/a.txt"]);

        let files = resolver.resolve("**/*", None).unwrap();
        assert_eq!(names(root, &files), vec!["sub/a.txt"]);

        // the walk below a matched directory does not enter the link either
        let files = resolver.resolve("sub", None).unwrap();
        assert_eq!(names(root, &files), vec!["sub/a.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_symlink_is_kept() {
        let ws = workspace();
        let root = ws.path();
        std::os::unix::fs::symlink(root.join("a.txt"), root.join("sub/linked.txt")).unwrap();
        let resolver = FileSetResolver::new(root);

        let files = resolver.resolve("sub", None).unwrap();
        assert_eq!(
            names(root, &files),
            vec!["sub/b.txt", "sub/c.log", "sub/linked.txt", "sub/nested/d.txt"]
        );
    }
}
