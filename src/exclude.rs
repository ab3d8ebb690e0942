//! Git-ignore-style exclusion rules for discovered files.
//!
//! An [`ExclusionFilter`] is built once per sync pass from the project's
//! `.gitignore`. Pattern semantics (anchoring, `**`, negation, directory
//! rules) are delegated to the `ignore` crate's gitignore matcher.
//!
//! A missing ignore file means no filtering. An ignore file that exists but
//! cannot be read or parsed is a configuration error: the pass fails rather
//! than silently indexing files the user asked to exclude.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::error::SyncError;

/// Name of the ignore file looked up at the project root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Compiled ignore rules anchored at a project root.
#[derive(Debug)]
pub struct ExclusionFilter {
    root: PathBuf,
    matcher: Gitignore,
}

impl ExclusionFilter {
    /// Load `<root>/.gitignore`, or return `Ok(None)` when it does not exist.
    pub fn load(project_root: &Path) -> Result<Option<Self>, SyncError> {
        let root = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());
        let ignore_path = root.join(IGNORE_FILE_NAME);

        if !ignore_path.exists() {
            debug!(root = %root.display(), "no ignore file, discovery is unfiltered");
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&ignore_path).map_err(|e| SyncError::IgnoreFile {
                path: ignore_path.clone(),
                message: e.to_string(),
            })?;

        let filter = Self::from_lines(&root, Some(&ignore_path), content.lines())?;
        debug!(
            ignore_file = %ignore_path.display(),
            rules = filter.matcher.num_ignores() + filter.matcher.num_whitelists(),
            "ignore rules loaded"
        );
        Ok(Some(filter))
    }

    /// Build a filter from raw pattern lines. `source` is only used in error
    /// messages.
    pub fn from_lines<'a>(
        root: &Path,
        source: Option<&Path>,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, SyncError> {
        let source_path = source
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(IGNORE_FILE_NAME));
        let to_err = |e: ignore::Error| SyncError::IgnoreFile {
            path: source_path.clone(),
            message: e.to_string(),
        };

        let mut builder = GitignoreBuilder::new(root);
        for line in lines {
            builder
                .add_line(Some(source_path.clone()), line)
                .map_err(to_err)?;
        }
        let matcher = builder.build().map_err(to_err)?;

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
        })
    }

    /// Whether `path` (an absolute file path) is excluded.
    ///
    /// Paths outside the project root are never excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(relative, false)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filter(lines: &[&str]) -> ExclusionFilter {
        ExclusionFilter::from_lines(Path::new("/p"), None, lines.iter().copied()).unwrap()
    }

    #[test]
    fn test_simple_patterns() {
        let f = filter(&["*.log", "build/"]);
        assert!(f.is_excluded(Path::new("/p/debug.log")));
        assert!(f.is_excluded(Path::new("/p/src/deep/trace.log")));
        assert!(f.is_excluded(Path::new("/p/build/out.txt")));
        assert!(!f.is_excluded(Path::new("/p/src/main.rs")));
    }

    #[test]
    fn test_anchored_and_negated() {
        let f = filter(&["/secret.txt", "*.md", "!README.md"]);
        assert!(f.is_excluded(Path::new("/p/secret.txt")));
        assert!(!f.is_excluded(Path::new("/p/nested/secret.txt")));
        assert!(f.is_excluded(Path::new("/p/notes.md")));
        assert!(!f.is_excluded(Path::new("/p/README.md")));
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let f = filter(&["# comment", "", "tmp"]);
        assert!(f.is_excluded(Path::new("/p/tmp/file")));
        assert!(!f.is_excluded(Path::new("/p/# comment")));
    }

    #[test]
    fn test_outside_root_never_excluded() {
        let f = filter(&["*"]);
        assert!(!f.is_excluded(Path::new("/elsewhere/a.txt")));
        assert!(f.is_excluded(Path::new("/p/a.txt")));
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(ExclusionFilter::load(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_reads_root_gitignore() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "*.tmp\n").unwrap();
        let f = ExclusionFilter::load(tmp.path()).unwrap().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        assert!(f.is_excluded(&root.join("x.tmp")));
        assert!(!f.is_excluded(&root.join("x.txt")));
    }

    #[test]
    fn test_unreadable_ignore_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), [0xff, 0xfe, b'\n']).unwrap();
        let err = ExclusionFilter::load(tmp.path()).unwrap_err();
        assert!(matches!(err, SyncError::IgnoreFile { .. }));
    }
}
