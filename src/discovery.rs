//! File discovery: expand path and glob arguments into files.
//!
//! Each argument is resolved against a base directory and expanded:
//!
//! | Argument | Expansion |
//! |---------------|-----------|
//! | existing file | itself |
//! | directory | its direct files, or every file below it with `recursive` |
//! | glob (`*`, `?`, `[`, `{`) | files below the literal prefix matching the pattern |
//! | anything else | nothing |
//!
//! In globs `*` stays within one path component and `**` spans any number.
//! Directory walks never enter `.git`. The result is canonicalized,
//! deduplicated in first-seen order, and filtered by the project's
//! [`ExclusionFilter`] unless `force` is set.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::SyncError;
use crate::exclude::ExclusionFilter;

/// Directories never descended into while walking.
const SKIPPED_DIRS: &[&str] = &[".git"];

/// What to discover.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    /// Paths, directories, or glob patterns. Relative entries are resolved
    /// against the base directory passed to [`discover_files`].
    pub specs: Vec<String>,
    /// Expand directories to every file below them instead of direct files.
    pub recursive: bool,
    /// Keep files matched by the ignore rules.
    pub force: bool,
}

/// Expand `request` into canonical file paths, filtered by the ignore rules
/// found at `project_root`.
pub fn discover_files(
    request: &DiscoveryRequest,
    base: &Path,
    project_root: &Path,
) -> Result<Vec<PathBuf>, SyncError> {
    let files = expand_specs(&request.specs, request.recursive, base)?;
    let total = files.len();

    let filter = ExclusionFilter::load(project_root)?;
    let files = match (&filter, request.force) {
        (Some(filter), false) => files
            .into_iter()
            .filter(|f| {
                let excluded = filter.is_excluded(f);
                if excluded {
                    debug!(path = %f.display(), "excluded by ignore rules");
                }
                !excluded
            })
            .collect(),
        _ => files,
    };

    debug!(
        candidates = total,
        kept = files.len(),
        force = request.force,
        "discovery finished"
    );
    Ok(files)
}

/// Expand arguments without applying ignore rules.
pub fn expand_specs(
    specs: &[String],
    recursive: bool,
    base: &Path,
) -> Result<Vec<PathBuf>, SyncError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for spec in specs {
        let path = base.join(spec);
        let found = if path.is_file() {
            vec![path]
        } else if path.is_dir() {
            walk_files(&path, if recursive { None } else { Some(1) })
        } else if is_glob(spec) {
            expand_glob(base, spec)?
        } else {
            debug!(spec = %spec, "glob matched nothing");
            Vec::new()
        };

        for file in found {
            match file.canonicalize() {
                Ok(canonical) => {
                    if seen.insert(canonical.clone()) {
                        files.push(canonical);
                    }
                }
                Err(e) => warn!(path = %file.display(), error = %e, "cannot canonicalize, skipping"),
            }
        }
    }

    Ok(files)
}

fn is_glob(spec: &str) -> bool {
    spec.contains(['*', '?', '[', '{'])
}

/// Files below `root`, sorted by name at each level. `max_depth = Some(1)`
/// limits the walk to direct children.
fn walk_files(root: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    walker
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && SKIPPED_DIRS
                    .iter()
                    .any(|skip| e.file_name() == std::ffi::OsStr::new(skip)))
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry during walk");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Match `spec` against files below its literal prefix. Relative patterns are
/// matched against paths relative to `base`, so metacharacters in `base`
/// itself stay literal.
fn expand_glob(base: &Path, spec: &str) -> Result<Vec<PathBuf>, SyncError> {
    let pattern: PathBuf = Path::new(spec)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let matcher = compile_glob(&pattern.to_string_lossy())?;

    let (prefix, rest) = split_literal_prefix(&pattern);
    let walk_root = if prefix.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(&prefix)
    };
    if !walk_root.is_dir() {
        return Ok(Vec::new());
    }
    let max_depth = if rest.iter().any(|c| c == "**") {
        None
    } else {
        Some(rest.len())
    };

    Ok(walk_files(&walk_root, max_depth)
        .into_iter()
        .filter(|f| {
            let candidate = if pattern.is_absolute() {
                f.as_path()
            } else {
                f.strip_prefix(base).unwrap_or(f)
            };
            matcher.is_match(candidate)
        })
        .collect())
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher, SyncError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| SyncError::Config(format!("invalid glob '{}': {}", pattern, e)))
}

/// Split a pattern into the longest directory prefix without glob
/// metacharacters and the remaining components.
fn split_literal_prefix(pattern_path: &Path) -> (PathBuf, Vec<String>) {
    let mut prefix = PathBuf::new();
    let mut rest = Vec::new();
    for component in pattern_path.components() {
        let text = component.as_os_str().to_string_lossy().to_string();
        let literal =
            matches!(component, Component::RootDir | Component::Prefix(_)) || !is_glob(&text);
        if rest.is_empty() && literal {
            prefix.push(component);
        } else {
            rest.push(text);
        }
    }
    (prefix, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        for (rel, body) in [
            ("a.txt", "alpha"),
            ("b.md", "beta"),
            ("src/main.rs", "fn main() {}"),
            ("src/lib.rs", "pub mod x;"),
            ("src/nested/deep.rs", "// deep"),
            ("logs/run.log", "log"),
            (".git/HEAD", "ref: refs/heads/main"),
        ] {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        (tmp, root)
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().to_string())
            .collect()
    }

    fn request(specs: &[&str], recursive: bool, force: bool) -> DiscoveryRequest {
        DiscoveryRequest {
            specs: specs.iter().map(|s| s.to_string()).collect(),
            recursive,
            force,
        }
    }

    #[test]
    fn test_plain_file_and_missing_spec() {
        let (_tmp, root) = project();
        let files = expand_specs(&["a.txt".into(), "missing.txt".into()], false, &root).unwrap();
        assert_eq!(names(&root, &files), vec!["a.txt"]);
    }

    #[test]
    fn test_directory_non_recursive() {
        let (_tmp, root) = project();
        let files = expand_specs(&["src".into()], false, &root).unwrap();
        assert_eq!(names(&root, &files), vec!["src/lib.rs", "src/main.rs"]);
    }

    #[test]
    fn test_directory_recursive_skips_git() {
        let (_tmp, root) = project();
        let files = expand_specs(&[".".into()], true, &root).unwrap();
        let got = names(&root, &files);
        assert!(got.contains(&"src/nested/deep.rs".to_string()));
        assert!(got.contains(&"logs/run.log".to_string()));
        assert!(!got.iter().any(|n| n.starts_with(".git")));
        assert_eq!(got.len(), 6);
    }

    #[test]
    fn test_single_star_stays_in_component() {
        let (_tmp, root) = project();
        let files = expand_specs(&["src/*.rs".into()], true, &root).unwrap();
        assert_eq!(names(&root, &files), vec!["src/lib.rs", "src/main.rs"]);
    }

    #[test]
    fn test_double_star_spans_directories() {
        let (_tmp, root) = project();
        let files = expand_specs(&["**/*.rs".into()], false, &root).unwrap();
        let mut got = names(&root, &files);
        got.sort();
        assert_eq!(got, vec!["src/lib.rs", "src/main.rs", "src/nested/deep.rs"]);
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let (_tmp, root) = project();
        let files = expand_specs(
            &["b.md".into(), "*.md".into(), "./b.md".into(), "a.txt".into()],
            false,
            &root,
        )
        .unwrap();
        assert_eq!(names(&root, &files), vec!["b.md", "a.txt"]);
    }

    #[test]
    fn test_gitignore_filters_unless_forced() {
        let (_tmp, root) = project();
        std::fs::write(root.join(".gitignore"), "logs/\n*.md\n").unwrap();

        let files = discover_files(&request(&["."], true, false), &root, &root).unwrap();
        let got = names(&root, &files);
        assert!(!got.contains(&"logs/run.log".to_string()));
        assert!(!got.contains(&"b.md".to_string()));
        // .gitignore itself is a regular file in the project
        assert!(got.contains(&".gitignore".to_string()));

        let forced = discover_files(&request(&["."], true, true), &root, &root).unwrap();
        assert!(names(&root, &forced).contains(&"logs/run.log".to_string()));
    }

    #[test]
    fn test_no_gitignore_means_no_filtering() {
        let (_tmp, root) = project();
        let files = discover_files(&request(&["logs/run.log"], false, false), &root, &root).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_unreadable_gitignore_is_fatal() {
        let (_tmp, root) = project();
        std::fs::write(root.join(".gitignore"), [0xc3, 0x28]).unwrap();
        let err = discover_files(&request(&["a.txt"], false, false), &root, &root).unwrap_err();
        assert!(matches!(err, SyncError::IgnoreFile { .. }));
    }

    #[test]
    fn test_glob_under_base_with_metacharacters() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().canonicalize().unwrap().join("proj[1]");
        std::fs::create_dir_all(base.join("src")).unwrap();
        std::fs::write(base.join("src/a.rs"), "fn a() {}").unwrap();
        std::fs::write(base.join("notes.md"), "notes").unwrap();

        let named = expand_specs(&["src/a.rs".into()], false, &base).unwrap();
        let globbed = expand_specs(&["src/*.rs".into()], false, &base).unwrap();
        assert_eq!(globbed, named);

        let top = expand_specs(&["./*.md".into()], false, &base).unwrap();
        assert_eq!(names(&base, &top), vec!["notes.md"]);
    }

    #[test]
    fn test_absolute_glob() {
        let (_tmp, root) = project();
        let spec = format!("{}/src/*.rs", root.display());
        let files = expand_specs(&[spec], false, &root).unwrap();
        assert_eq!(names(&root, &files), vec!["src/lib.rs", "src/main.rs"]);
    }

    #[test]
    fn test_split_literal_prefix() {
        let (prefix, rest) = split_literal_prefix(Path::new("/p/src/**/*.rs"));
        assert_eq!(prefix, PathBuf::from("/p/src"));
        assert_eq!(rest, vec!["**".to_string(), "*.rs".to_string()]);
    }
}
