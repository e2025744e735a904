use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::IndexError;

/// Directory names pruned before descent. Pruning skips the whole subtree,
/// not just its files.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    "venv",
    ".venv",
    "__pycache__",
    ".cache",
];

/// Binary and media extensions rejected outright.
const EXCLUDED_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "ico", "webp", "pdf", "zip", "tar", "gz", "exe", "dll", "so",
    "dylib", "bin", "pyc", "pyo", "class", "o", "a", "wasm", "mp3", "mp4", "woff", "woff2", "ttf",
];

/// Source and text extensions accepted for indexing.
const INCLUDED_EXTS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "rs", "go", "java", "c", "h", "cpp", "hpp", "rb", "sh", "sql",
    "html", "css", "scss", "md", "txt", "json", "yaml", "yml", "toml", "ini", "cfg", "conf",
    "xml", "svg",
];

/// Extensionless files accepted by conventional name.
const SPECIAL_NAMES: &[&str] = &[".env", ".gitignore", "dockerfile", "makefile"];

/// Compiled discovery rules for one workspace root.
///
/// Shared by the bulk scanner and the live sync watcher so both apply the
/// same eligibility decision to any path.
pub struct ScanRules {
    root: PathBuf,
    cache_file: String,
    user_excludes: GlobSet,
}

impl ScanRules {
    pub fn new(root: &Path, cache_file: &str, exclude_globs: &[String]) -> Result<Self> {
        if !root.is_dir() {
            bail!("Workspace root does not exist: {}", root.display());
        }
        Ok(Self {
            root: root.to_path_buf(),
            cache_file: cache_file.to_ascii_lowercase(),
            user_excludes: build_globset(exclude_globs)?,
        })
    }

    /// Walk the workspace and return every eligible file path.
    ///
    /// Order is unspecified. An unreadable subtree is logged and skipped;
    /// it never aborts the rest of the scan.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| !is_pruned_dir(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(
                        "{}",
                        IndexError::Scan {
                            path,
                            message: err.to_string(),
                        }
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if self.accepts_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files
    }

    /// Whether `path` would appear in the candidate set of a scan.
    ///
    /// Used by the watcher so a live event under an excluded directory (or
    /// for the cache file itself) never reaches the pipeline.
    pub fn is_candidate(&self, path: &Path) -> bool {
        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => return false,
        };
        let under_excluded_dir = rel
            .parent()
            .map(|parent| {
                parent.components().any(|c| match c {
                    Component::Normal(name) => name
                        .to_str()
                        .map(|n| EXCLUDED_DIRS.contains(&n.to_ascii_lowercase().as_str()))
                        .unwrap_or(false),
                    _ => false,
                })
            })
            .unwrap_or(false);
        if under_excluded_dir {
            return false;
        }
        self.accepts_file(path)
    }

    fn accepts_file(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_ascii_lowercase(),
            None => return false,
        };
        // The cache file is never a candidate; indexing it would re-trigger
        // the pipeline on every persist.
        if name == self.cache_file {
            return false;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if let Some(ref ext) = ext {
            if EXCLUDED_EXTS.contains(&ext.as_str()) {
                return false;
            }
        }
        let by_ext = ext
            .as_deref()
            .map(|e| INCLUDED_EXTS.contains(&e))
            .unwrap_or(false);
        if !by_ext && !SPECIAL_NAMES.contains(&name.as_str()) {
            return false;
        }

        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        !self.user_excludes.is_match(rel)
    }
}

fn is_pruned_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
