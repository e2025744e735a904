//! Change-detection fingerprint cache.
//!
//! Maps absolute file paths to a cheap composite fingerprint
//! (`"<mtime-millis>_<byte-size>"`) used as a proxy for content change. The
//! cache is the single source of truth for "is this file up to date"; the
//! store is never consulted for freshness.
//!
//! A path's entry is updated only after every chunk derived from it has been
//! written to the store in the same pipeline invocation, so a failed or
//! partial attempt is always retried on the next run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};

use crate::error::IndexError;

/// Persisted path → fingerprint mapping, shared by the bulk pool and the
/// live sync watcher behind a mutex.
pub struct ChangeCache {
    file: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl ChangeCache {
    /// Load the cache from `file`.
    ///
    /// A missing or unparsable file degrades to an empty cache — reindexing
    /// everything is always safe, crashing on a corrupt cache is not.
    pub fn load(file: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&file) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(
                        "{}",
                        IndexError::CacheIo {
                            path: file.clone(),
                            message: format!("unparsable, starting empty: {err}"),
                        }
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!(
                    "{}",
                    IndexError::CacheIo {
                        path: file.clone(),
                        message: format!("unreadable, starting empty: {err}"),
                    }
                );
                HashMap::new()
            }
        };
        Self {
            file,
            entries: Mutex::new(entries),
        }
    }

    /// Compute the composite fingerprint for `path`.
    ///
    /// A stat failure yields the empty string, which never equals a cached
    /// value and therefore forces reprocessing rather than a silent skip.
    pub fn fingerprint_of(path: &Path) -> String {
        match try_fingerprint(path) {
            Ok(fp) => fp,
            Err(err) => {
                debug!("{err}");
                String::new()
            }
        }
    }

    /// Whether `fingerprint` matches the cached entry for `path`.
    pub fn is_unchanged(&self, path: &str, fingerprint: &str) -> bool {
        if fingerprint.is_empty() {
            return false;
        }
        self.entries
            .lock()
            .unwrap()
            .get(path)
            .map(|cached| cached == fingerprint)
            .unwrap_or(false)
    }

    /// Commit the fingerprint for `path`. Called only after every chunk of
    /// the file was written to the store.
    pub fn record(&self, path: &str, fingerprint: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_string(), fingerprint.to_string());
    }

    /// Cached fingerprint for `path`, if any.
    pub fn get(&self, path: &str) -> Option<String> {
        self.entries.lock().unwrap().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite the cache file wholesale from the in-memory map.
    ///
    /// Callers log a failure and continue; the in-memory cache remains the
    /// only record until the next successful persist.
    pub fn persist(&self) -> Result<(), IndexError> {
        let snapshot = {
            let entries = self.entries.lock().unwrap();
            serde_json::to_string(&*entries).map_err(|err| IndexError::CacheIo {
                path: self.file.clone(),
                message: err.to_string(),
            })?
        };
        std::fs::write(&self.file, snapshot).map_err(|err| IndexError::CacheIo {
            path: self.file.clone(),
            message: err.to_string(),
        })
    }
}

fn try_fingerprint(path: &Path) -> Result<String, IndexError> {
    let stat_err = |source: std::io::Error| IndexError::Stat {
        path: path.to_path_buf(),
        source,
    };
    let meta = std::fs::metadata(path).map_err(stat_err)?;
    let mtime = meta
        .modified()
        .map_err(stat_err)?
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Ok(format!("{}_{}", mtime, meta.len()))
}
