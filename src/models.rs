//! Core data types used throughout the indexing pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A bounded-size slice of a file's text content, the unit of storage.
///
/// Identity is the deterministic `"<path>_<index>"` string, stable across
/// runs, so re-upserting an unchanged chunk overwrites rather than
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub path: String,
    pub index: usize,
    pub text: String,
}

impl Chunk {
    /// Deterministic store id for this chunk.
    pub fn id(&self) -> String {
        format!("{}_{}", self.path, self.index)
    }
}

/// Result status of one per-file pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Every chunk was written and the cache entry was committed.
    Indexed,
    /// The fingerprint matched the cached value; nothing was read or written.
    Skipped,
    /// The file was unreadable or blank; the cache entry was left untouched.
    EmptyOrUnreadable,
    /// A chunk write failed; the cache entry was left untouched.
    Error,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessStatus::Indexed => "indexed",
            ProcessStatus::Skipped => "skipped",
            ProcessStatus::EmptyOrUnreadable => "error-or-empty",
            ProcessStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Outcome of running the per-file pipeline once for one path.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub path: String,
    pub status: ProcessStatus,
    pub fingerprint: String,
}

/// Aggregated counters for one bulk run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BulkStats {
    pub total: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Filesystem change delivered to the live sync watcher.
///
/// Deletions are intentionally absent: removed files leave their cache and
/// store entries orphaned (stat of a missing path yields an empty
/// fingerprint, so a stale entry can never cause a wrong skip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
}

/// Metadata attached to every stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub path: String,
    pub chunk_index: usize,
}

/// A document returned from a searchable store query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMeta,
    #[serde(default)]
    pub score: f64,
}
