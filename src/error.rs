//! Error taxonomy for the indexing core.
//!
//! Per-file failures are folded into a
//! [`ProcessOutcome`](crate::models::ProcessOutcome) and never cross the
//! worker-pool boundary. Only two paths swallow errors unconditionally, as an
//! explicit policy: an unreadable scan subtree (skipped, scan continues) and
//! a failed cache persist (logged, in-memory cache remains authoritative).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that can occur inside the indexing core.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A directory subtree could not be read. The scan skips the subtree
    /// and continues.
    #[error("cannot scan {}: {message}", .path.display())]
    Scan { path: PathBuf, message: String },

    /// A file could not be stat'd. The resulting empty fingerprint never
    /// matches a cached value, so the file is reprocessed.
    #[error("cannot stat {}: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be read as UTF-8 text.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A chunk upsert failed. The file's remaining chunks are abandoned and
    /// its cache entry is left stale so the whole file is retried.
    #[error("store write for chunk {chunk_id} failed: {source}")]
    StoreWrite {
        chunk_id: String,
        #[source]
        source: StoreError,
    },

    /// The cache file could not be loaded or persisted.
    #[error("cache file {}: {message}", .path.display())]
    CacheIo { path: PathBuf, message: String },
}

/// Failures reported by a searchable store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("upsert failed: {0}")]
    Upsert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_error_display() {
        let err = IndexError::Scan {
            path: PathBuf::from("/ws/secrets"),
            message: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "cannot scan /ws/secrets: permission denied");

        let err = IndexError::StoreWrite {
            chunk_id: "/ws/a.py_3".to_string(),
            source: StoreError::Upsert("http 503".to_string()),
        };
        assert!(err.to_string().contains("/ws/a.py_3"));
        assert!(err.to_string().contains("upsert failed: http 503"));
    }

    #[test]
    fn store_error_display() {
        assert_eq!(
            StoreError::Query("bad response".to_string()).to_string(),
            "query failed: bad response"
        );
        assert_eq!(
            StoreError::Unavailable("timeout".to_string()).to_string(),
            "backend unavailable: timeout"
        );
    }
}
