//! # Workspace Indexer
//!
//! Incremental indexing of a source-code workspace for retrieval-augmented
//! querying.
//!
//! The indexer discovers eligible files under a workspace root, detects which
//! have changed since the last run via a persisted fingerprint cache, splits
//! changed files into bounded-size text chunks, and pushes those chunks into
//! a searchable store. A live filesystem watcher keeps the index current
//! between bulk runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐
//! │ Scanner  │──▶│ Worker Pool  │──▶│ Searchable │
//! │ (walk +  │   │ fingerprint  │   │   Store    │
//! │  filter) │   │ chunk, write │   │ (http/mem) │
//! └──────────┘   └──────┬───────┘   └────────────┘
//!                       │
//!                ┌──────┴───────┐
//!                │ Change Cache │◀── Live Sync Watcher
//!                │ (JSON file)  │    (same pipeline)
//!                └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! widx index .                  # bulk pass over the workspace
//! widx index . --watch          # bulk pass, then live resync
//! widx query "worker pool"      # nearest-match query
//! widx sync src/main.rs         # ad hoc single-file resync
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`scanner`] | Workspace file discovery |
//! | [`cache`] | Change-detection fingerprint cache |
//! | [`chunk`] | Fixed-size text chunking |
//! | [`store`] | Searchable store boundary |
//! | [`indexer`] | Worker pool and per-file pipeline |
//! | [`watcher`] | Live filesystem resynchronization |
//! | [`progress`] | Bulk-run progress reporting |

pub mod cache;
pub mod chunk;
pub mod config;
pub mod error;
pub mod indexer;
pub mod models;
pub mod progress;
pub mod scanner;
pub mod store;
pub mod watcher;
