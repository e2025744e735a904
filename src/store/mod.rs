//! Searchable store boundary.
//!
//! The indexing core treats the store as an opaque keyed text index: it
//! upserts chunk text under a deterministic id and issues nearest-match
//! queries. Embedding computation and similarity ranking live entirely
//! behind this trait; the core never inspects vectors and never asks the
//! store whether a file is fresh — freshness is a
//! [`ChangeCache`](crate::cache::ChangeCache) property.
//!
//! # Providers
//!
//! | Provider | Backend |
//! |----------|---------|
//! | [`http::HttpStore`] | Remote embedding/search service over JSON REST |
//! | [`memory::InMemoryStore`] | In-process map with token-overlap ranking |
//!
//! Use [`create_store`] to instantiate the provider selected in the
//! configuration.

pub mod http;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::models::{ChunkMeta, StoredDocument};

/// Durable keyed text storage with nearest-match retrieval.
#[async_trait]
pub trait SearchableStore: Send + Sync {
    /// Insert or overwrite a document by id.
    ///
    /// Idempotent: re-upserting an unchanged chunk is a no-op overwrite,
    /// never a duplicate.
    async fn upsert(&self, id: &str, text: &str, meta: &ChunkMeta) -> Result<(), StoreError>;

    /// Return up to `top_n` stored documents ranked by relevance to `text`.
    async fn query(&self, text: &str, top_n: usize) -> Result<Vec<StoredDocument>, StoreError>;
}

/// Instantiate the store backend named in the configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn SearchableStore>> {
    match config.provider.as_str() {
        "memory" => Ok(Arc::new(memory::InMemoryStore::new())),
        "http" => Ok(Arc::new(http::HttpStore::new(config)?)),
        other => anyhow::bail!("Unknown store provider: '{}'. Must be http or memory.", other),
    }
}
