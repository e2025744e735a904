//! In-memory [`SearchableStore`] for local runs and tests.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Ranking is term overlap:
//! the score is the fraction of query terms appearing in a document. No
//! embeddings are involved, which keeps local runs dependency-free.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{ChunkMeta, StoredDocument};

use super::SearchableStore;

struct StoredEntry {
    text: String,
    meta: ChunkMeta,
}

pub struct InMemoryStore {
    docs: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchableStore for InMemoryStore {
    async fn upsert(&self, id: &str, text: &str, meta: &ChunkMeta) -> Result<(), StoreError> {
        let mut docs = self.docs.write().unwrap();
        docs.insert(
            id.to_string(),
            StoredEntry {
                text: text.to_string(),
                meta: meta.clone(),
            },
        );
        Ok(())
    }

    async fn query(&self, text: &str, top_n: usize) -> Result<Vec<StoredDocument>, StoreError> {
        let query_lower = text.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self.docs.read().unwrap();
        let mut hits: Vec<StoredDocument> = docs
            .iter()
            .filter_map(|(id, entry)| {
                let text_lower = entry.text.to_lowercase();
                let matches = terms.iter().filter(|t| text_lower.contains(*t)).count();
                if matches > 0 {
                    Some(StoredDocument {
                        id: id.clone(),
                        text: entry.text.clone(),
                        metadata: entry.meta.clone(),
                        score: matches as f64 / terms.len() as f64,
                    })
                } else {
                    None
                }
            })
            .collect();
        // Score desc, id asc (deterministic)
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_n);
        Ok(hits)
    }
}
