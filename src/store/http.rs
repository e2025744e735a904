//! HTTP searchable-store client.
//!
//! Talks JSON REST to a remote service that owns embedding computation and
//! similarity search. Every request carries the configured deadline so a
//! stalled backend fails the chunk instead of stalling a worker forever.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::models::{ChunkMeta, StoredDocument};

use super::SearchableStore;

pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let base_url = config
            .url
            .clone()
            .context("store.url required for http provider")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build http store client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

}

fn classify(err: reqwest::Error, otherwise: fn(String) -> StoreError) -> StoreError {
    if err.is_timeout() || err.is_connect() {
        StoreError::Unavailable(err.to_string())
    } else {
        otherwise(err.to_string())
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<StoredDocument>,
}

#[async_trait]
impl SearchableStore for HttpStore {
    async fn upsert(&self, id: &str, text: &str, meta: &ChunkMeta) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "id": id,
            "text": text,
            "metadata": meta,
        });
        let response = self
            .client
            .post(format!("{}/documents", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| classify(err, StoreError::Upsert))?;
        if !response.status().is_success() {
            return Err(StoreError::Upsert(format!(
                "{} returned {}",
                self.base_url,
                response.status()
            )));
        }
        Ok(())
    }

    async fn query(&self, text: &str, top_n: usize) -> Result<Vec<StoredDocument>, StoreError> {
        let body = serde_json::json!({
            "text": text,
            "top_n": top_n,
        });
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| classify(err, StoreError::Query))?;
        if !response.status().is_success() {
            return Err(StoreError::Query(format!(
                "{} returned {}",
                self.base_url,
                response.status()
            )));
        }
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|err| StoreError::Query(format!("bad response: {err}")))?;
        Ok(parsed.results)
    }
}
