//! Remote tabular template source.
//!
//! The backing endpoint serves a JSON array of rows
//! `{"keyword": "...", "content": "<JSON-encoded document>"}`. Rows are
//! fetched with a bounded timeout and cached read-through; every failure mode
//! (I/O error, timeout, malformed cell) collapses into `NotFound` so the
//! pipeline degrades to its text fallback instead of leaking an outbound
//! error into the reply path.

use super::{NotFound, RawTemplateDoc, TemplateStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Deserialize)]
struct TableRow {
    keyword: String,
    content: String,
}

pub struct RemoteTableStore {
    endpoint: String,
    client: reqwest::Client,
    /// Read-through cache. Concurrent reads; refresh takes the write lock so
    /// a partially-written batch is never observable.
    cache: RwLock<HashMap<String, RawTemplateDoc>>,
}

impl RemoteTableStore {
    pub fn new(endpoint: String, fetch_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self {
            endpoint,
            client,
            cache: RwLock::new(HashMap::new()),
        })
    }

    async fn fetch_rows(&self) -> anyhow::Result<Vec<TableRow>> {
        let resp = self.client.get(&self.endpoint).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("template source returned {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    /// Fetch the whole table and swap it into the cache, returning the doc
    /// for `key` if the refreshed table has one.
    async fn refresh_and_get(&self, key: &str) -> Result<RawTemplateDoc, NotFound> {
        let rows = match self.fetch_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("template source fetch failed: {e}");
                return Err(NotFound);
            }
        };

        let mut table = HashMap::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<RawTemplateDoc>(&row.content) {
                Ok(doc) => {
                    table.insert(row.keyword, doc);
                }
                Err(e) => {
                    tracing::warn!("skipping malformed template row {:?}: {e}", row.keyword);
                }
            }
        }

        let found = table.get(key).cloned().ok_or(NotFound);
        *self.cache.write().await = table;
        found
    }
}

#[async_trait]
impl TemplateStore for RemoteTableStore {
    async fn resolve(&self, key: &str) -> Result<RawTemplateDoc, NotFound> {
        if let Some(doc) = self.cache.read().await.get(key) {
            return Ok(doc.clone());
        }
        self.refresh_and_get(key).await
    }

    async fn keywords(&self) -> Vec<String> {
        if self.cache.read().await.is_empty() {
            // Populate once so validation tooling sees the table.
            let _ = self.refresh_and_get("").await;
        }
        self.cache.read().await.keys().cloned().collect()
    }
}
