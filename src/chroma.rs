//! Chroma HTTP client and the [`CollectionGateway`] over one collection.
//!
//! Talks to the server's v1 REST API:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | heartbeat | `GET /api/v1/heartbeat` |
//! | max batch size | `GET /api/v1/pre-flight-checks` |
//! | get or create | `POST /api/v1/collections` |
//! | list | `GET /api/v1/collections` |
//! | lookup / scan | `POST /api/v1/collections/{id}/get` |
//! | delete | `POST /api/v1/collections/{id}/delete` |
//! | insert | `POST /api/v1/collections/{id}/add` |
//! | count | `GET /api/v1/collections/{id}/count` |
//!
//! The client does no locking of its own; the sync pipeline serializes
//! every call on a collection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use vectorsync_core::models::DocumentRecord;
use vectorsync_core::store::CollectionGateway;

use crate::config::DbConfig;
use crate::embedding::EmbeddingProvider;

/// Batch limit assumed when the server does not report one.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 5461;

/// Page size for full-collection metadata scans.
const SCAN_PAGE_SIZE: usize = 5000;

/// A collection as described by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl CollectionInfo {
    /// String metadata value for `key`, if present.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Map<String, Value>>>>,
}

#[derive(Debug, Deserialize)]
struct PreflightResponse {
    #[serde(default)]
    max_batch_size: Option<usize>,
}

/// HTTP client for one Chroma server.
#[derive(Clone)]
pub struct ChromaClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChromaClient {
    pub fn new(db: &DbConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(db.timeout_secs))
            .build()
            .context("failed to build store HTTP client")?;
        Ok(Self {
            http,
            base_url: db.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Server heartbeat in nanoseconds.
    pub async fn heartbeat(&self) -> Result<u64> {
        let body: Value = send_json(self.http.get(self.url("/heartbeat"))).await?;
        body.get("nanosecond heartbeat")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("unexpected heartbeat response: {}", body))
    }

    /// Largest insert the server accepts, falling back to
    /// [`DEFAULT_MAX_BATCH_SIZE`] when it does not say.
    pub async fn max_batch_size(&self) -> Result<usize> {
        let resp = self
            .http
            .get(self.url("/pre-flight-checks"))
            .send()
            .await
            .context("pre-flight check request failed")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(DEFAULT_MAX_BATCH_SIZE);
        }
        let body: PreflightResponse = parse_response(resp).await?;
        Ok(body
            .max_batch_size
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_BATCH_SIZE))
    }

    pub async fn get_or_create_collection(
        &self,
        name: &str,
        metadata: &Map<String, Value>,
    ) -> Result<CollectionInfo> {
        let req = self.http.post(self.url("/collections")).json(&json!({
            "name": name,
            "metadata": metadata,
            "get_or_create": true,
        }));
        send_json(req)
            .await
            .with_context(|| format!("failed to get or create collection {}", name))
    }

    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        send_json(self.http.get(self.url("/collections")))
            .await
            .context("failed to list collections")
    }

    /// A gateway over `info` that embeds records with `embedder` on insert.
    pub fn collection(
        &self,
        info: CollectionInfo,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> ChromaCollection {
        ChromaCollection {
            client: self.clone(),
            info,
            embedder: Some(embedder),
        }
    }

    /// A gateway over `info` for lookups, counts and deletes. Inserts fail.
    pub fn read_only_collection(&self, info: CollectionInfo) -> ChromaCollection {
        ChromaCollection {
            client: self.clone(),
            info,
            embedder: None,
        }
    }
}

/// One server-side collection.
pub struct ChromaCollection {
    client: ChromaClient,
    info: CollectionInfo,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl ChromaCollection {
    pub fn info(&self) -> &CollectionInfo {
        &self.info
    }

    fn url(&self, op: &str) -> String {
        self.client
            .url(&format!("/collections/{}/{}", self.info.id, op))
    }

    async fn get(&self, body: Value) -> Result<GetResponse> {
        send_json(self.client.http.post(self.url("get")).json(&body)).await
    }

    async fn delete(&self, body: Value) -> Result<()> {
        let resp = self
            .client
            .http
            .post(self.url("delete"))
            .json(&body)
            .send()
            .await
            .context("delete request failed")?;
        parse_response::<Value>(resp).await.map(|_| ())
    }
}

#[async_trait]
impl CollectionGateway for ChromaCollection {
    async fn find_ids_by_path(&self, path: &str) -> Result<Vec<String>> {
        let resp = self
            .get(json!({ "where": where_path(path), "include": ["metadatas"] }))
            .await?;
        Ok(resp.ids)
    }

    async fn delete_by_path(&self, path: &str) -> Result<()> {
        self.delete(json!({ "where": where_path(path) })).await
    }

    async fn delete_by_paths(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.delete(json!({ "where": where_paths(paths) })).await
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete(json!({ "ids": ids })).await
    }

    async fn insert_batch(&self, records: &[DocumentRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            anyhow!(
                "collection {} was opened without an embedding function",
                self.info.name
            )
        })?;
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = embedder.embed(&texts).await?;
        let body = add_body(records, embeddings)?;

        debug!(collection = %self.info.name, records = records.len(), "inserting batch");
        let resp = self
            .client
            .http
            .post(self.url("add"))
            .json(&body)
            .send()
            .await
            .context("add request failed")?;
        parse_response::<Value>(resp).await.map(|_| ())
    }

    async fn max_batch_size(&self) -> Result<usize> {
        self.client.max_batch_size().await
    }

    async fn all_path_metadata(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .get(json!({
                    "include": ["metadatas"],
                    "limit": SCAN_PAGE_SIZE,
                    "offset": offset,
                }))
                .await?;
            let fetched = page.ids.len();
            paths.extend(
                page.metadatas
                    .unwrap_or_default()
                    .into_iter()
                    .flatten()
                    .filter_map(|m| m.get("path").and_then(Value::as_str).map(str::to_string)),
            );
            if fetched < SCAN_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }
        Ok(paths)
    }

    async fn count(&self) -> Result<usize> {
        send_json(self.client.http.get(self.url("count"))).await
    }
}

fn where_path(path: &str) -> Value {
    json!({ "path": path })
}

fn where_paths(paths: &[String]) -> Value {
    json!({ "path": { "$in": paths } })
}

fn add_body(records: &[DocumentRecord], embeddings: Vec<Vec<f32>>) -> Result<Value> {
    if embeddings.len() != records.len() {
        bail!(
            "embedder returned {} vectors for {} records",
            embeddings.len(),
            records.len()
        );
    }
    Ok(json!({
        "ids": records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        "documents": records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
        "metadatas": records.iter().map(|r| &r.metadata).collect::<Vec<_>>(),
        "embeddings": embeddings,
    }))
}

async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let resp = req.send().await.context("request to store failed")?;
    parse_response(resp).await
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("store returned {}: {}", status, body);
    }
    resp.json().await.context("invalid response from store")
}
