//! Qdrant vector store client
//!
//! Stateless HTTP/JSON client for the external collection that granted
//! embeddings are committed to. Each request rides its own connection
//! (`Connection: close`, no idle pool) and only the response status is
//! consumed. All failure modes collapse into [`StoreError`]; the
//! coordinator flattens them further into a single denial.

use reqwest::header::CONNECTION;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors from the vector store. DNS, connect, I/O and timeout failures
/// all surface through the transport variant.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} returned unexpected status {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    #[error("embedding must not be empty")]
    EmptyEmbedding,
}

/// Connection settings for the vector store.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub host: String,
    pub port: String,
    pub collection: String,
    /// Whole-request deadline; a timeout is reported as a store failure.
    pub timeout: Duration,
}

impl VectorStoreConfig {
    pub fn new(host: impl Into<String>, port: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            collection: collection.into(),
            timeout: Duration::from_secs(10),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Client for one named Qdrant collection.
pub struct VectorStoreClient {
    config: VectorStoreConfig,
    http: reqwest::Client,
}

impl VectorStoreClient {
    pub fn new(config: VectorStoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Create the collection if it does not exist yet.
    ///
    /// Issues `PUT /collections/{name}` with the cosine distance metric.
    /// 409 is acceptable: the collection already exists.
    pub async fn ensure_collection(&self, vector_size: usize) -> Result<(), StoreError> {
        let url = format!("{}/collections/{}", self.config.base_url(), self.config.collection);
        let body = json!({
            "vectors": { "size": vector_size, "distance": "Cosine" }
        });

        let status = self.put_json(&url, &body, "ensure_collection").await?;
        match status {
            200 | 201 | 409 => Ok(()),
            status => {
                warn!(
                    collection = %self.config.collection,
                    status,
                    "could not ensure collection"
                );
                Err(StoreError::UnexpectedStatus {
                    operation: "ensure_collection",
                    status,
                })
            }
        }
    }

    /// Upsert one point, keyed by agent id, waiting for the write to land.
    ///
    /// Ensures the collection exists with the embedding's dimensionality
    /// first, then issues `PUT /collections/{name}/points?wait=true`.
    pub async fn upsert_point(&self, agent_id: &str, embedding: &[f32]) -> Result<(), StoreError> {
        if embedding.is_empty() {
            return Err(StoreError::EmptyEmbedding);
        }

        self.ensure_collection(embedding.len()).await?;

        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.config.base_url(),
            self.config.collection
        );
        let body = json!({
            "points": [{ "id": agent_id, "vector": embedding }]
        });

        let status = self.put_json(&url, &body, "upsert_point").await?;
        match status {
            200 | 201 => Ok(()),
            status => {
                warn!(agent_id, status, "upsert failed");
                Err(StoreError::UnexpectedStatus {
                    operation: "upsert_point",
                    status,
                })
            }
        }
    }

    /// PUT a JSON body and return the numeric status. The response body is
    /// drained to end-of-stream but otherwise ignored.
    async fn put_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        operation: &'static str,
    ) -> Result<u16, StoreError> {
        let response = self
            .http
            .put(url)
            .header(CONNECTION, "close")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    host = %self.config.host,
                    port = %self.config.port,
                    operation,
                    error = %err,
                    "request failed"
                );
                err
            })?;

        let status = response.status().as_u16();
        let _ = response.bytes().await;
        Ok(status)
    }
}
