//! Dense-vector embeddings for retrieval.
//!
//! Grounded on `loom/src/memory/embedder.rs`'s `Embedder` trait contract;
//! the retrieval algorithm (cache → external HTTP endpoint with progressive
//! timeouts → internal fallback) is grounded on
//! `examples/original_source/src/elasticsearch_client.py`'s
//! `get_embeddings_from_api` / `_generate_internal_embeddings`.

mod internal;
pub mod keepalive;

pub use internal::InternalEmbeddingProvider;
pub use keepalive::{ActivityTracker, KeepAlive};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{Cache, CacheKey};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding upstream error: {0}")]
    Upstream(String),
    #[error("embedding response did not match any known shape")]
    UnrecognisedShape,
}

/// Produces dense vectors for text. Implementations: [`InternalEmbeddingProvider`]
/// (an LLM-supplied embedding model) and [`RemoteEmbeddingClient`] (the
/// external-endpoint-first, internal-fallback composite used in production).
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

const EMBEDDING_CACHE_TTL: Duration = Duration::from_secs(7200);
const PROGRESSIVE_TIMEOUTS_SECS: [u64; 3] = [30, 45, 60];
const EXTERNAL_KEY_PREFIX: &str = "external_";
const INTERNAL_KEY_PREFIX: &str = "internal_";

fn is_loopback(endpoint: &str) -> bool {
    endpoint.contains("127.0.0.1") || endpoint.contains("localhost")
}

/// Tries response shapes in order, first match wins: `vectors` →
/// `vector` → `data[0].embedding` → bare array.
pub fn parse_embedding_response(body: &Value) -> Option<Vec<f32>> {
    if let Some(vectors) = body.get("vectors").and_then(|v| v.as_array()) {
        if let Some(first) = vectors.first().and_then(|v| v.as_array()) {
            return Some(first.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect());
        }
    }
    if let Some(vector) = body.get("vector").and_then(|v| v.as_array()) {
        return Some(vector.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect());
    }
    if let Some(data) = body.get("data").and_then(|v| v.as_array()) {
        if let Some(embedding) = data
            .first()
            .and_then(|d| d.get("embedding"))
            .and_then(|v| v.as_array())
        {
            return Some(embedding.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect());
        }
    }
    if let Some(bare) = body.as_array() {
        return Some(bare.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect());
    }
    None
}

/// Production embedding client: cache lookup, external HTTP endpoint with
/// progressive-timeout retries, internal-provider fallback.
pub struct RemoteEmbeddingClient {
    http: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
    cache: Arc<dyn Cache<String, Vec<f32>>>,
    internal: Arc<dyn Embedder>,
    activity: Arc<keepalive::ActivityTracker>,
}

impl RemoteEmbeddingClient {
    pub fn new(
        endpoint: Option<String>,
        api_key: Option<String>,
        cache: Arc<dyn Cache<String, Vec<f32>>>,
        internal: Arc<dyn Embedder>,
        activity: Arc<keepalive::ActivityTracker>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            cache,
            internal,
            activity,
        }
    }

    fn external_configured(&self) -> bool {
        match &self.endpoint {
            None => false,
            Some(e) => !e.is_empty() && e != "INTERNAL",
        }
    }

    async fn call_external_once(&self, text: &str, timeout: Duration) -> Result<Vec<f32>, EmbeddingError> {
        let endpoint = self.endpoint.as_ref().expect("checked by caller");
        let mut request = self.http.post(endpoint).json(&serde_json::json!({ "text": text }));
        if !is_loopback(endpoint) {
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }
        }

        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| EmbeddingError::Upstream("timeout".to_string()))?
            .map_err(|e| EmbeddingError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Upstream(format!("status {}", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Upstream(e.to_string()))?;

        parse_embedding_response(&body).ok_or(EmbeddingError::UnrecognisedShape)
    }

    async fn call_internal(&self, text: &str, key: String) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.internal.embed(text).await?;
        let _ = self.cache.set(key, vector.clone(), Some(EMBEDDING_CACHE_TTL)).await;
        Ok(vector)
    }
}

#[async_trait]
impl Embedder for RemoteEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let external_key = format!("{EXTERNAL_KEY_PREFIX}{}", CacheKey::build("embedding", text, None));
        let internal_key = format!("{INTERNAL_KEY_PREFIX}{}", CacheKey::build("embedding", text, None));

        if let Some(cached) = self.cache.get(&external_key).await {
            return Ok(cached);
        }
        if let Some(cached) = self.cache.get(&internal_key).await {
            return Ok(cached);
        }

        if !self.external_configured() {
            return self.call_internal(text, internal_key).await;
        }

        let mut last_err = None;
        for timeout_secs in PROGRESSIVE_TIMEOUTS_SECS {
            match self.call_external_once(text, Duration::from_secs(timeout_secs)).await {
                Ok(vector) => {
                    let _ = self
                        .cache
                        .set(external_key, vector.clone(), Some(EMBEDDING_CACHE_TTL))
                        .await;
                    self.activity.update_activity().await;
                    return Ok(vector);
                }
                Err(err) => last_err = Some(err),
            }
        }
        tracing::warn!(error = ?last_err, "external embedding endpoint exhausted retries, falling back to internal provider");
        self.call_internal(text, internal_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vectors_shape_first() {
        let body = serde_json::json!({ "vectors": [[1.0, 2.0]], "vector": [9.0] });
        assert_eq!(parse_embedding_response(&body), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn parses_vector_shape() {
        let body = serde_json::json!({ "vector": [1.0, 2.0, 3.0] });
        assert_eq!(parse_embedding_response(&body), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn parses_data_embedding_shape() {
        let body = serde_json::json!({ "data": [{ "embedding": [0.5, 0.25] }] });
        assert_eq!(parse_embedding_response(&body), Some(vec![0.5, 0.25]));
    }

    #[test]
    fn parses_bare_array_shape() {
        let body = serde_json::json!([1.0, 0.0]);
        assert_eq!(parse_embedding_response(&body), Some(vec![1.0, 0.0]));
    }

    #[test]
    fn unrecognised_shape_returns_none() {
        let body = serde_json::json!({ "unexpected": true });
        assert_eq!(parse_embedding_response(&body), None);
    }

    #[test]
    fn loopback_detection() {
        assert!(is_loopback("http://127.0.0.1:8080/embed"));
        assert!(is_loopback("http://localhost:9000/embed"));
        assert!(!is_loopback("https://embeddings.example.com/embed"));
    }
}
