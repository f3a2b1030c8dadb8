//! Search-engine client: submits structured queries, degrades to an empty
//! response on transport/status failure, and formats hits into the
//! Norwegian chunk template injected into the answer prompt.
//!
//! Grounded on `examples/original_source/src/elasticsearch_client.py`
//! (`search`, `format_chunks`, `health_check`).

mod chunks;

pub use chunks::format_chunks;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search upstream error: {0}")]
    Upstream(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_score")]
    pub score: f64,
    #[serde(rename = "_source")]
    pub source: HitSource,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HitSource {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub page: String,
}

#[derive(Clone, Debug, Default)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    pub total: u64,
}

fn empty_response() -> SearchResponse {
    SearchResponse { hits: Vec::new(), total: 0 }
}

pub struct SearchClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl SearchClient {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into(), api_key }
    }

    /// Submits the query object. Never returns an error: transport failures
    /// and non-success statuses both degrade to an empty response, since the
    /// pipeline treats zero-hit answers as valid.
    pub async fn search(&self, query: &Value) -> SearchResponse {
        let mut request = self.http.post(&self.url).json(query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(error = %err, "search request failed, degrading to empty response");
                return empty_response();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "search returned non-success status, degrading to empty response");
            return empty_response();
        }

        match response.json::<Value>().await {
            Ok(body) => parse_search_response(&body),
            Err(err) => {
                tracing::warn!(error = %err, "search response was not valid json, degrading to empty response");
                empty_response()
            }
        }
    }

    /// A minimal `match_all` probe with `size=1`; used only by the
    /// out-of-scope HTTP health endpoint, never by the Orchestrator.
    pub async fn health_check(&self) -> bool {
        let probe = serde_json::json!({ "size": 1, "query": { "match_all": {} } });
        let mut request = self.http.post(&self.url).json(&probe);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        matches!(request.send().await, Ok(resp) if resp.status().is_success())
    }
}

/// Interface-typed collaborator so the Orchestrator can be exercised against
/// a stub in tests without a live search endpoint.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &Value) -> SearchResponse;
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(&self, query: &Value) -> SearchResponse {
        SearchClient::search(self, query).await
    }
}

fn parse_search_response(body: &Value) -> SearchResponse {
    let total = body
        .pointer("/hits/total/value")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let hits: Vec<Hit> = body
        .pointer("/hits/hits")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|h| serde_json::from_value(h.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    SearchResponse { hits, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let body = serde_json::json!({
            "took": 5,
            "hits": {
                "total": { "value": 2 },
                "hits": [
                    { "_score": 1.5, "_source": { "text": "a", "reference": "NS 1", "page": "3" } },
                    { "_score": 1.1, "_source": { "text": "b", "reference": "NS 2", "page": "7" } }
                ]
            }
        });
        let parsed = parse_search_response(&body);
        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.hits.len(), 2);
        assert_eq!(parsed.hits[0].source.reference, "NS 1");
    }

    #[test]
    fn missing_hits_parses_as_empty() {
        let body = serde_json::json!({});
        let parsed = parse_search_response(&body);
        assert_eq!(parsed.total, 0);
        assert!(parsed.hits.is_empty());
    }
}
