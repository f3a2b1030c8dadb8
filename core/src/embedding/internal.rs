//! The internal embedding fallback provider: an LLM-supplied embedding
//! model, used when the external embedding endpoint is unconfigured or
//! exhausted its retries.
//!
//! Grounded on `loom/src/memory/openai_embedder.rs` (`OpenAIEmbedder`):
//! same per-model dimension table idiom, same `async_openai::Client` wrap.

use async_openai::config::OpenAIConfig;
use async_openai::types::embeddings::CreateEmbeddingRequestArgs;
use async_openai::Client;
use async_trait::async_trait;

use super::{EmbeddingError, Embedder};

const DEFAULT_MODEL: &str = "text-embedding-3-small";

fn model_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => 1536,
    }
}

pub struct InternalEmbeddingProvider {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl InternalEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimensions = model_dimensions(&model);
        let config = OpenAIConfig::new().with_api_key(api_key.into());
        Self { client: Client::with_config(config), model, dimensions }
    }

    pub fn dimension(&self) -> usize {
        self.dimensions
    }
}

#[async_trait]
impl Embedder for InternalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input([text])
            .build()
            .map_err(|e| EmbeddingError::Upstream(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmbeddingError::Upstream(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Upstream("empty embedding response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_table_matches_known_models() {
        assert_eq!(model_dimensions("text-embedding-3-large"), 3072);
        assert_eq!(model_dimensions("text-embedding-3-small"), 1536);
        assert_eq!(model_dimensions("text-embedding-ada-002"), 1536);
        assert_eq!(model_dimensions("some-future-model"), 1536);
    }
}
