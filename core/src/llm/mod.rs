//! LLM client abstraction: namespaced chat-completion calls with caching,
//! retries, and a streaming mode for the final answer.
//!
//! Grounded on `loom/src/llm/mod.rs`'s `LlmClient` trait shape (single-shot
//! `invoke` plus a streaming variant with a default fallback) and on
//! `prompt_manager.py`'s per-namespace system messages and output-cleaning
//! rules.

mod mock;
mod openai;

pub use mock::MockLlm;
pub use openai::OpenAiLlmClient;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::route::Route;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call timed out")]
    Timeout,
    #[error("llm upstream error: {0}")]
    Upstream(String),
    #[error("llm stream failed: {0}")]
    Stream(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Analysis,
    ExtractStandard,
    ExtractFromMemory,
    OptimizeSemantic,
    OptimizeTextual,
    Answer,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Analysis => "analysis",
            Namespace::ExtractStandard => "extractStandard",
            Namespace::ExtractFromMemory => "extractFromMemory",
            Namespace::OptimizeSemantic => "optimizeSemantic",
            Namespace::OptimizeTextual => "optimizeTextual",
            Namespace::Answer => "answer",
        }
    }

    /// Default call options and cache TTL for this namespace.
    pub fn config(&self) -> NamespaceConfig {
        match self {
            Namespace::Analysis => NamespaceConfig {
                max_tokens: 20,
                temperature: 0.0,
                ttl_secs: 3600,
                system_message: "Return exactly one of: including/without/personal/memory",
            },
            Namespace::ExtractStandard => NamespaceConfig {
                max_tokens: 100,
                temperature: 0.0,
                ttl_secs: 1800,
                system_message: "Return only standard numbers, comma separated",
            },
            Namespace::ExtractFromMemory => NamespaceConfig {
                max_tokens: 100,
                temperature: 0.0,
                ttl_secs: 900,
                system_message: "Return only standard numbers, comma separated, scoped to the conversation memory",
            },
            Namespace::OptimizeSemantic => NamespaceConfig {
                max_tokens: 200,
                temperature: 0.0,
                ttl_secs: 1800,
                system_message: "Optimise for semantic search",
            },
            Namespace::OptimizeTextual => NamespaceConfig {
                max_tokens: 150,
                temperature: 0.0,
                ttl_secs: 1800,
                system_message: "Extract key textual terms",
            },
            Namespace::Answer => NamespaceConfig {
                max_tokens: 1200,
                temperature: 0.0,
                ttl_secs: 900,
                system_message: "Answer in Norwegian; grounded in provided chunks",
            },
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NamespaceConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub ttl_secs: u64,
    pub system_message: &'static str,
}

/// Per-call overrides for a namespace's defaults.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Token usage for one LLM call.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// LLM client: namespace-scoped single-shot and streaming chat completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-shot completion. Callers are expected to consult the cache
    /// before calling and to store the result after; the client itself is
    /// retried internally (up to 3 attempts, bounded backoff) on transient
    /// upstream failures.
    async fn call(
        &self,
        namespace: Namespace,
        messages: &[ChatMessage],
        opts: CallOptions,
    ) -> Result<String, LlmError>;

    /// Streaming completion: forwards partial content deltas through
    /// `chunk_tx` until the provider signals completion, then returns the
    /// fully accumulated text. Bypasses the cache. A send failure on
    /// `chunk_tx` (subscriber gone) is not itself fatal to generation.
    async fn call_stream(
        &self,
        namespace: Namespace,
        messages: &[ChatMessage],
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<String, LlmError> {
        let full = self.call(namespace, messages, CallOptions::default()).await?;
        if !full.is_empty() {
            let _ = chunk_tx.send(full.clone()).await;
        }
        Ok(full)
    }
}

/// Normalises a raw `analysis` completion into a [`Route`], independent of
/// the Orchestrator's own route-decision step (so `LlmClient` alone is
/// testable against the route enum). Mirrors `execute_analysis`'s exact
/// cleaning sequence in the upstream `prompt_manager.py`: lower-case and
/// trim, then strip surrounding punctuation, then validate against the
/// four known route names.
pub fn normalize_analysis_output(raw: &str) -> Route {
    let lowered = raw.trim().to_lowercase();
    let cleaned = lowered.trim_matches(|c: char| "'\"()[]{}.,!?;: \n\r\t".contains(c));
    cleaned.parse::<Route>().unwrap_or(Route::Without)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_routes() {
        assert_eq!(normalize_analysis_output(" Including. "), Route::Including);
        assert_eq!(normalize_analysis_output("\"memory\""), Route::Memory);
        assert_eq!(normalize_analysis_output("PERSONAL"), Route::Personal);
    }

    #[test]
    fn coerces_unknown_output_to_without() {
        assert_eq!(normalize_analysis_output("i am not sure"), Route::Without);
        assert_eq!(normalize_analysis_output(""), Route::Without);
    }

    #[tokio::test]
    async fn default_call_stream_sends_full_content_once() {
        let llm = MockLlm::with_fixed_response("hello");
        let (tx, mut rx) = mpsc::channel(2);
        let full = llm
            .call_stream(Namespace::Answer, &[], tx)
            .await
            .unwrap();
        assert_eq!(full, "hello");
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }
}
