//! The pipeline: validate → analyse/optimise → extract → route → embed →
//! build query → search → answer → persist → complete.
//!
//! Grounded on `examples/original_source/src/flow_manager.py`
//! (`FlowManager.process_query`, `process_query_with_sse`) for the
//! algorithm; on `loom/src/agent/react/runner/runner.rs` for the Rust idiom
//! of a runner struct wiring collaborators together with both a plain
//! `invoke`-style entry point and a streaming one.

mod chunks_budget;
mod route_decision;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use progress_event::ProgressEvent;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::cache::{Cache, CacheKey};
use crate::embedding::Embedder;
use crate::llm::{normalize_analysis_output, CallOptions, ChatMessage, LlmClient, Namespace};
use crate::memory::ConversationMemory;
use crate::progress::ProgressBus;
use crate::prompts::{PromptStore, TemplateName};
use crate::query_builder::{build_filter_query, build_memory_query, build_personal_query, build_textual_query};
use crate::route::Route;
use crate::search::{format_chunks, SearchBackend};
use crate::validator::{extract_standards_from_text, validate_question, validate_standard_numbers, ValidationError};

use chunks_budget::{fit_chunks_to_budget, NON_STREAM_CHUNK_BUDGET, STREAM_CHUNK_BUDGET};
use route_decision::decide_route;

const NON_STREAM_SOFT_DEADLINE: Duration = Duration::from_secs(30);
const STREAM_SOFT_DEADLINE: Duration = Duration::from_secs(45);
const FALLBACK_ANSWER: &str = "Beklager, systemet kunne ikke fullføre svaret akkurat nå.";

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("forespørselen tok for lang tid, prøv et enklere spørsmål")]
    Timeout,
}

fn template_for(namespace: Namespace) -> TemplateName {
    match namespace {
        Namespace::Analysis => TemplateName::Analysis,
        Namespace::ExtractStandard => TemplateName::ExtractStandard,
        Namespace::ExtractFromMemory => TemplateName::ExtractFromMemory,
        Namespace::OptimizeSemantic => TemplateName::OptimizeSemantic,
        Namespace::OptimizeTextual => TemplateName::OptimizeTextual,
        Namespace::Answer => TemplateName::Answer,
    }
}

/// Wires the Validator, LLMClient, EmbeddingClient, SearchClient,
/// QueryBuilder, ConversationMemory, PromptStore, and ProgressBus together
/// into the ten-step pipeline.
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn SearchBackend>,
    llm_cache: Arc<dyn Cache<String, String>>,
    prompts: Arc<PromptStore>,
    memory: Arc<ConversationMemory>,
    progress: Arc<ProgressBus>,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn SearchBackend>,
        llm_cache: Arc<dyn Cache<String, String>>,
        prompts: Arc<PromptStore>,
        memory: Arc<ConversationMemory>,
        progress: Arc<ProgressBus>,
    ) -> Self {
        Self { llm, embedder, search, llm_cache, prompts, memory, progress }
    }

    /// Runs the pipeline without a streaming subscriber attached. Progress
    /// events are still published internally, so a later `stream_query`
    /// against the same `progress_session_id` would see them replayed.
    pub async fn process_query(
        &self,
        question: &str,
        memory_session_id: &str,
        progress_session_id: Option<&str>,
    ) -> Result<String, OrchestratorError> {
        self.run_with_deadline(
            question,
            memory_session_id,
            progress_session_id,
            NON_STREAM_SOFT_DEADLINE,
            NON_STREAM_CHUNK_BUDGET,
        )
        .await
    }

    /// Runs the pipeline with a progress session a caller is expected to be
    /// subscribed to; answer tokens are published as `Token` events as they
    /// are produced, in addition to being accumulated in the return value.
    pub async fn stream_query(
        &self,
        question: &str,
        memory_session_id: &str,
        progress_session_id: &str,
    ) -> Result<String, OrchestratorError> {
        self.run_with_deadline(
            question,
            memory_session_id,
            Some(progress_session_id),
            STREAM_SOFT_DEADLINE,
            STREAM_CHUNK_BUDGET,
        )
        .await
    }

    async fn run_with_deadline(
        &self,
        question: &str,
        memory_session_id: &str,
        progress_session_id: Option<&str>,
        deadline: Duration,
        chunk_budget: usize,
    ) -> Result<String, OrchestratorError> {
        match tokio::time::timeout(
            deadline,
            self.run_pipeline(question, memory_session_id, progress_session_id, chunk_budget),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                self.emit_error(progress_session_id, "timeout, prøv et enklere spørsmål").await;
                if let Some(id) = progress_session_id {
                    self.progress.close_session(id).await;
                }
                Err(OrchestratorError::Timeout)
            }
        }
    }

    async fn run_pipeline(
        &self,
        question: &str,
        memory_session_id: &str,
        progress_session_id: Option<&str>,
        chunk_budget: usize,
    ) -> Result<String, OrchestratorError> {
        self.emit_progress(progress_session_id, "started", "Starter behandling", Some(5)).await;

        // 1. Validate
        let validated_question = match validate_question(question) {
            Ok(q) => q,
            Err(err) => {
                self.emit_error(progress_session_id, &err.to_string()).await;
                if let Some(id) = progress_session_id {
                    self.progress.close_session(id).await;
                }
                return Err(OrchestratorError::Validation(err));
            }
        };
        self.emit_progress(progress_session_id, "validation", "Spørsmål validert", Some(10)).await;

        let memory_text = self.memory.get(memory_session_id);

        // 2. Parallel(optimise-semantic, analyse)
        self.emit_progress(progress_session_id, "analysis", "Analyserer spørsmål", Some(15)).await;
        let (optimised_result, analysis_result) = tokio::join!(
            self.cached_call(Namespace::OptimizeSemantic, &validated_question, &memory_text),
            self.cached_call(Namespace::Analysis, &validated_question, &memory_text),
        );
        let optimised = optimised_result.unwrap_or_else(|_| validated_question.clone());
        let analysis = analysis_result
            .map(|raw| normalize_analysis_output(&raw))
            .unwrap_or(Route::Without);

        // 3. Extract
        self.emit_progress(progress_session_id, "extraction", "Trekker ut standarder", Some(25)).await;
        let mut memory_terms: Vec<String> = Vec::new();
        let mut validated_standards: Vec<String> = Vec::new();
        let mut effective_analysis = analysis;

        if analysis == Route::Memory {
            let raw = self
                .cached_call(Namespace::ExtractFromMemory, &validated_question, &memory_text)
                .await
                .unwrap_or_default();
            memory_terms = validate_standard_numbers(&extract_standards_from_text(&raw));
            if memory_terms.is_empty() {
                effective_analysis = Route::Without;
            }
        } else {
            let raw = self
                .cached_call(Namespace::ExtractStandard, &validated_question, &memory_text)
                .await
                .unwrap_or_default();
            validated_standards = validate_standard_numbers(&extract_standards_from_text(&raw));
            if validated_standards.is_empty() && analysis == Route::Including {
                validated_standards = validate_standard_numbers(&extract_standards_from_text(&memory_text));
            }
        }

        // 4. Route decision
        let mut route = decide_route(effective_analysis, &validated_standards, &memory_terms);
        self.emit_progress(progress_session_id, "routing", &format!("Rute: {route}"), Some(35)).await;

        // 5. Embed
        self.emit_progress(progress_session_id, "search", "Bygger søkevektor", Some(45)).await;
        let embedding = self.embedder.embed(&optimised).await.ok();

        // 6. Build query
        let mut textual_output: Option<String> = None;
        let mut query = match route {
            Route::Including if validated_standards.is_empty() => {
                route = Route::Without;
                let textual = self.optimise_textual(&validated_question, &memory_text, &optimised).await;
                let q = build_textual_query(&textual, embedding.as_deref());
                textual_output = Some(textual);
                q
            }
            Route::Including => build_filter_query(&validated_standards, embedding.as_deref()),
            Route::Memory => build_memory_query(&memory_terms, embedding.as_deref()),
            Route::Personal => build_personal_query(&validated_question, embedding.as_deref()),
            Route::Without => {
                let textual = self.optimise_textual(&validated_question, &memory_text, &optimised).await;
                let q = build_textual_query(&textual, embedding.as_deref());
                textual_output = Some(textual);
                q
            }
        };

        // 7. Search
        self.emit_progress(progress_session_id, "search", "Søker i standarder", Some(60)).await;
        let mut response = self.search.search(&query).await;
        if route == Route::Including && response.hits.is_empty() {
            let textual = match textual_output {
                Some(t) => t,
                None => self.optimise_textual(&validated_question, &memory_text, &optimised).await,
            };
            query = build_textual_query(&textual, embedding.as_deref());
            response = self.search.search(&query).await;
        }
        self.emit_progress(progress_session_id, "search", "Søk fullført", Some(75)).await;

        let chunks = fit_chunks_to_budget(&format_chunks(&response), chunk_budget);

        // 8. Answer
        self.emit_progress(progress_session_id, "answer_generation", "Genererer svar", Some(85)).await;
        let mut vars = HashMap::new();
        vars.insert("last_utterance", validated_question.as_str());
        vars.insert("conversation_memory", memory_text.as_str());
        vars.insert("chunks", chunks.as_str());
        let prompt = self.prompts.render(TemplateName::Answer, &vars);
        let messages = vec![
            ChatMessage::system(Namespace::Answer.config().system_message),
            ChatMessage::user(prompt),
        ];

        let answer = match self.stream_answer_tokens(progress_session_id, &messages).await {
            Ok(text) if !text.trim().is_empty() => text,
            _ => match self.llm.call(Namespace::Answer, &messages, CallOptions::default()).await {
                Ok(text) if !text.trim().is_empty() => text,
                _ => FALLBACK_ANSWER.to_string(),
            },
        };

        // 9. Persist exchange (even the fallback message counts as an answer)
        if !validated_question.is_empty() {
            self.memory.append(memory_session_id, &validated_question, &answer);
        }

        // 10. Complete
        if let Some(id) = progress_session_id {
            self.progress.publish(id, ProgressEvent::FinalAnswer { text: answer.clone() }).await;
            self.emit_progress(progress_session_id, "complete", "Ferdig", Some(100)).await;
            self.progress.close_session(id).await;
        }

        Ok(answer)
    }

    async fn optimise_textual(&self, question: &str, memory: &str, fallback: &str) -> String {
        self.cached_call(Namespace::OptimizeTextual, question, memory)
            .await
            .unwrap_or_else(|_| fallback.to_string())
    }

    /// Renders the namespace's template, calls the LLM (consulting the
    /// cache first), and stores the result under the namespace's TTL.
    async fn cached_call(
        &self,
        namespace: Namespace,
        question: &str,
        memory: &str,
    ) -> Result<String, crate::llm::LlmError> {
        let config = namespace.config();
        let key = CacheKey::build(namespace.as_str(), question, Some(memory));
        if let Some(cached) = self.llm_cache.get(&key).await {
            return Ok(cached);
        }

        let mut vars = HashMap::new();
        vars.insert("last_utterance", question);
        vars.insert("conversation_memory", memory);
        let prompt = self.prompts.render(template_for(namespace), &vars);
        let messages = vec![ChatMessage::system(config.system_message), ChatMessage::user(prompt)];
        let opts = CallOptions { max_tokens: Some(config.max_tokens), temperature: Some(config.temperature) };

        let result = self.llm.call(namespace, &messages, opts).await?;
        let _ = self
            .llm_cache
            .set(key, result.clone(), Some(Duration::from_secs(config.ttl_secs)))
            .await;
        Ok(result)
    }

    /// Forwards streamed answer tokens to the progress session (if any) as
    /// they arrive, in addition to accumulating the full text. Losing the
    /// subscriber never stops token production: the forwarding task is
    /// independent of whether anyone is reading from `ProgressBus`.
    async fn stream_answer_tokens(
        &self,
        progress_session_id: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String, crate::llm::LlmError> {
        let (tx, mut rx) = mpsc::channel::<String>(32);
        let progress = Arc::clone(&self.progress);
        let session_id = progress_session_id.map(str::to_string);
        let forward = tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                if let Some(id) = &session_id {
                    progress.publish(id, ProgressEvent::Token { text: chunk, is_final: false }).await;
                }
            }
        });

        let result = self.llm.call_stream(Namespace::Answer, messages, tx).await;
        let _ = forward.await;

        if result.is_ok() {
            if let Some(id) = progress_session_id {
                self.progress.publish(id, ProgressEvent::Token { text: String::new(), is_final: true }).await;
            }
        }
        result
    }

    async fn emit_progress(&self, session_id: Option<&str>, stage: &str, message: &str, percent: Option<u8>) {
        if let Some(id) = session_id {
            self.progress
                .publish(
                    id,
                    ProgressEvent::Progress {
                        stage: stage.to_string(),
                        message: message.to_string(),
                        percent,
                        emoji: None,
                    },
                )
                .await;
        }
    }

    async fn emit_error(&self, session_id: Option<&str>, message: &str) {
        if let Some(id) = session_id {
            self.progress.publish(id, ProgressEvent::Error { message: message.to_string() }).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::embedding::EmbeddingError;
    use crate::llm::MockLlm;
    use crate::search::SearchResponse;
    use async_trait::async_trait;
    use serde_json::Value;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.1, 0.2])
        }
    }

    struct StubSearch {
        response: SearchResponse,
    }

    #[async_trait]
    impl SearchBackend for StubSearch {
        async fn search(&self, _query: &Value) -> SearchResponse {
            self.response.clone()
        }
    }

    fn build_orchestrator(llm_response: &str, search_response: SearchResponse) -> Orchestrator {
        Orchestrator::new(
            Arc::new(MockLlm::with_fixed_response(llm_response)),
            Arc::new(StubEmbedder),
            Arc::new(StubSearch { response: search_response }),
            Arc::new(InMemoryCache::unbounded()),
            Arc::new(PromptStore::new(HashMap::new())),
            Arc::new(ConversationMemory::new()),
            Arc::new(ProgressBus::new()),
        )
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_any_llm_call() {
        let orchestrator = build_orchestrator("without", SearchResponse::default());
        let result = orchestrator.process_query("", "session-1", None).await;
        assert!(matches!(result, Err(OrchestratorError::Validation(_))));
    }

    #[tokio::test]
    async fn without_route_produces_an_answer_and_persists_the_exchange() {
        let orchestrator = build_orchestrator("without", SearchResponse::default());
        let answer = orchestrator
            .process_query("hva sier NS-EN 1991 om vindlast", "session-2", None)
            .await
            .unwrap();
        assert_eq!(answer, "without");
        assert_ne!(orchestrator.memory.get("session-2"), "0");
    }

    #[tokio::test]
    async fn streaming_publishes_progress_and_final_answer() {
        let orchestrator = Arc::new(build_orchestrator("svaret er 42", SearchResponse::default()));
        let session = orchestrator.progress.create_session(Some("sess-stream".to_string())).await;
        let mut events = orchestrator.progress.subscribe(session.clone()).await;

        let orchestrator_clone = Arc::clone(&orchestrator);
        let handle = tokio::spawn(async move {
            orchestrator_clone
                .stream_query("hva sier NS-EN 1991 om vindlast", "session-3", "sess-stream")
                .await
        });

        let mut saw_final_answer = false;
        for _ in 0..200 {
            match tokio::time::timeout(Duration::from_secs(1), tokio_stream::StreamExt::next(&mut events)).await {
                Ok(Some(ev)) if ev["type"] == "final_answer" => {
                    saw_final_answer = true;
                    break;
                }
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
        assert!(saw_final_answer);
        let answer = handle.await.unwrap().unwrap();
        assert_eq!(answer, "svaret er 42");
    }
}
