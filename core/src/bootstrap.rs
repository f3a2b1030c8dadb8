//! Wires every collaborator from [`env_config::AppConfig`] into a running
//! [`Orchestrator`], the way a binary entry point would at process start.
//!
//! Config loading is ambient, not a feature, so this crate owns the wiring
//! even though the HTTP surface that would call it is out of scope.

use std::sync::Arc;

use env_config::AppConfig;

use crate::cache::InMemoryCache;
use crate::embedding::{ActivityTracker, Embedder, InternalEmbeddingProvider, KeepAlive, RemoteEmbeddingClient};
use crate::llm::OpenAiLlmClient;
use crate::memory::ConversationMemory;
use crate::orchestrator::Orchestrator;
use crate::progress::ProgressBus;
use crate::prompts::load_or_default;
use crate::search::SearchClient;

const DEFAULT_ANSWER_MODEL: &str = "gpt-4o-mini";
const EMBEDDING_CACHE_SIZE: usize = 10_000;

/// Constructs an [`Orchestrator`] and, when the external embedding endpoint
/// is configured, a [`KeepAlive`] daemon that must be spawned by the caller
/// (`tokio::spawn(keepalive.run())`) to actually run.
pub struct Bootstrapped {
    pub orchestrator: Arc<Orchestrator>,
    pub keepalive: Option<KeepAlive>,
    pub progress: Arc<ProgressBus>,
}

/// Builds every collaborator the pipeline needs from validated config:
/// an OpenAI-compatible LLM client, a remote-first/internal-fallback
/// embedder, an Elasticsearch-compatible search client, in-memory caches,
/// conversation memory, embedded prompt templates, and a progress bus.
pub fn bootstrap(config: &AppConfig) -> Bootstrapped {
    let answer_model = config
        .openai_model_answer
        .clone()
        .or_else(|| config.openai_model.clone())
        .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.to_string());
    let llm = Arc::new(OpenAiLlmClient::new(config.openai_api_key.clone(), answer_model));

    let activity = Arc::new(ActivityTracker::default());
    let internal: Arc<dyn Embedder> = Arc::new(InternalEmbeddingProvider::new(config.openai_api_key.clone()));
    let embedding_cache = Arc::new(InMemoryCache::<String, Vec<f32>>::bounded(EMBEDDING_CACHE_SIZE));
    let embedder = Arc::new(RemoteEmbeddingClient::new(
        Some(config.embedding_api_endpoint.clone()),
        config.embedding_api_key.clone(),
        embedding_cache,
        internal,
        Arc::clone(&activity),
    ));

    let keepalive = config.embedding_keepalive_enabled.then(|| {
        KeepAlive::new(
            Some(config.embedding_api_endpoint.clone()),
            config.embedding_keepalive_interval_minutes,
            activity,
        )
    });

    let search = Arc::new(SearchClient::new(
        config.elasticsearch_url.clone().unwrap_or_default(),
        Some(config.elasticsearch_api_key.clone()),
    ));

    let llm_cache = Arc::new(InMemoryCache::<String, String>::unbounded());
    let prompts = Arc::new(load_or_default(None));
    let memory = Arc::new(ConversationMemory::new());
    let progress = Arc::new(ProgressBus::new());

    let orchestrator = Arc::new(Orchestrator::new(
        llm,
        embedder,
        search,
        llm_cache,
        prompts,
        Arc::clone(&memory),
        Arc::clone(&progress),
    ));

    Bootstrapped { orchestrator, keepalive, progress }
}
