//! # normsvar-core
//!
//! Query-orchestration core for a natural-language retrieval pipeline over
//! Norwegian technical standards: a question is validated, routed
//! (including/without/personal/memory), turned into a structured search
//! query, grounded against retrieved chunks, and answered — with progress
//! streamed to a subscriber throughout.
//!
//! ## Main modules
//!
//! - [`orchestrator`]: [`Orchestrator`], the ten-step pipeline runner.
//! - [`route`]: [`Route`], the closed retrieval-route sum type.
//! - [`validator`]: question sanitisation, standard-number recognition.
//! - [`llm`]: [`LlmClient`] trait, [`Namespace`], [`MockLlm`], [`OpenAiLlmClient`].
//! - [`embedding`]: [`Embedder`] trait, [`RemoteEmbeddingClient`].
//! - [`search`]: [`SearchBackend`] trait, [`SearchClient`], `format_chunks`.
//! - [`query_builder`]: per-route structured query construction.
//! - [`cache`]: [`Cache`] trait, [`InMemoryCache`], [`CacheKey`].
//! - [`memory`]: [`ConversationMemory`], the per-session exchange log.
//! - [`prompts`]: [`PromptStore`], embedded + directory-overridable templates.
//! - [`progress`]: [`ProgressBus`], replay-then-live-tail progress streaming.
//! - [`title`]: deterministic conversation-title fallback.
//! - [`error`]: crate-root [`Error`] folding every subsystem error.
//! - [`bootstrap`]: wires every collaborator from [`env_config::AppConfig`].
//! - [`health`]: narrow health-probe surface for an external endpoint.
//!
//! Key types are re-exported at crate root:
//! `use normsvar_core::{Orchestrator, Route, Error};`

pub mod bootstrap;
pub mod cache;
pub mod embedding;
pub mod error;
pub mod health;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod query_builder;
pub mod route;
pub mod search;
pub mod title;
pub mod validator;

pub use bootstrap::{bootstrap, Bootstrapped};
pub use cache::{Cache, CacheError, CacheKey, InMemoryCache};
pub use embedding::{ActivityTracker, Embedder, EmbeddingError, InternalEmbeddingProvider, KeepAlive, RemoteEmbeddingClient};
pub use error::{Error, Result};
pub use health::{check_health, HealthStatus};
pub use llm::{
    normalize_analysis_output, CallOptions, ChatMessage, LlmClient, LlmError, LlmUsage, MockLlm,
    Namespace, NamespaceConfig, OpenAiLlmClient, Role,
};
pub use memory::{ConversationMemory, Exchange};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use progress::ProgressBus;
pub use prompts::{load_or_default, LoadError as PromptLoadError, PromptStore, TemplateName};
pub use query_builder::{
    build_filter_query, build_memory_query, build_personal_query, build_textual_query,
    maybe_wrap_script_score, validate_query_object, QueryBuildError,
};
pub use route::Route;
pub use search::{format_chunks, Hit, HitSource, SearchBackend, SearchClient, SearchError, SearchResponse};
pub use title::fallback_title;
pub use validator::{
    extract_standards_from_text, validate_question, validate_standard_numbers, ValidationError,
};
