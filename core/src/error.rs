//! Crate-root error type.
//!
//! Each subsystem raises its own `thiserror` enum; this type folds them into
//! the taxonomy a caller actually needs to match on.

use thiserror::Error;

use crate::cache::CacheError;
use crate::embedding::EmbeddingError;
use crate::llm::LlmError;
use crate::orchestrator::OrchestratorError;
use crate::prompts::LoadError;
use crate::query_builder::QueryBuildError;
use crate::search::SearchError;
use crate::validator::ValidationError;

/// Top-level error for the query-orchestration core.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    QueryBuild(#[from] QueryBuildError),

    #[error(transparent)]
    PromptLoad(#[from] LoadError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
