//! Structured search-query construction: one builder per route.
//!
//! Grounded on `examples/original_source/src/qo_filter.py`, `qo_textual.py`,
//! `qo_personal.py` (the canonical query shapes; `query_builders.py`'s
//! dynamic-dispatch fallback branches use different field names and are
//! legacy, not replicated here).

mod filter;
mod memory;
mod personal;
mod textual;

pub use filter::build_filter_query;
pub use memory::build_memory_query;
pub use personal::build_personal_query;
pub use textual::build_textual_query;

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryBuildError {
    #[error("query object missing non-empty `query`")]
    MissingQuery,
    #[error("query object missing `size`")]
    MissingSize,
}

/// Wraps `inner` in a `script_score` clause when `embedding` is present and
/// at least one component is non-zero; otherwise returns `inner` unchanged.
pub fn maybe_wrap_script_score(inner: Value, embedding: Option<&[f32]>) -> Value {
    let has_signal = embedding.is_some_and(|v| v.iter().any(|x| *x != 0.0));
    if !has_signal {
        return inner;
    }
    let vector = embedding.expect("has_signal implies Some");
    json!({
        "script_score": {
            "query": inner,
            "script": {
                "source": "cosineSimilarity(params.query_vector, 'vector') + 1.0",
                "params": { "query_vector": vector }
            }
        }
    })
}

/// Validates that a built query object has a non-empty `query` and a `size`.
pub fn validate_query_object(query_object: &Value) -> Result<(), QueryBuildError> {
    let has_query = match query_object.get("query") {
        Some(q) if q.is_null() => false,
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
        None => false,
    };
    if !has_query {
        return Err(QueryBuildError::MissingQuery);
    }
    if query_object.get("size").is_none() {
        return Err(QueryBuildError::MissingSize);
    }
    Ok(())
}

pub(crate) const SOURCE_FIELDS: [&str; 3] = ["text", "reference", "page"];
