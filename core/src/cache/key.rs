//! Cache key derivation.
//!
//! A key folds in `{namespace, content, kwargs}`. When the caller's
//! conversation memory is non-trivial (not empty, not the literal `"0"`),
//! a short hash of it is mixed into the key so answers for the same
//! question under different conversation context never collide.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Namespace used for the `answer` cache, which additionally records
/// `memory_context=true` in the key payload when memory is non-trivial.
pub const ANSWER_NAMESPACE: &str = "answer";

fn is_trivial_memory(memory: &str) -> bool {
    memory.is_empty() || memory == "0"
}

fn short_hash(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Builds a deterministic cache key string for one (namespace, content,
/// conversation-memory) triple.
pub struct CacheKey;

impl CacheKey {
    pub fn build(namespace: &str, content: &str, conversation_memory: Option<&str>) -> String {
        let memory = conversation_memory.unwrap_or("0");
        if is_trivial_memory(memory) {
            format!("{namespace}:{content}")
        } else {
            let memory_hash = short_hash(memory);
            if namespace == ANSWER_NAMESPACE {
                format!("{namespace}:{content}:memory_context=true:{memory_hash:x}")
            } else {
                format!("{namespace}:{content}:{memory_hash:x}")
            }
        }
    }
}
