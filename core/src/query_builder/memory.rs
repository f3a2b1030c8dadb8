//! Route `memory`: same shape as the `including` route's filter builder,
//! but clauses are built from conversation-memory-extracted terms rather
//! than question-extracted standards.

use serde_json::Value;

use super::build_filter_query;

pub fn build_memory_query(memory_terms: &[String], embedding: Option<&[f32]>) -> Value {
    build_filter_query(memory_terms, embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::validate_query_object;

    #[test]
    fn produces_same_shape_as_filter_query() {
        let filter = build_filter_query(&["NS 123".to_string()], None);
        let memory = build_memory_query(&["NS 123".to_string()], None);
        assert_eq!(filter, memory);
        validate_query_object(&memory).unwrap();
    }
}
