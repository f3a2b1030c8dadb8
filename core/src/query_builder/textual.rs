//! Route `without`: `multi_match` over `text^2` and `reference`.
//!
//! Grounded on `examples/original_source/src/qo_textual.py`.

use serde_json::{json, Value};

use super::{maybe_wrap_script_score, SOURCE_FIELDS};

const SIZE: u32 = 80;

pub fn build_textual_query(text: &str, embedding: Option<&[f32]>) -> Value {
    let inner = json!({
        "multi_match": {
            "query": text,
            "fields": ["text^2", "reference"]
        }
    });

    json!({
        "size": SIZE,
        "query": maybe_wrap_script_score(inner, embedding),
        "_source": SOURCE_FIELDS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::validate_query_object;

    #[test]
    fn builds_multi_match_over_text_and_reference() {
        let query = build_textual_query("vindlast", None);
        assert_eq!(query["size"], 80);
        assert_eq!(query["query"]["multi_match"]["query"], "vindlast");
        assert_eq!(
            query["query"]["multi_match"]["fields"],
            serde_json::json!(["text^2", "reference"])
        );
        validate_query_object(&query).unwrap();
    }

    #[test]
    fn wraps_in_script_score_with_embedding() {
        let query = build_textual_query("vindlast", Some(&[0.3]));
        assert!(query["query"]["script_score"].is_object());
    }
}
