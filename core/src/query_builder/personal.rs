//! Route `personal`: `bool.filter.wildcard` on a fixed `*Personalhåndbok*`
//! reference pattern.
//!
//! Grounded on `examples/original_source/src/qo_personal.py`. The `text`
//! parameter is accepted for signature symmetry with the other three
//! builders but intentionally unused in the filter body, matching the
//! upstream behaviour.

use serde_json::{json, Value};

use super::{maybe_wrap_script_score, SOURCE_FIELDS};

const SIZE: u32 = 400;

pub fn build_personal_query(_text: &str, embedding: Option<&[f32]>) -> Value {
    let inner = json!({
        "bool": {
            "filter": {
                "wildcard": {
                    "reference.keyword": {
                        "value": "*Personalhåndbok*",
                        "case_insensitive": true
                    }
                }
            }
        }
    });

    json!({
        "size": SIZE,
        "query": maybe_wrap_script_score(inner, embedding),
        "_source": SOURCE_FIELDS
    })
}
