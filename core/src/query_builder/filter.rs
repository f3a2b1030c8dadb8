//! Route `including`: one `wildcard` clause per standard (plus robust
//! variants), OR'd together with `minimum_should_match=1`.
//!
//! Grounded on `examples/original_source/src/qo_filter.py`.

use serde_json::{json, Value};

use super::{maybe_wrap_script_score, SOURCE_FIELDS};

const SIZE: u32 = 40;

/// Generates robust lookup variants for one standard number: the original,
/// with any `:year`/`+variant` suffix stripped, with `NS-`/`NS ` stripped,
/// `NS-EN`/`EN`/`NS EN` cross-forms, and hyphen/space interchange, plus a
/// numeric-only fragment.
fn standard_variants(standard: &str) -> Vec<String> {
    let mut variants = std::collections::HashSet::new();
    variants.insert(standard.to_string());

    let without_suffix = standard
        .split(once_any(standard, &[':', '+']))
        .next()
        .unwrap_or(standard)
        .trim()
        .to_string();
    variants.insert(without_suffix.clone());

    for base in [standard.to_string(), without_suffix.clone()] {
        if let Some(stripped) = base.strip_prefix("NS-") {
            variants.insert(stripped.trim().to_string());
        }
        if let Some(stripped) = base.strip_prefix("NS ") {
            variants.insert(stripped.trim().to_string());
        }
        if base.starts_with("NS-EN") {
            variants.insert(base.replacen("NS-EN", "EN", 1));
            variants.insert(base.replacen("NS-EN", "NS EN", 1));
        }
        if base.starts_with("NS EN") {
            variants.insert(base.replacen("NS EN", "EN", 1));
            variants.insert(base.replacen("NS EN", "NS-EN", 1));
        }
        variants.insert(base.replace('-', " "));
        variants.insert(base.replace(' ', "-"));
    }

    let numeric_only: String = without_suffix.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
    if !numeric_only.is_empty() {
        variants.insert(numeric_only);
    }

    let mut out: Vec<String> = variants.into_iter().filter(|v| !v.is_empty()).collect();
    out.sort();
    out
}

fn once_any(s: &str, needles: &[char]) -> char {
    s.chars().find(|c| needles.contains(c)).unwrap_or('\u{0}')
}

pub fn build_filter_query(standards: &[String], embedding: Option<&[f32]>) -> Value {
    let mut should = Vec::new();
    for standard in standards {
        for variant in standard_variants(standard) {
            should.push(json!({
                "wildcard": {
                    "reference.keyword": {
                        "value": format!("*{variant}*"),
                        "case_insensitive": true
                    }
                }
            }));
        }
    }

    let inner = json!({
        "bool": {
            "should": should,
            "minimum_should_match": 1
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
    fn builds_wildcard_clause_for_each_standard() {
        let query = build_filter_query(&["NS-EN 1991-1-4".to_string()], None);
        assert_eq!(query["size"], 40);
        let should = query["query"]["bool"]["should"].as_array().unwrap();
        assert!(should.iter().any(|c| {
            c["wildcard"]["reference.keyword"]["value"] == "*NS-EN 1991-1-4*"
        }));
        validate_query_object(&query).unwrap();
    }

    #[test]
    fn wraps_in_script_score_when_embedding_present() {
        let query = build_filter_query(&["NS 123".to_string()], Some(&[0.1, 0.2]));
        assert!(query["query"]["script_score"].is_object());
    }

    #[test]
    fn does_not_wrap_when_embedding_all_zero() {
        let query = build_filter_query(&["NS 123".to_string()], Some(&[0.0, 0.0]));
        assert!(query["query"]["script_score"].is_null());
    }

    #[test]
    fn generates_ns_en_cross_form_variant() {
        let variants = standard_variants("NS-EN 1991-1-4");
        assert!(variants.contains(&"EN 1991-1-4".to_string()));
    }
}
