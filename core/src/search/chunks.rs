//! Chunk formatting: the Norwegian template injected into the answer
//! prompt. Grounded on `format_chunks` in
//! `examples/original_source/src/elasticsearch_client.py`.

use super::SearchResponse;

const NO_HITS_MESSAGE: &str = "Ingen relevante dokumenter funnet.";
const PER_HIT_TRUNCATE_AT: usize = 2000;
const PER_HIT_TRUNCATE_TO: usize = 1800;
const TOTAL_BUDGET_BYTES: usize = 200_000;

fn truncate_text(text: &str) -> String {
    if text.chars().count() > PER_HIT_TRUNCATE_AT {
        let truncated: String = text.chars().take(PER_HIT_TRUNCATE_TO).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Iterates hits in order, truncating oversized hit text, and stops adding
/// chunks once the cumulative size would exceed the 200 KB budget (checked
/// before each hit is appended, so the budget is never exceeded by more than
/// one hit's worth).
pub fn format_chunks(response: &SearchResponse) -> String {
    if response.hits.is_empty() {
        return NO_HITS_MESSAGE.to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut cumulative = 0usize;

    for (i, hit) in response.hits.iter().enumerate() {
        let text = truncate_text(&hit.source.text);
        let chunk = format!(
            "Dokument {} (score: {:.2}):\nReferanse: {}\nSide: {}\nInnhold: {}\n---",
            i + 1,
            hit.score,
            hit.source.reference,
            hit.source.page,
            text
        );
        if cumulative + chunk.len() > TOTAL_BUDGET_BYTES {
            break;
        }
        cumulative += chunk.len();
        parts.push(chunk);
    }

    if parts.is_empty() {
        return NO_HITS_MESSAGE.to_string();
    }

    parts.join("\n\n")
}
