//! Chunk-size management before the answer call, just before generation:
//! drop whole hit sections from the tail until the formatted chunks string
//! fits the budget, then hard-truncate as a backstop.

pub const STREAM_CHUNK_BUDGET: usize = 6 * 1024;
pub const NON_STREAM_CHUNK_BUDGET: usize = 15 * 1024;

/// `format_chunks` joins hit sections with `"\n\n"`; this reverses that join
/// one section at a time from the tail.
pub fn fit_chunks_to_budget(chunks: &str, budget_bytes: usize) -> String {
    if chunks.len() <= budget_bytes {
        return chunks.to_string();
    }

    let mut sections: Vec<&str> = chunks.split("\n\n").collect();
    while sections.len() > 1 {
        sections.pop();
        let candidate = sections.join("\n\n");
        if candidate.len() <= budget_bytes {
            return candidate;
        }
    }

    let truncated: String = chunks.chars().take(budget_bytes.saturating_sub(3)).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_chunks_within_budget_untouched() {
        let chunks = "Dokument 1:\nInnhold: kort\n---";
        assert_eq!(fit_chunks_to_budget(chunks, 1024), chunks);
    }

    #[test]
    fn drops_tail_sections_until_within_budget() {
        let section = "Dokument N:\nInnhold: ".to_string() + &"x".repeat(100) + "\n---";
        let chunks = vec![section.clone(); 10].join("\n\n");
        let budget = section.len() * 3 + 10;
        let fitted = fit_chunks_to_budget(&chunks, budget);
        assert!(fitted.len() <= budget);
        assert!(fitted.split("\n\n").count() < 10);
    }

    #[test]
    fn hard_truncates_single_oversized_section() {
        let chunks = "x".repeat(500);
        let fitted = fit_chunks_to_budget(&chunks, 100);
        assert!(fitted.len() <= 100);
        assert!(fitted.ends_with("..."));
    }
}
