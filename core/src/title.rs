//! Conversation title fallback: a pure, I/O-free deterministic chain the
//! external ConversationStore calls when its own LLM-based title generation
//! fails, times out, or is skipped.
//!
//! Grounded on `examples/original_source/src/session_manager.py`'s
//! `extract_standards_improved`, `analyze_content_for_topic`, and
//! `create_descriptive_fallback`.

use crate::validator::extract_standards_from_text;

const MAX_TITLE_CHARS: usize = 45;

const TOPIC_BUCKETS: &[(&str, &[&str])] = &[
    ("brann", &["brann", "røykdetektør", "sprinkler", "evakuering", "flukt", "røykkontroll"]),
    ("bygg", &["bygg", "konstruksjon", "betong", "stål", "fundament", "byggetegning"]),
    ("elektrisk", &["elektrisk", "kabel", "installasjon", "el-anlegg", "strøm", "ledning"]),
    ("miljø", &["miljø", "utslipp", "avfall", "forurensning", "klima", "energi"]),
    ("kvalitet", &["kvalitet", "kontroll", "sertifisering", "testing", "godkjenning"]),
    ("ventilasjon", &["ventilasjon", "luft", "vifter", "kanaler"]),
    ("isolasjon", &["isolasjon", "isolering", "varme", "kulde"]),
    ("sikkerhet", &["sikkerhet", "vern", "beskyttelse", "risiko", "fare"]),
];

const STOP_WORDS: &[&str] = &[
    "hva", "hvor", "når", "hvordan", "kan", "du", "jeg", "er", "om", "den", "det", "og", "i",
    "på", "til", "for", "med", "av", "skal", "vil", "være", "har", "som", "en", "et", "de",
    "seg", "ikke",
];

fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{truncated}...")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Classifies a question into the best-matching topic bucket by keyword hit
/// count; ties favour whichever bucket is listed first.
fn classify_topic(question_lower: &str) -> Option<&'static str> {
    TOPIC_BUCKETS
        .iter()
        .map(|(topic, keywords)| {
            let score = keywords.iter().filter(|kw| question_lower.contains(*kw)).count();
            (*topic, score)
        })
        .filter(|(_, score)| *score > 0)
        .max_by_key(|(_, score)| *score)
        .map(|(topic, _)| topic)
}

/// Builds a title from the question's first content words (stop-words and
/// short tokens removed), title-cased and capped at [`MAX_TITLE_CHARS`].
fn content_words_title(question: &str) -> String {
    let words: Vec<&str> = question
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    if words.is_empty() {
        return "Ny samtale".to_string();
    }

    let title = words
        .iter()
        .take(4)
        .map(|w| title_case(w))
        .collect::<Vec<_>>()
        .join(" ");
    truncate_with_ellipsis(&title, MAX_TITLE_CHARS)
}

/// Deterministic conversation title fallback. Tries standard extraction,
/// then keyword topic classification, then first-content-words; the first
/// non-empty result wins. Never performs I/O and never blocks.
pub fn fallback_title(question: &str) -> String {
    let standards = extract_standards_from_text(question);
    if !standards.is_empty() {
        let heading = if standards.len() == 1 {
            standards[0].clone()
        } else {
            format!("{} og {}", standards[0], standards[1])
        };
        if let Some(topic) = classify_topic(&question.to_lowercase()) {
            if standards.len() == 1 {
                return truncate_with_ellipsis(&format!("{heading} - {topic}"), MAX_TITLE_CHARS);
            }
        }
        return truncate_with_ellipsis(&heading, MAX_TITLE_CHARS);
    }

    if let Some(topic) = classify_topic(&question.to_lowercase()) {
        return title_case(topic);
    }

    content_words_title(question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_standard_with_topic_combines_both() {
        let title = fallback_title("Hva krever NS-EN 1991-1-4 for brann og evakuering?");
        assert_eq!(title, "NS-EN 1991-1-4 - brann");
    }

    #[test]
    fn single_standard_without_topic_match_uses_standard_alone() {
        let title = fallback_title("hva betyr NS-EN 1991-1-4 i denne sammenhengen");
        assert_eq!(title, "NS-EN 1991-1-4");
    }

    #[test]
    fn topic_only_falls_back_to_topic_name() {
        let title = fallback_title("hvordan fungerer ventilasjon i kontorbygg");
        assert_eq!(title, "Ventilasjon");
    }

    #[test]
    fn no_standard_no_topic_uses_content_words() {
        let title = fallback_title("kan du forklare dette konseptet grundig");
        assert!(!title.is_empty());
        assert!(title.len() <= MAX_TITLE_CHARS);
    }

    #[test]
    fn empty_question_falls_back_to_placeholder() {
        assert_eq!(fallback_title(""), "Ny samtale");
    }

    #[test]
    fn title_never_exceeds_max_length() {
        let long_question = "kontorbyggets forskjellige konstruksjonsdetaljer og byggetekniske løsninger må dokumenteres grundig";
        let title = fallback_title(long_question);
        assert!(title.chars().count() <= MAX_TITLE_CHARS);
    }
}
