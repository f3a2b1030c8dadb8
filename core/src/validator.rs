//! Question sanitisation and standard-number recognition.
//!
//! Grounded on `InputValidator` in the upstream `flow_manager.py`: the
//! dangerous-pattern check runs against the lower-cased raw text BEFORE
//! whitespace is normalised, and the final character-class check runs last.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const MIN_QUESTION_LENGTH: usize = 3;
pub const MAX_QUESTION_LENGTH: usize = 1000;
const MAX_STANDARD_NUMBER_LENGTH: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Spørsmål kan ikke være tomt")]
    Empty,
    #[error("Spørsmål må være minst {MIN_QUESTION_LENGTH} tegn langt")]
    TooShort,
    #[error("Spørsmål kan ikke være mer enn {MAX_QUESTION_LENGTH} tegn langt")]
    TooLong,
    #[error("Spørsmålet inneholder ikke-tillatt innhold")]
    DangerousPattern,
    #[error("Spørsmålet inneholder ikke-tillatte tegn")]
    InvalidCharacters,
}

static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"<script[^>]*>.*?</script>",
        r"javascript:",
        r"vbscript:",
        r"on\w+\s*=",
        r"eval\s*\(",
        r"exec\s*\(",
        r"__\w+__",
        r"\.\./",
        r"<[^>]+>",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?is){p}")).expect("static pattern"))
    .collect()
});

// 1-4 alphabetic prefix groups (1-5 letters each), separated by space/hyphen/slash,
// followed by an alphanumeric/hyphen body, optional :year or +variant suffix.
static STANDARD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{1,5}(?:[\s/\-][A-Z]{1,5}){0,3}\s+[0-9A-Z\-]{1,20}(?:[:+][0-9A-Z\-]{1,20})?$")
        .expect("static pattern")
});

static STANDARD_NUMBER_SCAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Z]{1,5}(?:[\s/\-][A-Z]{1,5}){0,3}\s+[0-9A-Z\-]{1,20}(?:[:+][0-9A-Z\-]{1,20})?")
        .expect("static pattern")
});

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_forbidden_chars(s: &str) -> bool {
    s.chars().any(|c| {
        let is_control = c.is_control();
        let is_angle_bracket = c == '<' || c == '>';
        is_control || is_angle_bracket
    })
}

/// Sanitises a raw question. Returns the normalised text on success.
pub fn validate_question(raw: &str) -> Result<String, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }
    if raw.chars().count() < MIN_QUESTION_LENGTH {
        return Err(ValidationError::TooShort);
    }
    if raw.chars().count() > MAX_QUESTION_LENGTH {
        return Err(ValidationError::TooLong);
    }

    let lowered = raw.to_lowercase();
    if DANGEROUS_PATTERNS.iter().any(|re| re.is_match(&lowered)) {
        return Err(ValidationError::DangerousPattern);
    }

    let normalized = normalize_whitespace(raw);

    if normalized.chars().count() < MIN_QUESTION_LENGTH {
        return Err(ValidationError::TooShort);
    }
    if has_forbidden_chars(&normalized) {
        return Err(ValidationError::InvalidCharacters);
    }

    Ok(normalized)
}

/// Upper-cases, filters by the StandardNumber regex, deduplicates while
/// preserving first-seen order.
pub fn validate_standard_numbers(candidates: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for candidate in candidates {
        let upper = candidate.trim().to_uppercase();
        if upper.len() > MAX_STANDARD_NUMBER_LENGTH {
            continue;
        }
        if !STANDARD_NUMBER_RE.is_match(&upper) {
            continue;
        }
        if seen.insert(upper.clone()) {
            out.push(upper);
        }
    }
    out
}

/// Scans free text for standard-number-shaped substrings, deduplicated in
/// order of first appearance.
pub fn extract_standards_from_text(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for m in STANDARD_NUMBER_SCAN_RE.find_iter(text) {
        let upper = m.as_str().to_uppercase();
        if upper.len() > MAX_STANDARD_NUMBER_LENGTH {
            continue;
        }
        if seen.insert(upper.clone()) {
            out.push(upper);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_good_standard_numbers() {
        for s in [
            "NS-EN 13141-8:2006",
            "EN 1991-1-4",
            "ISO/IEC 27001:2013",
            "NS 11001-1",
            "EN ISO 1461",
        ] {
            let result = validate_standard_numbers(&[s.to_string()]);
            assert_eq!(result, vec![s.to_uppercase()], "expected {s} to be accepted");
        }
    }

    #[test]
    fn rejects_known_bad_standard_numbers() {
        for s in ["banana", "<script>", "NS", "12345"] {
            let result = validate_standard_numbers(&[s.to_string()]);
            assert!(result.is_empty(), "expected {s} to be rejected");
        }
    }

    #[test]
    fn validation_is_idempotent() {
        let raw = "  Hva   sier\tNS-EN 1991-1-4 om vindlast?  ";
        let once = validate_question(raw).unwrap();
        let twice = validate_question(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_too_short() {
        assert_eq!(validate_question("no"), Err(ValidationError::TooShort));
    }

    #[test]
    fn rejects_dangerous_script_tag() {
        assert_eq!(
            validate_question("<script>alert(1)</script>"),
            Err(ValidationError::DangerousPattern)
        );
    }

    #[test]
    fn rejects_angle_brackets_surviving_to_char_class_check() {
        assert_eq!(
            validate_question("hva <b>er</b> dette da"),
            Err(ValidationError::DangerousPattern)
        );
    }

    #[test]
    fn collapses_internal_whitespace_runs() {
        let out = validate_question("hva   er\t\tNS-EN 1991\n?").unwrap();
        assert_eq!(out, "hva er NS-EN 1991 ?");
    }

    #[test]
    fn extract_from_text_dedups_preserving_order() {
        let text = "Se NS-EN 1991-1-4 og igjen NS-EN 1991-1-4, samt EN 1993-1-1.";
        let out = extract_standards_from_text(text);
        assert_eq!(out, vec!["NS-EN 1991-1-4", "EN 1993-1-1"]);
    }
}
