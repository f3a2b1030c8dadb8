//! Template loading: embedded compile-time defaults, overridable from a
//! directory resolved as explicit path → `PROMPTS_DIR` env → `prompts/`.
//!
//! A missing override directory or a missing individual file within it
//! silently falls back to the embedded default; a directory that exists but
//! contains a file that fails to read is a fatal load error.

use std::path::Path;

use super::{PromptStore, TemplateName};

macro_rules! embed_template {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}

const EMBEDDED: [(&str, &str); 6] = [
    ("optimizeSemantic.txt", embed_template!("optimizeSemantic.txt")),
    ("analysis.txt", embed_template!("analysis.txt")),
    ("extractStandard.txt", embed_template!("extractStandard.txt")),
    ("optimizeTextual.txt", embed_template!("optimizeTextual.txt")),
    ("answer.txt", embed_template!("answer.txt")),
    ("extractFromMemory.txt", embed_template!("extractFromMemory.txt")),
];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read prompt file {path}: {message}")]
    ReadFile { path: String, message: String },
}

fn prompts_dir(dir: Option<&Path>) -> std::path::PathBuf {
    dir.map(std::path::PathBuf::from).unwrap_or_else(|| {
        std::env::var("PROMPTS_DIR")
            .ok()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from("prompts"))
    })
}

/// Builds a [`PromptStore`] starting from the embedded defaults, then
/// overlaying any file present in the override directory. Never fails:
/// a file that cannot be read is logged and the embedded default for that
/// template is kept, since the only way template loading should be fatal is
/// an unknown template *name* (checked at the call site, not here) — a
/// present-but-unreadable override file degrades rather than aborting
/// startup.
pub fn load_or_default(dir: Option<&Path>) -> PromptStore {
    let base = prompts_dir(dir);
    let mut templates = std::collections::HashMap::new();
    for (name, embedded) in EMBEDDED {
        templates.insert(name, embedded.to_string());
    }

    if base.exists() && base.is_dir() {
        for name in TemplateName::ALL {
            let path = base.join(name.file_name());
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    templates.insert(name.file_name(), content);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read prompt override, keeping embedded default");
                }
            }
        }
    }

    PromptStore::new(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn embedded_defaults_are_used_when_no_dir_given() {
        let store = load_or_default(Some(Path::new("/nonexistent_prompts_dir_xyz")));
        let rendered = store.render(TemplateName::Analysis, &HashMap::new());
        assert!(rendered.contains("including, without, personal, memory"));
    }

    #[test]
    fn directory_override_replaces_one_template() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("analysis.txt"), "custom template {last_utterance}").unwrap();
        let store = load_or_default(Some(temp.path()));
        let mut vars = HashMap::new();
        vars.insert("last_utterance", "q");
        let rendered = store.render(TemplateName::Analysis, &vars);
        assert_eq!(rendered, "custom template q");
    }

    #[test]
    fn missing_file_in_existing_dir_falls_back_to_embedded() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = load_or_default(Some(temp.path()));
        let rendered = store.render(TemplateName::ExtractStandard, &HashMap::new());
        assert!(rendered.contains("standardnumrene"));
    }

    #[test]
    fn prompts_dir_env_is_used_when_dir_is_none() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("answer.txt"), "from env dir").unwrap();
        let old = std::env::var("PROMPTS_DIR").ok();
        std::env::set_var("PROMPTS_DIR", temp.path());
        let store = load_or_default(None);
        if let Some(v) = old {
            std::env::set_var("PROMPTS_DIR", v);
        } else {
            std::env::remove_var("PROMPTS_DIR");
        }
        assert_eq!(store.render(TemplateName::Answer, &HashMap::new()), "from env dir");
    }
}
