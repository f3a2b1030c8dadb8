//! Named prompt templates, rendered with `last_utterance`, `chunks`, and
//! `conversation_memory`.
//!
//! Grounded on `loom/src/prompts/load.rs`'s embed-at-compile-time +
//! directory-override idiom, generalised from "one YAML file per agent" to
//! "one plain-text template per namespace" (the six names and substitution
//! variables come from
//! `examples/original_source/src/prompt_manager.py`'s six `execute_*`
//! templates).

mod load;

pub use load::{load_or_default, LoadError};

use std::collections::HashMap;

/// The six named templates. Unknown names outside this set are a fatal
/// configuration error at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateName {
    OptimizeSemantic,
    Analysis,
    ExtractStandard,
    OptimizeTextual,
    Answer,
    ExtractFromMemory,
}

impl TemplateName {
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateName::OptimizeSemantic => "optimizeSemantic.txt",
            TemplateName::Analysis => "analysis.txt",
            TemplateName::ExtractStandard => "extractStandard.txt",
            TemplateName::OptimizeTextual => "optimizeTextual.txt",
            TemplateName::Answer => "answer.txt",
            TemplateName::ExtractFromMemory => "extractFromMemory.txt",
        }
    }

    pub const ALL: [TemplateName; 6] = [
        TemplateName::OptimizeSemantic,
        TemplateName::Analysis,
        TemplateName::ExtractStandard,
        TemplateName::OptimizeTextual,
        TemplateName::Answer,
        TemplateName::ExtractFromMemory,
    ];
}

/// Holds the six rendered-on-demand templates.
#[derive(Clone, Debug, Default)]
pub struct PromptStore {
    templates: HashMap<&'static str, String>,
}

impl PromptStore {
    pub fn new(templates: HashMap<&'static str, String>) -> Self {
        Self { templates }
    }

    /// Substitutes `{last_utterance}`, `{chunks}`, `{conversation_memory}`
    /// in the named template. An unknown template name is a fatal
    /// configuration error, surfaced eagerly at startup via
    /// [`load_or_default`] rather than here.
    pub fn render(&self, name: TemplateName, vars: &HashMap<&str, &str>) -> String {
        let template = self
            .templates
            .get(name.file_name())
            .cloned()
            .unwrap_or_default();
        let mut rendered = template;
        for (key, value) in vars {
            rendered = rendered.replace(&format!("{{{key}}}"), value);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_variables() {
        let mut templates = HashMap::new();
        templates.insert("answer.txt", "Q: {last_utterance}\nM: {conversation_memory}\nC: {chunks}".to_string());
        let store = PromptStore::new(templates);
        let mut vars = HashMap::new();
        vars.insert("last_utterance", "hva er NS-EN 1991?");
        vars.insert("conversation_memory", "0");
        vars.insert("chunks", "Dokument 1...");
        let rendered = store.render(TemplateName::Answer, &vars);
        assert_eq!(rendered, "Q: hva er NS-EN 1991?\nM: 0\nC: Dokument 1...");
    }

    #[test]
    fn missing_template_renders_empty() {
        let store = PromptStore::default();
        let rendered = store.render(TemplateName::Analysis, &HashMap::new());
        assert_eq!(rendered, "");
    }
}
