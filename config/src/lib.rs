//! Process configuration: environment variables, optionally staged through a
//! `.env` file, validated eagerly with a single aggregated error naming every
//! missing required key.
//!
//! Values already present in the process environment win; otherwise a
//! `.env` file in the working directory (or an override directory) is
//! loaded via the `dotenv` crate, which only fills in keys that are not
//! already set. A missing `.env` file is a no-op — only the three keys
//! below are fatal.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

/// Required at startup; absence of any is a fatal, aggregated error.
const FATAL_KEYS: [&str; 3] = ["ELASTICSEARCH_API_KEY", "OPENAI_API_KEY", "EMBEDDING_API_ENDPOINT"];

const OPENAI_MAX_TOKENS_PREFIX: &str = "OPENAI_MAX_TOKENS_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {0}")]
    MissingRequired(String),
}

/// Recognised options, loaded once at process start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub elasticsearch_url: Option<String>,
    pub elasticsearch_index: Option<String>,
    pub elasticsearch_api_key: String,

    pub embedding_api_endpoint: String,
    pub embedding_api_key: Option<String>,
    pub embedding_keepalive_enabled: bool,
    pub embedding_keepalive_interval_minutes: u64,

    pub openai_api_key: String,
    pub openai_model: Option<String>,
    pub openai_model_default: Option<String>,
    pub openai_model_answer: Option<String>,
    pub openai_max_tokens_overrides: HashMap<String, u32>,
    pub openai_temperature: Option<f32>,

    pub max_question_length: Option<usize>,
    pub min_question_length: Option<usize>,
    pub response_timeout: Option<u64>,
    pub max_search_results: Option<usize>,
    pub cache_timeout: Option<u64>,

    pub ratelimit_default: Option<String>,
    pub ratelimit_storage_url: Option<String>,
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

impl AppConfig {
    /// Builds config from the process environment, first applying a `.env`
    /// file (current directory, or `override_dir`) for any key not already
    /// set. Fails with [`ConfigError::MissingRequired`] naming every absent
    /// fatal key at once, not just the first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_dir(None)
    }

    pub fn from_env_with_dir(override_dir: Option<&Path>) -> Result<Self, ConfigError> {
        apply_dotenv(override_dir);

        let missing: Vec<&str> = FATAL_KEYS
            .iter()
            .copied()
            .filter(|key| std::env::var(key).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing.join(", ")));
        }

        Ok(Self {
            elasticsearch_url: env_var("ELASTICSEARCH_URL"),
            elasticsearch_index: env_var("ELASTICSEARCH_INDEX"),
            elasticsearch_api_key: env_var("ELASTICSEARCH_API_KEY").expect("checked above"),

            embedding_api_endpoint: env_var("EMBEDDING_API_ENDPOINT").expect("checked above"),
            embedding_api_key: env_var("EMBEDDING_API_KEY"),
            embedding_keepalive_enabled: env_var("EMBEDDING_KEEPALIVE_ENABLED")
                .map(|v| parse_bool(&v, true))
                .unwrap_or(true),
            embedding_keepalive_interval_minutes: env_var("EMBEDDING_KEEPALIVE_INTERVAL_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            openai_api_key: env_var("OPENAI_API_KEY").expect("checked above"),
            openai_model: env_var("OPENAI_MODEL"),
            openai_model_default: env_var("OPENAI_MODEL_DEFAULT"),
            openai_model_answer: env_var("OPENAI_MODEL_ANSWER"),
            openai_max_tokens_overrides: openai_max_tokens_overrides(),
            openai_temperature: env_var("OPENAI_TEMPERATURE").and_then(|v| v.parse().ok()),

            max_question_length: env_var("MAX_QUESTION_LENGTH").and_then(|v| v.parse().ok()),
            min_question_length: env_var("MIN_QUESTION_LENGTH").and_then(|v| v.parse().ok()),
            response_timeout: env_var("RESPONSE_TIMEOUT").and_then(|v| v.parse().ok()),
            max_search_results: env_var("MAX_SEARCH_RESULTS").and_then(|v| v.parse().ok()),
            cache_timeout: env_var("CACHE_TIMEOUT").and_then(|v| v.parse().ok()),

            ratelimit_default: env_var("RATELIMIT_DEFAULT"),
            ratelimit_storage_url: env_var("RATELIMIT_STORAGE_URL"),
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Collects `OPENAI_MAX_TOKENS_<NAMESPACE>` overrides, keyed by the
/// lower-cased namespace suffix (e.g. `OPENAI_MAX_TOKENS_ANSWER` ->
/// `"answer"`), for namespaces whose default in `Namespace::config` should
/// be overridden.
fn openai_max_tokens_overrides() -> HashMap<String, u32> {
    std::env::vars()
        .filter_map(|(key, value)| {
            let suffix = key.strip_prefix(OPENAI_MAX_TOKENS_PREFIX)?;
            let parsed: u32 = value.parse().ok()?;
            Some((suffix.to_lowercase(), parsed))
        })
        .collect()
}

/// Applies `.env` values to the process environment for keys not already
/// set, via `dotenv::from_path`, which skips any key already present.
/// Never fails: a missing or unreadable `.env` file is a no-op.
fn apply_dotenv(override_dir: Option<&Path>) {
    let Some(dir) = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
    else {
        return;
    };
    let _ = dotenv::from_path(dir.join(".env"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_fatal_keys() {
        for key in FATAL_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn missing_all_fatal_keys_reports_every_name() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_fatal_keys();
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_env_with_dir(Some(dir.path())).unwrap_err();
        let ConfigError::MissingRequired(names) = err;
        for key in FATAL_KEYS {
            assert!(names.contains(key), "expected {names} to mention {key}");
        }
    }

    #[test]
    fn present_fatal_keys_via_dotenv_succeed() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_fatal_keys();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "ELASTICSEARCH_API_KEY=es-key\nOPENAI_API_KEY=oai-key\nEMBEDDING_API_ENDPOINT=http://localhost:9999\n",
        )
        .unwrap();
        let config = AppConfig::from_env_with_dir(Some(dir.path())).unwrap();
        assert_eq!(config.elasticsearch_api_key, "es-key");
        assert_eq!(config.openai_api_key, "oai-key");
        assert_eq!(config.embedding_api_endpoint, "http://localhost:9999");
        clear_fatal_keys();
    }

    #[test]
    fn existing_process_env_wins_over_dotenv() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_fatal_keys();
        std::env::set_var("OPENAI_API_KEY", "from-process-env");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "ELASTICSEARCH_API_KEY=es-key\nOPENAI_API_KEY=from-dotenv\nEMBEDDING_API_ENDPOINT=http://localhost:9999\n",
        )
        .unwrap();
        let config = AppConfig::from_env_with_dir(Some(dir.path())).unwrap();
        assert_eq!(config.openai_api_key, "from-process-env");
        clear_fatal_keys();
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn max_tokens_overrides_are_collected_by_namespace_suffix() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_fatal_keys();
        std::env::set_var("OPENAI_MAX_TOKENS_ANSWER", "2000");
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "ELASTICSEARCH_API_KEY=es-key\nOPENAI_API_KEY=oai-key\nEMBEDDING_API_ENDPOINT=http://localhost:9999\n",
        )
        .unwrap();
        let config = AppConfig::from_env_with_dir(Some(dir.path())).unwrap();
        assert_eq!(config.openai_max_tokens_overrides.get("answer"), Some(&2000));
        clear_fatal_keys();
        std::env::remove_var("OPENAI_MAX_TOKENS_ANSWER");
    }
}
