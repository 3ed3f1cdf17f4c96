use std::path::PathBuf;
use std::time::Duration;

use chat_store::DEFAULT_MAX_HISTORY;
use ollama_api::url::DEFAULT_CHAT_BASE_URL;

/// Runtime configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the chat service.
    pub base_url: String,
    /// Directory holding the history and draft files.
    pub storage_dir: PathBuf,
    /// Bound on retained history turns.
    pub max_history: usize,
    /// Optional transport timeout.
    pub request_timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            storage_dir: default_storage_dir(),
            max_history: DEFAULT_MAX_HISTORY,
            request_timeout: None,
        }
    }
}

impl AppConfig {
    /// Reads configuration from `OLLAMA_CHAT_*` environment variables,
    /// falling back to defaults for unset or unparseable values.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("OLLAMA_CHAT_BASE_URL") {
            if !value.trim().is_empty() {
                config.base_url = value;
            }
        }
        if let Ok(value) = std::env::var("OLLAMA_CHAT_STORAGE_DIR") {
            if !value.trim().is_empty() {
                config.storage_dir = PathBuf::from(value);
            }
        }
        if let Ok(value) = std::env::var("OLLAMA_CHAT_MAX_HISTORY") {
            if let Ok(parsed) = value.trim().parse::<usize>() {
                config.max_history = parsed;
            }
        }
        if let Ok(value) = std::env::var("OLLAMA_CHAT_TIMEOUT_SECS") {
            if let Ok(parsed) = value.trim().parse::<u64>() {
                if parsed > 0 {
                    config.request_timeout = Some(Duration::from_secs(parsed));
                }
            }
        }

        config
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ollama_chat")
}
