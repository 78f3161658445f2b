//! Chat-side configuration.

use concierge_ai_retriever::config::DEFAULT_TOP_K;

/// Default completion endpoint (OpenAI-compatible).
pub const DEFAULT_BASE_URL: &str = "https://api.cerebras.ai/v1";

/// Default completion model.
pub const DEFAULT_MODEL_NAME: &str = "llama-3.1-8b";

/// Configuration for the answering side of the pipeline. Constructed by
/// the caller (configuration loading is an external concern); `from_env`
/// is the convenience constructor the CLI uses.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Completion model name.
    pub model_name: String,
    /// Bearer token for the completion endpoint.
    pub api_key: String,
    /// Completion endpoint base URL, without `/chat/completions`.
    pub base_url: String,
    /// Default number of chunks retrieved per question.
    pub top_k: usize,
}

impl ChatConfig {
    /// Read the configuration from the environment: `MODEL_NAME`,
    /// `API_KEY`, `API_BASE_URL`, `TOP_K`.
    pub fn from_env() -> Self {
        Self {
            model_name: env_or("MODEL_NAME", DEFAULT_MODEL_NAME),
            api_key: std::env::var("API_KEY").unwrap_or_default(),
            base_url: env_or("API_BASE_URL", DEFAULT_BASE_URL),
            top_k: std::env::var("TOP_K")
                .ok()
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_TOP_K),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}
