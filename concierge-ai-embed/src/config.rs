//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};

/// Default embedding model, matching the pipeline's indexing default.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Configuration for an embedding provider.
///
/// The model name is the configuration surface consumers see (the
/// `EMBEDDING_MODEL` option); it is resolved to a concrete FastEmbed model
/// when the provider first loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedConfig {
    model_name: String,
}

impl EmbedConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }

    /// Read the configuration from the environment (`EMBEDDING_MODEL`),
    /// falling back to the default model.
    pub fn from_env() -> Self {
        match std::env::var("EMBEDDING_MODEL") {
            Ok(name) if !name.trim().is_empty() => Self::new(name.trim()),
            _ => Self::default(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Resolve the configured name to a FastEmbed model. Both the bare
    /// model name and the HuggingFace-style `org/name` form are accepted.
    pub(crate) fn resolve(&self) -> Result<EmbeddingModel> {
        match self.model_name.as_str() {
            "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
                Ok(EmbeddingModel::AllMiniLML6V2)
            }
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "intfloat/multilingual-e5-small" | "multilingual-e5-small" => {
                Ok(EmbeddingModel::MultilingualE5Small)
            }
            other => Err(EmbedError::invalid_config(format!(
                "unknown embedding model: {other}"
            ))),
        }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_resolves() {
        let config = EmbedConfig::default();
        assert_eq!(config.model_name(), DEFAULT_EMBEDDING_MODEL);
        assert!(config.resolve().is_ok());
    }

    #[test]
    fn short_and_qualified_names_resolve_to_the_same_model() {
        let qualified = EmbedConfig::new("sentence-transformers/all-MiniLM-L6-v2");
        let short = EmbedConfig::new("all-MiniLM-L6-v2");
        assert_eq!(
            format!("{:?}", qualified.resolve().unwrap()),
            format!("{:?}", short.resolve().unwrap())
        );
    }

    #[test]
    fn unknown_model_is_rejected() {
        let config = EmbedConfig::new("definitely-not-a-model");
        let err = config.resolve().unwrap_err();
        assert!(matches!(err, EmbedError::InvalidConfig { .. }));
    }
}
