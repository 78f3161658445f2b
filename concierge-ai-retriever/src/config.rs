//! Retrieval pipeline configuration.

use std::path::PathBuf;

pub const DEFAULT_CHUNK_SIZE: usize = 700;
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;
pub const DEFAULT_TOP_K: usize = 4;

/// Configuration for corpus location, chunking, and retrieval depth.
///
/// Constructed by the caller and injected into [`RetrievalService`]
/// (configuration loading itself lives outside the pipeline); `from_env`
/// is the convenience constructor the CLI uses.
///
/// [`RetrievalService`]: crate::service::RetrievalService
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Directory scanned for corpus documents.
    pub corpus_dir: PathBuf,
    /// Directory holding the persisted vector index.
    pub index_dir: PathBuf,
    /// Maximum packed bytes per chunk.
    pub chunk_size: usize,
    /// Bytes of the previous chunk repeated at the start of the next one.
    pub chunk_overlap: usize,
    /// Default number of nearest neighbors returned per query.
    pub top_k: usize,
}

impl RetrieverConfig {
    pub fn new(corpus_dir: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            index_dir: index_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Read the configuration from the environment: `CORPUS_DIR`,
    /// `INDEX_DIR`, `CHUNK_SIZE`, `CHUNK_OVERLAP`, `TOP_K`. Unset or
    /// unparsable values fall back to the defaults; an overlap that is not
    /// smaller than the chunk size is clamped so the splitter invariant
    /// holds.
    pub fn from_env() -> Self {
        let corpus_dir = std::env::var("CORPUS_DIR").unwrap_or_else(|_| "data".to_string());
        let index_dir = std::env::var("INDEX_DIR").unwrap_or_else(|_| "index".to_string());

        let mut config = Self::new(corpus_dir, index_dir);
        config.chunk_size = env_usize("CHUNK_SIZE", DEFAULT_CHUNK_SIZE).max(1);
        config.chunk_overlap = env_usize("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP);
        config.top_k = env_usize("TOP_K", DEFAULT_TOP_K);

        if config.chunk_overlap >= config.chunk_size {
            let clamped = config.chunk_size - 1;
            tracing::warn!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({}), clamping to {clamped}",
                config.chunk_overlap,
                config.chunk_size
            );
            config.chunk_overlap = clamped;
        }

        config
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_pipeline_contract() {
        let config = RetrieverConfig::new("data", "index");
        assert_eq!(config.chunk_size, 700);
        assert_eq!(config.chunk_overlap, 120);
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn builders_override_defaults() {
        let config = RetrieverConfig::new("data", "index")
            .with_chunking(300, 30)
            .with_top_k(2);
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.chunk_overlap, 30);
        assert_eq!(config.top_k, 2);
    }
}
