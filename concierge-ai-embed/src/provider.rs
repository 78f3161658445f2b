//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::OnceCell;

/// How many texts are embedded per blocking batch.
const EMBED_BATCH_SIZE: usize = 16;

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a result from a set of embeddings; the dimension is inferred
    /// from the first vector (0 when empty).
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// A loaded model plus the dimension it produces.
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Process-wide cache of initialized embedding models, keyed by model name,
/// so repeated provider construction never reloads ONNX weights.
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

fn model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// All vectors produced by one provider have the same dimension, are
/// L2-normalized, and are deterministic for identical input within one
/// process. `dimension` is async because it may trigger lazy model
/// initialization.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts (batch processing).
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Generate an embedding for a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    /// Dimension of the vectors this provider produces.
    async fn dimension(&self) -> Result<usize>;

    /// Name of the underlying embedding model.
    fn model_name(&self) -> &str;

    /// Name/identifier of this provider implementation.
    fn provider_name(&self) -> &str;
}

/// FastEmbed-based embedding provider using local ONNX models.
///
/// Construction is cheap; the model loads lazily on the first embedding
/// call. The per-instance [`OnceCell`] serializes concurrent first-callers
/// and the global [`MODEL_CACHE`] shares loaded models across instances.
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: OnceCell<ModelCacheEntry>,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("initialized", &self.model.initialized())
            .finish()
    }
}

impl FastEmbedProvider {
    /// Create an uninitialized provider; the model loads on first use.
    pub fn new(config: EmbedConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    async fn ensure_model(&self) -> Result<&ModelCacheEntry> {
        self.model
            .get_or_try_init(|| async {
                let name = self.config.model_name().to_string();

                let cached = {
                    let cache = model_cache().lock().unwrap();
                    cache.get(&name).cloned()
                };
                if let Some(entry) = cached {
                    tracing::debug!("Reusing cached embedding model: {name}");
                    return Ok(entry);
                }

                let model_id = self.config.resolve()?;
                let (model, dimension) =
                    tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                        tracing::info!("Loading embedding model: {name}");

                        let init_options =
                            InitOptions::new(model_id).with_show_download_progress(false);
                        let mut model = TextEmbedding::try_new(init_options)
                            .map_err(|e| EmbedError::External { source: e })?;

                        // Probe once to discover the dimension.
                        let probe = model
                            .embed(vec!["dimension probe".to_string()], None)
                            .map_err(|e| EmbedError::External { source: e })?;
                        let dimension = probe.first().map(|e| e.len()).ok_or_else(|| {
                            EmbedError::invalid_config("model produced no probe embedding")
                        })?;

                        tracing::info!("Embedding model loaded, dimension {dimension}");
                        Ok((model, dimension))
                    })
                    .await??;

                let entry = (Arc::new(Mutex::new(model)), dimension);
                model_cache()
                    .lock()
                    .unwrap()
                    .insert(self.config.model_name().to_string(), entry.clone());
                Ok(entry)
            })
            .await
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let (model, _) = self.ensure_model().await?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let batch = batch.to_vec();
            let model = Arc::clone(model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model.lock().unwrap();
                guard
                    .embed(batch, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            all_embeddings.extend(batch_embeddings.into_iter().map(normalize));
        }

        Ok(EmbeddingResult::new(all_embeddings))
    }

    async fn dimension(&self) -> Result<usize> {
        let (_, dimension) = self.ensure_model().await?;
        Ok(*dimension)
    }

    fn model_name(&self) -> &str {
        self.config.model_name()
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

/// Scale a vector to unit length so cosine similarity reduces to a dot
/// product. Zero vectors are returned unchanged.
fn normalize(mut embedding: Vec<f32>) -> Vec<f32> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut embedding {
            *value /= norm;
        }
    }
    embedding
}
