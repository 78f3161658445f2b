//! Deterministic embedding stub for index and service tests.

use async_trait::async_trait;
use concierge_ai_embed::{EmbeddingProvider, EmbeddingResult, Result};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

/// An [`EmbeddingProvider`] that never touches a model: known texts map to
/// fixed vectors, everything else gets a deterministic hash-derived unit
/// vector. Counts how many texts it has embedded so tests can assert the
/// fast path and load-idempotency properties.
pub(crate) struct StubEmbedder {
    dimension: usize,
    model_name: String,
    vectors: HashMap<String, Vec<f32>>,
    embedded_texts: AtomicUsize,
}

impl StubEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: "stub-model".to_string(),
            vectors: HashMap::new(),
            embedded_texts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_model_name(mut self, model_name: &str) -> Self {
        self.model_name = model_name.to_string();
        self
    }

    pub(crate) fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimension);
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Total number of texts embedded through this stub.
    pub(crate) fn embedded_texts(&self) -> usize {
        self.embedded_texts.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.vectors.get(text) {
            return vector.clone();
        }

        // Unit vector derived from the text hash: deterministic, and
        // distinct texts almost surely get distinct directions.
        let mut vector = Vec::with_capacity(self.dimension);
        for position in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            (text, position).hash(&mut hasher);
            vector.push((hasher.finish() % 1000) as f32 / 1000.0 - 0.5);
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        self.embedded_texts.fetch_add(texts.len(), Ordering::SeqCst);
        let embeddings = texts.iter().map(|text| self.vector_for(text)).collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    async fn dimension(&self) -> Result<usize> {
        Ok(self.dimension)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}
