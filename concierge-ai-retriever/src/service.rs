//! The retrieval service: lazy build-or-load orchestration and top-k query
//! answering.
//!
//! A [`RetrievalService`] is constructed once at process start with its
//! configuration and an injected [`EmbeddingProvider`], then shared by
//! handle. The vector index is built lazily on first use: try the
//! persisted copy, otherwise ingest the corpus, chunk, embed, build, and
//! persist. Once ready the index is shared read-only behind an `Arc`; a
//! rebuild installs a freshly built index atomically and never exposes a
//! partially built structure.
//!
//! This module owns the pipeline's only retry policy: a failed index
//! access gets one retry after a short fixed delay, with a forced
//! build-or-load in between; the second failure propagates.

use crate::config::RetrieverConfig;
use crate::index::{ChunkRecord, IndexError, SearchHit, VectorIndex};
use crate::ingest;
use anyhow::{Context, Result};
use concierge_ai_context::TextSplitter;
use concierge_ai_embed::EmbeddingProvider;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Fixed delay before the single retry after an index-access failure.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// A retrieved chunk: text plus its source metadata, most relevant first.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// Diagnostic view of the index and corpus, for the `sources` command.
#[derive(Debug, Clone, Serialize)]
pub struct SourceListing {
    /// Number of entries in the ready index.
    pub indexed_entries: usize,
    /// Sorted, deduplicated file names currently in the corpus directory.
    pub sources: Vec<String>,
}

/// Orchestrates loader → splitter → embedder → index.
pub struct RetrievalService {
    config: RetrieverConfig,
    provider: Arc<dyn EmbeddingProvider>,
    index: RwLock<Option<Arc<VectorIndex>>>,
    build_guard: Mutex<()>,
}

impl RetrievalService {
    pub fn new(config: RetrieverConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            config,
            provider,
            index: RwLock::new(None),
            build_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve the `k` chunks most relevant to `query`.
    ///
    /// An empty query (after trimming) short-circuits to an empty result
    /// without touching the embedding provider or the index. Placeholder
    /// entries (empty text, inserted for an empty corpus) are filtered
    /// out, so an empty corpus yields an empty result rather than a blank
    /// context.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .provider
            .embed_text(query)
            .await
            .context("failed to embed query")?;

        let hits = match self.search_index(&embedding, k, false).await {
            Ok(hits) => hits,
            Err(error) => {
                tracing::warn!("index access failed, rebuilding and retrying once: {error:#}");
                tokio::time::sleep(RETRY_DELAY).await;
                self.search_index(&embedding, k, true)
                    .await
                    .context("index access failed after rebuild")?
            }
        };

        tracing::debug!(hits = hits.len(), "retrieval for query of {k} results");
        Ok(hits
            .into_iter()
            .filter(|hit| !hit.text.trim().is_empty())
            .map(|hit| RetrievedChunk {
                text: hit.text,
                metadata: hit.metadata,
            })
            .collect())
    }

    async fn search_index(&self, embedding: &[f32], k: usize, force: bool) -> Result<Vec<SearchHit>> {
        let index = self.ensure_index(force).await?;
        Ok(index.search(embedding, k)?)
    }

    /// Get the ready index, building it on first use.
    ///
    /// With `force` set the persisted copy is ignored and the index is
    /// rebuilt from the corpus. Concurrent first-callers are serialized by
    /// the build guard, so the index is built and persisted at most once;
    /// the double-check after acquiring the guard makes the flow
    /// idempotent.
    pub async fn ensure_index(&self, force: bool) -> Result<Arc<VectorIndex>> {
        if !force {
            if let Some(index) = self.index.read().await.as_ref() {
                return Ok(Arc::clone(index));
            }
        }

        let _guard = self.build_guard.lock().await;
        if !force {
            if let Some(index) = self.index.read().await.as_ref() {
                return Ok(Arc::clone(index));
            }
        }

        let index = Arc::new(self.load_or_build(force).await?);
        *self.index.write().await = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Force a fresh corpus build, replacing any persisted state.
    pub async fn rebuild(&self) -> Result<Arc<VectorIndex>> {
        self.ensure_index(true).await
    }

    async fn load_or_build(&self, force: bool) -> Result<VectorIndex> {
        if !force {
            match VectorIndex::load(&self.config.index_dir, self.provider.as_ref()).await {
                Ok(index) => {
                    tracing::info!(entries = index.len(), "loaded persisted vector index");
                    return Ok(index);
                }
                Err(IndexError::NotFound { .. }) => {
                    tracing::info!("no persisted index, building from corpus");
                }
                Err(error) => {
                    tracing::warn!("persisted index unusable ({error}), rebuilding from corpus");
                }
            }
        }

        let index = self.build_from_corpus().await?;
        index
            .persist(&self.config.index_dir)
            .await
            .context("failed to persist vector index")?;
        Ok(index)
    }

    async fn build_from_corpus(&self) -> Result<VectorIndex> {
        let report = ingest::load_directory(&self.config.corpus_dir);

        let splitter = TextSplitter::new(self.config.chunk_size, self.config.chunk_overlap);
        let mut records = Vec::new();
        for document in &report.documents {
            let source = document.source().unwrap_or_default().to_string();
            for chunk in splitter.split(&source, &document.content) {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk".to_string(), chunk.sequence.to_string());
                records.push(ChunkRecord {
                    text: chunk.text,
                    metadata,
                });
            }
        }

        tracing::info!(
            documents = report.documents.len(),
            chunks = records.len(),
            "building vector index"
        );
        let index = VectorIndex::build(&records, self.provider.as_ref())
            .await
            .context("failed to build vector index")?;
        Ok(index)
    }

    /// Diagnostic listing of the ready index size and the corpus sources.
    pub async fn list_sources(&self) -> Result<SourceListing> {
        let index = self.ensure_index(false).await?;
        let report = ingest::load_directory(&self.config.corpus_dir);

        let sources: BTreeSet<String> = report
            .documents
            .iter()
            .filter_map(|document| document.source())
            .map(|source| {
                Path::new(source)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| source.to_string())
            })
            .collect();

        Ok(SourceListing {
            indexed_entries: index.len(),
            sources: sources.into_iter().collect(),
        })
    }
}
