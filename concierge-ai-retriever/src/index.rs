//! The vector index: build, persist, load, and search.
//!
//! The index is a flat list of embedded chunks searched by brute force.
//! The corpus is small, so an exact scan beats maintaining an ANN
//! structure and keeps the persist/reload round-trip bit-exact.
//!
//! Scoring: entries and queries are unit vectors (the provider normalizes
//! at generation time), so the dot product IS the cosine similarity. The
//! same provider embeds at build and query time, which keeps the metric
//! identical on both sides. Ties keep ascending insertion order.
//!
//! Persistence is a single `index.json` stamped with the format version,
//! model name, and dimension; `load` refuses anything that does not match
//! the provider it is asked to serve, and callers treat that as "absent,
//! rebuild".

use concierge_ai_embed::{EmbedError, EmbeddingProvider};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the serialized index inside the index directory.
pub const INDEX_FILE_NAME: &str = "index.json";

const INDEX_FORMAT_VERSION: u32 = 1;

/// A chunk of text plus its metadata, ready to be embedded and indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// One indexed entry: the embedding, the chunk text it came from, and the
/// chunk metadata. Entries are addressed by insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: HashMap<String, String>,
}

/// A search result: chunk text, metadata, and the cosine similarity score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub text: String,
    pub metadata: HashMap<String, String>,
    pub score: f32,
}

/// Errors from index persistence and search.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("no persisted index at {path}")]
    NotFound { path: PathBuf },

    #[error("persisted index at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("persisted index is incompatible: {reason}")]
    Incompatible { reason: String },

    #[error("query dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("failed to encode index: {source}")]
    Encode {
        #[from]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Embed(#[from] EmbedError),
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// An in-memory, searchable vector index.
///
/// A built index is immutable and always non-empty: building over an empty
/// corpus inserts one placeholder entry with empty text so search stays
/// well-defined.
#[derive(Debug)]
pub struct VectorIndex {
    model_name: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed `chunks` and build a searchable index.
    pub async fn build(
        chunks: &[ChunkRecord],
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self, IndexError> {
        let records: Vec<ChunkRecord> = if chunks.is_empty() {
            tracing::info!("corpus is empty, indexing a placeholder entry");
            vec![ChunkRecord {
                text: String::new(),
                metadata: HashMap::new(),
            }]
        } else {
            chunks.to_vec()
        };

        let texts: Vec<String> = records.iter().map(|record| record.text.clone()).collect();
        let result = provider.embed_texts(&texts).await?;
        if result.len() != records.len() {
            return Err(IndexError::Incompatible {
                reason: format!(
                    "provider returned {} embeddings for {} chunks",
                    result.len(),
                    records.len()
                ),
            });
        }

        let dimension = result.dimension;
        let entries = records
            .into_iter()
            .zip(result.embeddings)
            .map(|(record, embedding)| IndexEntry {
                embedding,
                text: record.text,
                metadata: record.metadata,
            })
            .collect();

        Ok(Self {
            model_name: provider.model_name().to_string(),
            dimension,
            entries,
        })
    }

    /// Load a persisted index from `dir`, verifying it matches `provider`.
    ///
    /// Any mismatch — missing file, parse failure, wrong format version,
    /// wrong model, wrong dimension — is returned as an error the caller
    /// treats as "absent": the index is rebuilt from the corpus.
    pub async fn load(
        dir: &Path,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Self, IndexError> {
        let path = dir.join(INDEX_FILE_NAME);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(IndexError::NotFound { path });
            }
            Err(error) => return Err(error.into()),
        };

        let persisted: PersistedIndex =
            serde_json::from_str(&raw).map_err(|source| IndexError::Corrupt {
                path: path.clone(),
                source,
            })?;

        if persisted.version != INDEX_FORMAT_VERSION {
            return Err(IndexError::Incompatible {
                reason: format!(
                    "format version {} (expected {INDEX_FORMAT_VERSION})",
                    persisted.version
                ),
            });
        }
        if persisted.model != provider.model_name() {
            return Err(IndexError::Incompatible {
                reason: format!(
                    "built with model {}, provider uses {}",
                    persisted.model,
                    provider.model_name()
                ),
            });
        }
        let dimension = provider.dimension().await?;
        if persisted.dimension != dimension {
            return Err(IndexError::Incompatible {
                reason: format!(
                    "dimension {} (provider produces {dimension})",
                    persisted.dimension
                ),
            });
        }
        if persisted.entries.is_empty() {
            return Err(IndexError::Incompatible {
                reason: "persisted index has no entries".to_string(),
            });
        }
        if persisted
            .entries
            .iter()
            .any(|entry| entry.embedding.len() != dimension)
        {
            return Err(IndexError::Incompatible {
                reason: "entry embedding length disagrees with the stamped dimension".to_string(),
            });
        }

        Ok(Self {
            model_name: persisted.model,
            dimension,
            entries: persisted.entries,
        })
    }

    /// Write the index to `dir/index.json`, overwriting any prior state.
    pub async fn persist(&self, dir: &Path) -> Result<(), IndexError> {
        tokio::fs::create_dir_all(dir).await?;

        let persisted = PersistedIndex {
            version: INDEX_FORMAT_VERSION,
            model: self.model_name.clone(),
            dimension: self.dimension,
            entries: self.entries.clone(),
        };
        let raw = serde_json::to_string_pretty(&persisted)?;
        tokio::fs::write(dir.join(INDEX_FILE_NAME), raw).await?;

        tracing::info!(
            entries = self.entries.len(),
            "persisted vector index to {}",
            dir.display()
        );
        Ok(())
    }

    /// Return up to `k` entries nearest to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (dot(query, &entry.embedding), entry))
            .collect();
        // Stable sort: equal scores keep ascending insertion order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, entry)| SearchHit {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubEmbedder;
    use tempfile::tempdir;

    fn record(text: &str, source: &str) -> ChunkRecord {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), source.to_string());
        ChunkRecord {
            text: text.to_string(),
            metadata,
        }
    }

    #[tokio::test]
    async fn build_and_search_rank_by_similarity() {
        let stub = StubEmbedder::new(4)
            .with_vector("Check-in ab 14:00 Uhr.", vec![1.0, 0.0, 0.0, 0.0])
            .with_vector("Parkplätze kosten 25 CHF.", vec![0.0, 1.0, 0.0, 0.0])
            .with_vector("WLAN ist kostenlos.", vec![0.6, 0.8, 0.0, 0.0]);

        let chunks = vec![
            record("Check-in ab 14:00 Uhr.", "a.txt"),
            record("Parkplätze kosten 25 CHF.", "b.txt"),
            record("WLAN ist kostenlos.", "c.txt"),
        ];
        let index = VectorIndex::build(&chunks, &stub).await.unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Check-in ab 14:00 Uhr.");
        assert_eq!(hits[1].text, "WLAN ist kostenlos.");
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].metadata.get("source").unwrap(), "a.txt");
    }

    #[tokio::test]
    async fn tied_scores_keep_insertion_order() {
        let stub = StubEmbedder::new(2)
            .with_vector("erster", vec![1.0, 0.0])
            .with_vector("zweiter", vec![1.0, 0.0]);

        let chunks = vec![record("erster", "a.txt"), record("zweiter", "a.txt")];
        let index = VectorIndex::build(&chunks, &stub).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].text, "erster");
        assert_eq!(hits[1].text, "zweiter");
    }

    #[tokio::test]
    async fn empty_corpus_builds_a_placeholder_index() {
        let stub = StubEmbedder::new(3);
        let index = VectorIndex::build(&[], &stub).await.unwrap();

        assert_eq!(index.len(), 1);
        let hits = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.is_empty());
    }

    #[tokio::test]
    async fn search_rejects_wrong_query_dimension() {
        let stub = StubEmbedder::new(3);
        let index = VectorIndex::build(&[record("text", "a.txt")], &stub)
            .await
            .unwrap();

        let error = index.search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            error,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn persist_and_load_round_trip_is_identical() {
        let dir = tempdir().unwrap();
        let stub = StubEmbedder::new(4)
            .with_vector("Check-in ab 14:00 Uhr.", vec![1.0, 0.0, 0.0, 0.0])
            .with_vector("Parkplätze kosten 25 CHF.", vec![0.0, 1.0, 0.0, 0.0]);

        let chunks = vec![
            record("Check-in ab 14:00 Uhr.", "a.txt"),
            record("Parkplätze kosten 25 CHF.", "b.txt"),
        ];
        let built = VectorIndex::build(&chunks, &stub).await.unwrap();
        built.persist(dir.path()).await.unwrap();

        let loaded = VectorIndex::load(dir.path(), &stub).await.unwrap();
        assert_eq!(loaded.len(), built.len());
        assert_eq!(loaded.model_name(), built.model_name());

        let query = [1.0, 0.0, 0.0, 0.0];
        let from_built = built.search(&query, 2).unwrap();
        let from_loaded = loaded.search(&query, 2).unwrap();
        for (a, b) in from_built.iter().zip(&from_loaded) {
            assert_eq!(a.text, b.text);
            assert!((a.score - b.score).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn load_refuses_a_missing_index() {
        let dir = tempdir().unwrap();
        let stub = StubEmbedder::new(2);

        let error = VectorIndex::load(dir.path(), &stub).await.unwrap_err();
        assert!(matches!(error, IndexError::NotFound { .. }));
    }

    #[tokio::test]
    async fn load_refuses_a_corrupt_index() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE_NAME), "{not json").unwrap();
        let stub = StubEmbedder::new(2);

        let error = VectorIndex::load(dir.path(), &stub).await.unwrap_err();
        assert!(matches!(error, IndexError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn load_refuses_a_different_model_or_dimension() {
        let dir = tempdir().unwrap();
        let stub = StubEmbedder::new(4).with_vector("text", vec![1.0, 0.0, 0.0, 0.0]);
        let built = VectorIndex::build(&[record("text", "a.txt")], &stub)
            .await
            .unwrap();
        built.persist(dir.path()).await.unwrap();

        let other_model = StubEmbedder::new(4).with_model_name("other-model");
        let error = VectorIndex::load(dir.path(), &other_model).await.unwrap_err();
        assert!(matches!(error, IndexError::Incompatible { .. }));

        let other_dimension = StubEmbedder::new(8);
        let error = VectorIndex::load(dir.path(), &other_dimension)
            .await
            .unwrap_err();
        assert!(matches!(error, IndexError::Incompatible { .. }));
    }
}
