//! # concierge-ai-embed
//!
//! Text embedding for the concierge retrieval pipeline, backed by local
//! ONNX models via FastEmbed. The crate exposes a small async
//! [`EmbeddingProvider`] trait so callers (and tests) can swap the model
//! for a deterministic stub, plus the production [`FastEmbedProvider`].
//!
//! Model loading is expensive, so it happens lazily on first use and
//! exactly once per process: concurrent first-callers are serialized, and
//! loaded models are shared through a process-wide cache keyed by model
//! name. Embeddings are L2-normalized `f32` vectors, which makes cosine
//! similarity a plain dot product downstream.
//!
//! ```no_run
//! use concierge_ai_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> concierge_ai_embed::Result<()> {
//! let provider = FastEmbedProvider::new(EmbedConfig::default());
//! let result = provider.embed_texts(&["Check-in ab 14:00 Uhr.".to_string()]).await?;
//! assert_eq!(result.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod provider;

pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
