//! concierge-ai-chat: grounded answer generation over the retrieval
//! pipeline.
//!
//! This crate is the answering half of the concierge assistant: it formats
//! retrieved chunks into a bounded context, builds a grounded prompt (or a
//! general-knowledge fallback when retrieval comes back empty), and calls
//! an OpenAI-compatible chat-completion endpoint.
//!
//! ## Key Modules
//!
//! - **[`context`]**: pure formatting of retrieved chunks into prompt
//!   context
//! - **[`client`]**: the completion-endpoint HTTP client
//! - **[`generator`]**: [`AnswerGenerator`], the `answer(query)` entry
//!   point consumed by UIs and scripts

pub mod client;
pub mod config;
pub mod context;
pub mod generator;

pub use client::{CompletionClient, CompletionError};
pub use config::ChatConfig;
pub use context::format_context;
pub use generator::AnswerGenerator;
