//! Grounded and fallback answer generation.

use crate::client::CompletionClient;
use crate::context::format_context;
use anyhow::Result;
use concierge_ai_retriever::RetrievalService;
use std::sync::Arc;

/// Fixed reply for an empty question; returned without any retrieval or
/// network call.
pub const EMPTY_QUERY_REPLY: &str = "Bitte stelle eine Frage.";

/// Concierge persona sent as the system message on every request.
pub const SYSTEM_PROMPT: &str = "Du bist ein präziser, freundlicher Hotel-Concierge in Basel. \
    Antworte knapp, sachlich und hilfreich. Nutze den gegebenen Kontext für Fakten. \
    Wenn dir im Kontext etwas fehlt, antworte trotzdem so gut wie möglich \
    und kennzeichne allgemeine Hinweise mit allgemein.";

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 700;

/// The caller-facing entry point: retrieve context for a question and ask
/// the completion endpoint for an answer.
///
/// Retrieval decides the prompt: a non-empty result produces a grounded
/// prompt restricted to the retrieved context, an empty one falls back to
/// general knowledge with general statements flagged. Completion-endpoint
/// errors are not retried here; they propagate unmodified.
pub struct AnswerGenerator {
    service: Arc<RetrievalService>,
    client: CompletionClient,
    top_k: usize,
}

impl AnswerGenerator {
    pub fn new(service: Arc<RetrievalService>, client: CompletionClient, top_k: usize) -> Self {
        Self {
            service,
            client,
            top_k,
        }
    }

    /// Answer `query` using the configured retrieval depth.
    pub async fn answer(&self, query: &str) -> Result<String> {
        self.answer_with_k(query, self.top_k).await
    }

    /// Answer `query`, retrieving up to `k` chunks of context.
    pub async fn answer_with_k(&self, query: &str, k: usize) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(EMPTY_QUERY_REPLY.to_string());
        }

        let chunks = self.service.retrieve(query, k).await?;
        let prompt = if chunks.is_empty() {
            tracing::debug!("no relevant context, answering from general knowledge");
            fallback_prompt(query)
        } else {
            tracing::debug!(chunks = chunks.len(), "answering from retrieved context");
            grounded_prompt(query, &format_context(&chunks))
        };

        let answer = self
            .client
            .chat(SYSTEM_PROMPT, &prompt, TEMPERATURE, MAX_TOKENS)
            .await?;
        Ok(answer)
    }
}

/// Prompt for a question with retrieved context: the model must answer from
/// the context alone, in German.
pub(crate) fn grounded_prompt(query: &str, context: &str) -> String {
    format!(
        "Frage:\n{query}\n\nKontext:\n{context}\n\nHinweise:\n\
         - Antworte auf Deutsch.\n\
         - Antworte nur basierend auf dem Kontext."
    )
}

/// Prompt for a question without local sources: answer briefly from general
/// knowledge and flag general statements.
pub(crate) fn fallback_prompt(query: &str) -> String {
    format!(
        "Frage (ohne lokale Quellen):\n{query}\n\n\
         Antworte kurz auf Deutsch. Markiere allgemeine Hinweise mit allgemein."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_ai_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
    use concierge_ai_retriever::RetrieverConfig;
    use tempfile::tempdir;

    fn generator_over_temp_dirs() -> AnswerGenerator {
        let dir = tempdir().unwrap();
        // The provider is lazy: as long as nothing is embedded, no model
        // loads and no network is touched.
        let provider = Arc::new(FastEmbedProvider::new(EmbedConfig::default()));
        let service = Arc::new(RetrievalService::new(
            RetrieverConfig::new(dir.path().join("data"), dir.path().join("index")),
            provider as Arc<dyn EmbeddingProvider>,
        ));
        let client =
            CompletionClient::new("http://127.0.0.1:1/v1", "test-key", "test-model").unwrap();
        AnswerGenerator::new(service, client, 4)
    }

    #[tokio::test]
    async fn empty_query_returns_the_fixed_reply_without_any_calls() {
        let generator = generator_over_temp_dirs();

        assert_eq!(generator.answer("").await.unwrap(), EMPTY_QUERY_REPLY);
        assert_eq!(generator.answer("   \n ").await.unwrap(), EMPTY_QUERY_REPLY);
    }

    #[test]
    fn grounded_prompt_carries_question_and_context() {
        let prompt = grounded_prompt("Ab wann ist Check-in?", "Check-in ab 14:00 Uhr.");

        assert!(prompt.contains("Frage:\nAb wann ist Check-in?"));
        assert!(prompt.contains("Kontext:\nCheck-in ab 14:00 Uhr."));
        assert!(prompt.contains("nur basierend auf dem Kontext"));
    }

    #[test]
    fn fallback_prompt_flags_general_knowledge() {
        let prompt = fallback_prompt("Gibt es Parkplätze?");

        assert!(prompt.contains("ohne lokale Quellen"));
        assert!(prompt.contains("Gibt es Parkplätze?"));
        assert!(prompt.contains("allgemein"));
    }

    #[test]
    fn system_prompt_keeps_the_concierge_persona() {
        assert!(SYSTEM_PROMPT.contains("Hotel-Concierge"));
        assert!(SYSTEM_PROMPT.contains("allgemein"));
    }
}
