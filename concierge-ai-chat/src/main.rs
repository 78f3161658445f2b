use anyhow::Result;
use clap::{Parser, Subcommand};
use concierge_ai_chat::{AnswerGenerator, ChatConfig, CompletionClient};
use concierge_ai_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
use concierge_ai_retriever::{RetrievalService, RetrieverConfig};
use std::sync::Arc;

/// Hotel concierge assistant over a local document corpus.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        question: String,
        /// Number of context chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Rebuild the vector index from the corpus directory
    Index,
    /// List the indexed entries and corpus source files
    Sources,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let retriever_config = RetrieverConfig::from_env();
    let chat_config = ChatConfig::from_env();
    let embed_config = EmbedConfig::from_env();

    let provider =
        Arc::new(FastEmbedProvider::new(embed_config.clone())) as Arc<dyn EmbeddingProvider>;
    let service = Arc::new(RetrievalService::new(retriever_config.clone(), provider));

    match args.command {
        Commands::Ask { question, top_k } => {
            let client = CompletionClient::new(
                &chat_config.base_url,
                &chat_config.api_key,
                &chat_config.model_name,
            )?;
            let generator = AnswerGenerator::new(
                service,
                client,
                top_k.unwrap_or(chat_config.top_k),
            );
            let answer = generator.answer(&question).await?;
            println!("{answer}");
        }
        Commands::Index => {
            let index = service.rebuild().await?;
            println!(
                "Indexed {} entries into {}",
                index.len(),
                retriever_config.index_dir.display()
            );
        }
        Commands::Sources => {
            let listing = service.list_sources().await?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Commands::Config => {
            println!("MODEL_NAME: {}", chat_config.model_name);
            println!("API_BASE_URL: {}", chat_config.base_url);
            println!("API key present: {}", !chat_config.api_key.is_empty());
            println!("EMBEDDING_MODEL: {}", embed_config.model_name());
            println!("CORPUS_DIR: {}", retriever_config.corpus_dir.display());
            println!("INDEX_DIR: {}", retriever_config.index_dir.display());
            println!("CHUNK_SIZE: {}", retriever_config.chunk_size);
            println!("CHUNK_OVERLAP: {}", retriever_config.chunk_overlap);
            println!("TOP_K: {}", chat_config.top_k);
        }
    }

    Ok(())
}
