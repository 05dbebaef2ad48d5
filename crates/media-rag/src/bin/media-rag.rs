//! media-rag command line
//!
//! Run with: cargo run -p media-rag --features cli -- ingest docs/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_rag::config::VectorStoreKind;
use media_rag::ingestion::{FileSource, PathListSource};
use media_rag::{
    IngestPipeline, LocalDirectorySource, MetadataFilter, Providers, QaService, RagConfig,
    Retriever,
};

#[derive(Parser, Debug)]
#[command(
    name = "media-rag",
    version,
    about = "Index PDFs, videos and images into a vector store and query them"
)]
struct Cli {
    /// Configuration file (defaults to the user config dir, then built-in defaults)
    #[arg(long, short, global = true, env = "MEDIA_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a directory (or explicit files) into the index
    Ingest {
        /// Directory to walk; defaults to `ingestion.docs_root`
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Explicit files to ingest instead of walking a directory
        files: Vec<PathBuf>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the retrieval context for a query
    Context {
        query: String,

        /// Number of chunks to retrieve
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        /// Metadata filter as JSON, e.g. '{"file_type": "pdf"}'
        #[arg(long)]
        filter: Option<String>,
    },
    /// Answer a question from the indexed documents
    Ask {
        question: String,

        /// Print the retrieved context before the answer
        #[arg(long, default_value_t = false)]
        show_context: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Index: {}", config.vector_db.index_name);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let providers = Providers::from_config(&config).context("failed to initialize providers")?;

    match cli.command {
        Command::Ingest { dir, files, json } => {
            let pipeline = IngestPipeline::from_config(&config, &providers)?;
            let source: Box<dyn FileSource> = if files.is_empty() {
                Box::new(LocalDirectorySource::new(
                    dir.unwrap_or_else(|| config.ingestion.docs_root.clone()),
                ))
            } else {
                Box::new(PathListSource::new(files))
            };

            let report = pipeline.run(source.as_ref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Command::Context {
            query,
            top_k,
            filter,
        } => {
            warn_if_ephemeral(&config);
            let filter = match filter {
                Some(raw) => MetadataFilter::from_json(
                    serde_json::from_str(&raw).context("--filter is not valid JSON")?,
                )?,
                None => MetadataFilter::new(),
            };
            let retriever = retriever(&config, &providers);
            println!("{}", retriever.retrieve(&query, top_k, &filter).await?);
        }
        Command::Ask {
            question,
            show_context,
        } => {
            warn_if_ephemeral(&config);
            let qa = QaService::new(
                Arc::new(retriever(&config, &providers)),
                providers.llm.clone(),
                config.llm.top_k,
            );
            let answer = qa.ask(&question).await?;
            if show_context {
                println!("--- Retrieved Context ---\n{}\n", answer.context);
            }
            println!("{}", answer.text);
        }
    }

    Ok(())
}

fn retriever(config: &RagConfig, providers: &Providers) -> Retriever {
    Retriever::new(
        providers.embedder.clone(),
        providers.vector_store.clone(),
        &config.vector_db.index_name,
    )
}

fn warn_if_ephemeral(config: &RagConfig) {
    if config.vector_db.kind == VectorStoreKind::Memory {
        tracing::warn!("vector_db.kind = memory: the index is empty in a fresh process");
    }
}
