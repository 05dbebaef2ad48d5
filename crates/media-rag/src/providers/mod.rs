//! Provider abstractions for embeddings, LLM, vector storage, transcription and vision
//!
//! This module provides trait-based abstractions that allow switching between
//! OpenAI-compatible and local (Ollama) backends, and between an in-process
//! and a Pinecone vector store.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod openai;
pub mod pinecone;
pub mod retry;
pub mod transcription;
pub mod vector_store;
pub mod vision;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::MemoryVectorStore;
pub use pinecone::PineconeStore;
pub use transcription::Transcriber;
pub use vector_store::{VectorMatch, VectorRecord, VectorStoreProvider};
pub use vision::{ImageInput, VisionDescriber};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendProvider, RagConfig, VectorStoreKind};
use crate::error::Result;

use self::ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
use self::openai::{OpenAiClient, OpenAiEmbedder, OpenAiLlm, OpenAiTranscriber, OpenAiVision};

/// Every external collaborator the pipeline talks to
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    /// Absent when no OpenAI key is configured; videos then fail to normalize
    pub transcriber: Option<Arc<dyn Transcriber>>,
    /// Absent when no OpenAI key is configured; images then fail to normalize
    pub vision: Option<Arc<dyn VisionDescriber>>,
}

impl Providers {
    /// Build providers from configuration
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing providers (backend: {:?}, vector store: {:?})",
            config.backend,
            config.vector_db.kind
        );

        let vector_store: Arc<dyn VectorStoreProvider> = match config.vector_db.kind {
            VectorStoreKind::Memory => Arc::new(MemoryVectorStore::new()),
            VectorStoreKind::Pinecone => Arc::new(PineconeStore::from_config(&config.vector_db)?),
        };

        let openai = match OpenAiClient::new(
            &config.openai,
            Duration::from_secs(config.llm.timeout_secs),
            config.llm.max_retries,
        ) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) if config.backend == BackendProvider::Ollama => {
                tracing::warn!("OpenAI client unavailable, video and image files will fail: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let (embedder, llm): (Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>) =
            match (&config.backend, &openai) {
                (BackendProvider::OpenAi, Some(client)) => (
                    Arc::new(OpenAiEmbedder::new(
                        client.clone(),
                        config.embeddings.model.clone(),
                        config.embeddings.dimensions,
                    )),
                    Arc::new(OpenAiLlm::new(client.clone(), &config.llm)),
                ),
                _ => {
                    let client = Arc::new(OllamaClient::new(&config.ollama, &config.llm)?);
                    (
                        Arc::new(OllamaEmbedder::new(
                            client.clone(),
                            config.embeddings.model.clone(),
                            config.embeddings.dimensions,
                        )),
                        Arc::new(OllamaLlm::new(client, &config.llm)),
                    )
                }
            };

        let (transcriber, vision) = match &openai {
            Some(client) => {
                // Transcription of long videos needs its own timeout
                let transcription_client = Arc::new(OpenAiClient::new(
                    &config.openai,
                    Duration::from_secs(config.transcription.timeout_secs),
                    config.llm.max_retries,
                )?);
                (
                    Some(Arc::new(OpenAiTranscriber::new(
                        transcription_client,
                        &config.transcription,
                    )) as Arc<dyn Transcriber>),
                    Some(Arc::new(OpenAiVision::new(client.clone(), &config.vision))
                        as Arc<dyn VisionDescriber>),
                )
            }
            None => (None, None),
        };

        tracing::info!(
            "Providers ready: embeddings={} ({}), llm={}, vector store={}",
            embedder.name(),
            embedder.model(),
            llm.name(),
            vector_store.name()
        );

        Ok(Self {
            embedder,
            llm,
            vector_store,
            transcriber,
            vision,
        })
    }
}
