//! media-rag: ingestion and retrieval for mixed-media document collections
//!
//! Files (PDFs, videos, images) are turned into text by per-modality
//! normalizers, split into overlapping chunks with provenance metadata, and
//! indexed into a vector store. At query time the most similar chunks are
//! assembled into a numbered context block that feeds answer generation.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{Answer, PromptBuilder, QaService};
pub use ingestion::{IngestPipeline, LocalDirectorySource, TextChunker};
pub use providers::Providers;
pub use retrieval::{MetadataFilter, Retriever};
pub use types::{
    Chunk, FileOutcome, FileRecord, FileType, IngestReport, Metadata, NormalizedDocument,
    RetrievalMatch,
};
