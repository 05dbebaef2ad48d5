//! Error types for the ingestion and retrieval pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File could not be reached or stat'ed
    #[error("Failed to acquire '{path}': {message}")]
    Acquisition { path: String, message: String },

    /// File content could not be turned into text
    #[error("Failed to normalize '{filename}': {message}")]
    Normalization { filename: String, message: String },

    /// Chunker invariant violated
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector database error
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// A single upsert batch failed
    #[error("Index batch {batch_index} ({chunk_count} chunks) failed: {message}")]
    Index {
        batch_index: usize,
        chunk_count: usize,
        message: String,
    },

    /// Retrieval produced an unusable context
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Index and query embeddings come from different models
    #[error("Embedding model mismatch: index has '{indexed}', query uses '{query}'")]
    EmbeddingModelMismatch { indexed: String, query: String },

    /// Audio track could not be extracted from a video
    #[error("Audio extraction failed for '{filename}': {message}")]
    AudioExtraction { filename: String, message: String },

    /// Speech-to-text error
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Vision description error
    #[error("Vision description failed: {0}")]
    Vision(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered with a non-success status
    #[error("{context} failed: HTTP {status} - {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an acquisition error
    pub fn acquisition(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Acquisition {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a normalization error
    pub fn normalization(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Normalization {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an audio extraction error
    pub fn audio_extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AudioExtraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create a retrieval error
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an error for a non-success HTTP status
    pub fn status(context: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            context: context.into(),
            status,
            body: body.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether a retry of the same request can reasonably succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_carries_batch_context() {
        let err = Error::Index {
            batch_index: 3,
            chunk_count: 100,
            message: "upsert rejected".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("batch 3"));
        assert!(msg.contains("100 chunks"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::status("Pinecone upsert", 503, "unavailable").is_transient());
        assert!(Error::status("Embeddings request", 429, "rate limited").is_transient());
        assert!(!Error::status("Embeddings request", 400, "bad input").is_transient());
        assert!(!Error::status("Embeddings request", 401, "invalid key").is_transient());
        assert!(!Error::vector_db("dimension mismatch").is_transient());
        assert!(!Error::retrieval("missing text").is_transient());
        assert!(!Error::normalization("a.pdf", "corrupt").is_transient());
    }
}
