//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::retrieval::MetadataFilter;
use crate::types::Metadata;

/// A vector with its payload, as upserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Store key; upserting an existing id replaces the record
    pub id: String,
    /// Embedding
    pub values: Vec<f32>,
    /// Chunk metadata including `text`
    pub metadata: Metadata,
}

/// Match returned by a similarity query
#[derive(Debug, Clone)]
pub struct VectorMatch {
    /// Record id
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    /// Stored metadata
    pub metadata: Metadata,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `MemoryVectorStore`: in-process cosine search
/// - `PineconeStore`: Pinecone data-plane API
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert or replace records in `index`
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<()>;

    /// Return up to `top_k` matches ordered by descending similarity
    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>>;

    /// Number of records stored in `index`
    async fn len(&self, index: &str) -> Result<usize>;

    /// Check if `index` is empty
    async fn is_empty(&self, index: &str) -> Result<bool> {
        Ok(self.len(index).await? == 0)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
