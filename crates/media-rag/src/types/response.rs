//! Retrieval results

use serde::{Deserialize, Serialize};

use super::metadata::{keys, Metadata};

/// A ranked match returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    /// 1-based position in the result list
    pub rank: usize,
    /// Stored metadata, including the chunk `text`
    pub metadata: Metadata,
    /// Similarity score as reported by the store
    pub score: f32,
}

impl RetrievalMatch {
    /// The chunk text stored with the vector
    pub fn text(&self) -> Option<&str> {
        self.metadata.get_str(keys::TEXT)
    }
}
