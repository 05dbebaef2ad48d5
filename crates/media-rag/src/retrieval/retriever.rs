//! Query-time retrieval and context assembly

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{keys, RetrievalMatch};

use super::filter::MetadataFilter;

/// Header that opens every formatted context
pub const CONTEXT_HEADER: &str = "Context:\n\n";

/// Embeds queries and fetches the most similar chunks from one index
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    index_name: String,
}

impl Retriever {
    /// The embedder must be the one used when the index was built
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Top `top_k` matches for `query`, in the order the store returns them
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<RetrievalMatch>> {
        let vector = self.embedder.embed(query).await?;
        let matches = self
            .store
            .query(&self.index_name, &vector, top_k, filter)
            .await?;

        tracing::debug!(
            "Query against '{}' returned {} matches (top_k = {})",
            self.index_name,
            matches.len(),
            top_k
        );

        let query_model = self.embedder.model();
        matches
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                if let Some(indexed) = m.metadata.get_str(keys::EMBEDDING_MODEL) {
                    if indexed != query_model {
                        return Err(Error::EmbeddingModelMismatch {
                            indexed: indexed.to_string(),
                            query: query_model.to_string(),
                        });
                    }
                }
                Ok(RetrievalMatch {
                    rank: i + 1,
                    metadata: m.metadata,
                    score: m.score,
                })
            })
            .collect()
    }

    /// Search and format the matches as a single context string
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<String> {
        let matches = self.search(query, top_k, filter).await?;
        format_context(&matches)
    }
}

/// Render matches as numbered context blocks
///
/// ```text
/// Context:
///
/// <INFO NUMBER 1>
/// first chunk
///
///
/// <INFO NUMBER 2>
/// second chunk
/// ```
pub fn format_context(matches: &[RetrievalMatch]) -> Result<String> {
    let blocks = matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let text = m.text().ok_or_else(|| {
                Error::retrieval(format!("Match at rank {} has no '{}' metadata", i + 1, keys::TEXT))
            })?;
            Ok(format!("<INFO NUMBER {}>\n{}\n", i + 1, text))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!("{}{}", CONTEXT_HEADER, blocks.join("\n\n")))
}
