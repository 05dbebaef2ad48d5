//! In-process vector store with cosine similarity

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::retrieval::MetadataFilter;

use super::vector_store::{VectorMatch, VectorRecord, VectorStoreProvider};

#[derive(Default)]
struct Namespace {
    records: Vec<VectorRecord>,
    positions: HashMap<String, usize>,
    dimensions: Option<usize>,
}

/// Vector store kept in memory, keyed by index name
///
/// Useful for single-process runs and tests; contents are lost on drop.
#[derive(Default)]
pub struct MemoryVectorStore {
    indexes: DashMap<String, Namespace>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in `index`, in first-insertion order
    pub fn records(&self, index: &str) -> Vec<VectorRecord> {
        self.indexes
            .get(index)
            .map(|ns| ns.records.clone())
            .unwrap_or_default()
    }
}

/// Cosine similarity; zero vectors score 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<()> {
        let mut ns = self.indexes.entry(index.to_string()).or_default();

        // Validate the whole batch before touching the namespace
        let expected = ns
            .dimensions
            .or_else(|| records.first().map(|r| r.values.len()));
        if let Some(expected) = expected {
            if let Some(bad) = records.iter().find(|r| r.values.len() != expected) {
                return Err(Error::vector_db(format!(
                    "Record {} has {} dimensions, index '{}' expects {}",
                    bad.id,
                    bad.values.len(),
                    index,
                    expected
                )));
            }
        }
        ns.dimensions = expected;

        for record in records {
            match ns.positions.get(&record.id).copied() {
                Some(pos) => ns.records[pos] = record.clone(),
                None => {
                    let pos = ns.records.len();
                    ns.positions.insert(record.id.clone(), pos);
                    ns.records.push(record.clone());
                }
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>> {
        let Some(ns) = self.indexes.get(index) else {
            return Ok(Vec::new());
        };
        if let Some(expected) = ns.dimensions {
            if vector.len() != expected {
                return Err(Error::vector_db(format!(
                    "Query has {} dimensions, index '{}' expects {}",
                    vector.len(),
                    index,
                    expected
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = ns
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(&r.metadata))
            .map(|(i, r)| (i, cosine_similarity(vector, &r.values)))
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(i, score)| {
                let record = &ns.records[i];
                VectorMatch {
                    id: record.id.clone(),
                    score,
                    metadata: record.metadata.clone(),
                }
            })
            .collect())
    }

    async fn len(&self, index: &str) -> Result<usize> {
        Ok(self.indexes.get(index).map_or(0, |ns| ns.records.len()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
