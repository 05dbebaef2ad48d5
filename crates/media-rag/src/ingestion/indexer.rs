//! Batched embedding and upsert of chunks into a vector index

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::retry::{backoff_delay, retry_with_delay};
use crate::providers::{EmbeddingProvider, VectorRecord, VectorStoreProvider};
use crate::types::{keys, BatchFailure, Chunk, IndexReport};

/// Split `items` into consecutive batches of at most `batch_size`, with each batch's offset
pub fn partition<T>(items: &[T], batch_size: usize) -> Vec<(usize, &[T])> {
    let size = batch_size.max(1);
    items
        .chunks(size)
        .enumerate()
        .map(|(i, batch)| (i * size, batch))
        .collect()
}

/// Deterministic record ids for `chunks`
///
/// The id hashes the chunk's source (file path and page), its ordinal among
/// chunks of that source, and its text. Re-indexing the same chunk list
/// therefore overwrites instead of duplicating.
pub fn assign_ids(chunks: &[Chunk]) -> Vec<String> {
    let mut ordinals: HashMap<String, usize> = HashMap::new();
    chunks
        .iter()
        .map(|chunk| {
            let source = chunk.source_key();
            let ordinal = ordinals.entry(source.clone()).or_insert(0);
            let mut hasher = Sha256::new();
            hasher.update(source.as_bytes());
            hasher.update([0u8]);
            hasher.update(ordinal.to_le_bytes());
            hasher.update([0u8]);
            hasher.update(chunk.text.as_bytes());
            *ordinal += 1;
            hex::encode(hasher.finalize())
        })
        .collect()
}

/// Embeds chunks batch by batch and upserts them
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    batch_size: usize,
    max_batch_retries: u32,
    retry_delay: fn(u32) -> Duration,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        batch_size: usize,
        max_batch_retries: u32,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be positive".to_string()));
        }
        Ok(Self {
            embedder,
            store,
            batch_size,
            max_batch_retries,
            retry_delay: backoff_delay,
        })
    }

    /// Replace the backoff schedule between batch retries
    pub fn with_retry_delay(mut self, delay: fn(u32) -> Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Index every chunk; failed batches are reported and skipped
    ///
    /// Batches are written in order. Committed batches stay committed when a
    /// later one fails.
    pub async fn index(&self, chunks: &[Chunk], index_name: &str) -> IndexReport {
        let ids = assign_ids(chunks);
        let batches = partition(chunks, self.batch_size);
        let mut report = IndexReport {
            batches_total: batches.len(),
            ..IndexReport::default()
        };

        tracing::info!(
            "Indexing {} chunks into '{}' in {} batches of up to {}",
            chunks.len(),
            index_name,
            batches.len(),
            self.batch_size
        );

        for (batch_index, (start, batch)) in batches.into_iter().enumerate() {
            let batch_ids = &ids[start..start + batch.len()];
            let result = self
                .upsert_batch(batch, batch_ids, batch_index, index_name, self.max_batch_retries)
                .await;

            match result {
                Ok(count) => {
                    report.batches_committed += 1;
                    report.chunks_indexed += count;
                    tracing::debug!("Committed batch {} ({} chunks)", batch_index, count);
                }
                Err(e) => {
                    tracing::error!(
                        "Batch {} (chunks {}..{}) failed: {}",
                        batch_index,
                        start,
                        start + batch.len(),
                        e
                    );
                    report.failures.push(BatchFailure {
                        batch_index,
                        start,
                        chunk_count: batch.len(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Indexed {}/{} chunks ({}/{} batches)",
            report.chunks_indexed,
            chunks.len(),
            report.batches_committed,
            report.batches_total
        );
        report
    }

    /// Re-run one recorded failed batch of `chunks`, without retries
    ///
    /// `chunks` must be the same list the failure was recorded against, so
    /// the batch gets the same record ids.
    pub async fn index_batch(
        &self,
        chunks: &[Chunk],
        failure: &BatchFailure,
        index_name: &str,
    ) -> Result<usize> {
        let end = failure.start + failure.chunk_count;
        if end > chunks.len() {
            return Err(Error::Index {
                batch_index: failure.batch_index,
                chunk_count: failure.chunk_count,
                message: format!(
                    "batch range {}..{} exceeds {} chunks",
                    failure.start,
                    end,
                    chunks.len()
                ),
            });
        }
        let ids = assign_ids(chunks);
        self.upsert_batch(
            &chunks[failure.start..end],
            &ids[failure.start..end],
            failure.batch_index,
            index_name,
            0,
        )
        .await
    }

    /// Embed one batch once, then upsert it with up to `retries` retries
    ///
    /// Embedding is not retried here: providers retry their own transient
    /// failures. Upserts are retried only for transient store errors.
    async fn upsert_batch(
        &self,
        batch: &[Chunk],
        ids: &[String],
        batch_index: usize,
        index_name: &str,
        retries: u32,
    ) -> Result<usize> {
        let as_index_error = |e: Error| Error::Index {
            batch_index,
            chunk_count: batch.len(),
            message: e.to_string(),
        };

        let records = self
            .embed_records(batch, ids)
            .await
            .map_err(&as_index_error)?;

        let label = format!("Upsert batch {}", batch_index);
        retry_with_delay(&label, retries, self.retry_delay, || {
            self.store.upsert(index_name, &records)
        })
        .await
        .map_err(&as_index_error)?;
        Ok(records.len())
    }

    async fn embed_records(&self, batch: &[Chunk], ids: &[String]) -> Result<Vec<VectorRecord>> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(Error::embedding(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            )));
        }

        let model = self.embedder.model();
        Ok(batch
            .iter()
            .zip(ids)
            .zip(vectors)
            .map(|((chunk, id), values)| VectorRecord {
                id: id.clone(),
                values,
                metadata: chunk
                    .metadata
                    .clone()
                    .with(keys::TEXT, chunk.text.as_str())
                    .with(keys::EMBEDDING_MODEL, model),
            })
            .collect())
    }
}
