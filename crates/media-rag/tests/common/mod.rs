//! Fake providers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use media_rag::error::{Error, Result};
use media_rag::ingestion::{
    Indexer, IngestPipeline, MetadataBuilder, Normalizer, Normalizers, TextChunker,
};
use media_rag::providers::{
    EmbeddingProvider, MemoryVectorStore, VectorMatch, VectorRecord, VectorStoreProvider,
};
use media_rag::retrieval::MetadataFilter;
use media_rag::types::{keys, ContentType, FileRecord, Metadata, NormalizedDocument};

pub const DIMENSIONS: usize = 32;
pub const INDEX: &str = "test-index";

/// Bag-of-words embedder: identical texts embed identically
pub struct HashEmbedder {
    model: String,
    pub batches: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            batches: AtomicUsize::new(0),
        }
    }
}

fn bucket(word: &str) -> usize {
    word.bytes()
        .fold(2166136261u32, |h, b| (h ^ u32::from(b)).wrapping_mul(16777619)) as usize
        % DIMENSIONS
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIMENSIONS];
        for word in text.split_whitespace() {
            v[bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(v)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Embedder whose every call is rejected by the remote API
#[derive(Default)]
pub struct RejectingEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for RejectingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::status("Embeddings request", 401, "invalid api key"))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::status("Embeddings request", 401, "invalid api key"))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model(&self) -> &str {
        "rejecting"
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

/// Never finishes normalizing
pub struct StalledNormalizer;

#[async_trait]
impl Normalizer for StalledNormalizer {
    async fn normalize(
        &self,
        _record: &FileRecord,
        _metadata: &Metadata,
    ) -> Result<Vec<NormalizedDocument>> {
        std::future::pending::<Result<Vec<NormalizedDocument>>>().await
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

/// Reads the file as UTF-8 text and reports it as page 1
pub struct PlainTextNormalizer;

#[async_trait]
impl Normalizer for PlainTextNormalizer {
    async fn normalize(
        &self,
        record: &FileRecord,
        metadata: &Metadata,
    ) -> Result<Vec<NormalizedDocument>> {
        let text = tokio::fs::read_to_string(&record.path)
            .await
            .map_err(|e| Error::normalization(&record.filename, e.to_string()))?;
        Ok(vec![NormalizedDocument::new(
            text,
            metadata
                .clone()
                .with(keys::PAGE, 1u32)
                .with(keys::CONTENT_TYPE, ContentType::Document.as_str()),
        )])
    }

    fn name(&self) -> &str {
        "plain-text"
    }
}

/// Always fails with the given error
pub struct FailingNormalizer(pub fn(&str) -> Error);

#[async_trait]
impl Normalizer for FailingNormalizer {
    async fn normalize(
        &self,
        record: &FileRecord,
        _metadata: &Metadata,
    ) -> Result<Vec<NormalizedDocument>> {
        Err((self.0)(&record.filename))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Memory store whose upsert call number `fail_on` fails until healed
pub struct FlakyStore {
    pub inner: MemoryVectorStore,
    calls: AtomicUsize,
    fail_on: usize,
    healed: AtomicBool,
    error: fn() -> Error,
}

impl FlakyStore {
    /// Fails with a retryable 503
    pub fn new(fail_on: usize) -> Self {
        Self::failing_with(fail_on, || Error::status("Pinecone vectors/upsert", 503, "unavailable"))
    }

    /// Fails with a 400 that no retry can fix
    pub fn rejecting(fail_on: usize) -> Self {
        Self::failing_with(fail_on, || {
            Error::status("Pinecone vectors/upsert", 400, "metadata size exceeds limit")
        })
    }

    fn failing_with(fail_on: usize, error: fn() -> Error) -> Self {
        Self {
            inner: MemoryVectorStore::new(),
            calls: AtomicUsize::new(0),
            fail_on,
            healed: AtomicBool::new(false),
            error,
        }
    }

    pub fn heal(&self) {
        self.healed.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStoreProvider for FlakyStore {
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_on && !self.healed.load(Ordering::SeqCst) {
            return Err((self.error)());
        }
        self.inner.upsert(index, records).await
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>> {
        self.inner.query(index, vector, top_k, filter).await
    }

    async fn len(&self, index: &str) -> Result<usize> {
        self.inner.len(index).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Store that returns canned matches regardless of the query
pub struct CannedStore(pub Vec<VectorMatch>);

#[async_trait]
impl VectorStoreProvider for CannedStore {
    async fn upsert(&self, _index: &str, _records: &[VectorRecord]) -> Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        _index: &str,
        _vector: &[f32],
        top_k: usize,
        _filter: &MetadataFilter,
    ) -> Result<Vec<VectorMatch>> {
        Ok(self.0.iter().take(top_k).cloned().collect())
    }

    async fn len(&self, _index: &str) -> Result<usize> {
        Ok(self.0.len())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

pub fn indexer(
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    batch_size: usize,
    retries: u32,
) -> Indexer {
    Indexer::new(embedder, store, batch_size, retries)
        .unwrap()
        .with_retry_delay(|_| Duration::ZERO)
}

/// Pipeline over `root` that treats every `.pdf` as a plain text file
pub fn text_pipeline(
    root: &std::path::Path,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    normalizers: Option<Normalizers>,
) -> IngestPipeline {
    let normalizers = normalizers.unwrap_or_else(|| Normalizers {
        document: Some(Arc::new(PlainTextNormalizer)),
        ..Normalizers::default()
    });
    IngestPipeline::new(
        MetadataBuilder::new(root),
        normalizers,
        TextChunker::new(700, 50).unwrap(),
        indexer(embedder, store, 100, 0),
        INDEX,
    )
}
