//! End-to-end ingestion: acquire, normalize, chunk, index

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::Providers;
use crate::types::{
    Chunk, FailedFile, FileOutcome, FileType, IngestReport, Modality, SkipReason, SkippedFile,
};

use super::acquisition::FileSource;
use super::chunker::TextChunker;
use super::indexer::Indexer;
use super::metadata::MetadataBuilder;
use super::normalizer::{
    FfmpegExtractor, ImageNormalizer, Normalizer, PdfNormalizer, VideoNormalizer,
};

/// Normalizer per modality; a missing one fails files of that modality
#[derive(Clone, Default)]
pub struct Normalizers {
    pub document: Option<Arc<dyn Normalizer>>,
    pub video: Option<Arc<dyn Normalizer>>,
    pub image: Option<Arc<dyn Normalizer>>,
}

impl Normalizers {
    /// Default normalizers for the configured providers
    pub fn from_providers(config: &RagConfig, providers: &Providers) -> Self {
        Self {
            document: Some(Arc::new(PdfNormalizer::new())),
            video: providers.transcriber.clone().map(|transcriber| {
                Arc::new(VideoNormalizer::new(
                    Arc::new(FfmpegExtractor::new(&config.transcription.ffmpeg_path)),
                    transcriber,
                )) as Arc<dyn Normalizer>
            }),
            image: providers.vision.clone().map(|vision| {
                Arc::new(ImageNormalizer::new(vision, config.vision.instruction.clone()))
                    as Arc<dyn Normalizer>
            }),
        }
    }

    fn get(&self, modality: Modality) -> Option<&Arc<dyn Normalizer>> {
        match modality {
            Modality::Document => self.document.as_ref(),
            Modality::Video => self.video.as_ref(),
            Modality::Image => self.image.as_ref(),
            Modality::Unsupported => None,
        }
    }
}

/// Chunks gathered from a set of files, plus the per-file report
pub struct ChunkedFiles {
    pub chunks: Vec<Chunk>,
    pub report: IngestReport,
}

/// Ingestion pipeline for a batch of files
pub struct IngestPipeline {
    metadata_builder: MetadataBuilder,
    normalizers: Normalizers,
    chunker: TextChunker,
    indexer: Indexer,
    index_name: String,
    parallel_files: usize,
    file_timeout: Duration,
}

impl IngestPipeline {
    pub fn new(
        metadata_builder: MetadataBuilder,
        normalizers: Normalizers,
        chunker: TextChunker,
        indexer: Indexer,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            metadata_builder,
            normalizers,
            chunker,
            indexer,
            index_name: index_name.into(),
            parallel_files: 1,
            file_timeout: Duration::from_secs(900),
        }
    }

    /// Build a pipeline from configuration and providers
    pub fn from_config(config: &RagConfig, providers: &Providers) -> Result<Self> {
        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let indexer = Indexer::new(
            providers.embedder.clone(),
            providers.vector_store.clone(),
            config.ingestion.batch_size,
            config.ingestion.max_batch_retries,
        )?;

        Ok(Self::new(
            MetadataBuilder::new(&config.ingestion.docs_root),
            Normalizers::from_providers(config, providers),
            chunker,
            indexer,
            &config.vector_db.index_name,
        )
        .with_parallel_files(config.processing.parallel_files)
        .with_file_timeout(Duration::from_secs(config.processing.file_timeout_secs)))
    }

    /// Normalize up to `n` files concurrently
    pub fn with_parallel_files(mut self, n: usize) -> Self {
        self.parallel_files = n.max(1);
        self
    }

    /// Give up on a single file after `timeout`
    pub fn with_file_timeout(mut self, timeout: Duration) -> Self {
        self.file_timeout = timeout;
        self
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Acquire files from `source`, chunk them and index all chunks in one pass
    pub async fn run(&self, source: &dyn FileSource) -> Result<IngestReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("ingest", %run_id);

        async move {
            let paths = source.acquire().await?;
            tracing::info!("Acquired {} files from {}", paths.len(), source.name());

            let ChunkedFiles { chunks, mut report } = self.chunk_files(run_id, paths).await;
            if !chunks.is_empty() {
                report.index = self.indexer.index(&chunks, &self.index_name).await;
            }

            tracing::info!(
                "Run finished: {} files, {} processed, {} skipped, {} failed, {}/{} chunks indexed",
                report.files_seen,
                report.files_processed,
                report.skipped.len(),
                report.failed.len(),
                report.chunks_indexed(),
                report.chunks_produced
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Normalize and chunk `paths` without indexing; chunks keep acquisition order
    pub async fn chunk_files(&self, run_id: Uuid, paths: Vec<PathBuf>) -> ChunkedFiles {
        let mut report = IngestReport::new(run_id);
        report.files_seen = paths.len();

        let outcomes: Vec<(PathBuf, FileOutcome)> = stream::iter(paths)
            .map(|path| async move {
                let outcome = self.process_file(&path).await;
                (path, outcome)
            })
            .buffered(self.parallel_files)
            .collect()
            .await;

        let mut chunks = Vec::new();
        for (path, outcome) in outcomes {
            let display = path.display().to_string();
            match outcome {
                FileOutcome::Chunked(file_chunks) => {
                    report.files_processed += 1;
                    chunks.extend(file_chunks);
                }
                FileOutcome::Skipped(reason) => {
                    report.skipped.push(SkippedFile {
                        path: display,
                        reason,
                    });
                }
                FileOutcome::Failed(error) => {
                    let file_type = path
                        .extension()
                        .map(|ext| FileType::from_extension(&ext.to_string_lossy()));
                    report.failed.push(FailedFile {
                        path: display,
                        file_type,
                        error: error.to_string(),
                    });
                }
            }
        }

        report.chunks_produced = chunks.len();
        ChunkedFiles { chunks, report }
    }

    /// Turn one file into chunks; never fails the run
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        let record = match self.metadata_builder.build(path).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Failed to acquire {}: {}", path.display(), e);
                return FileOutcome::Failed(e);
            }
        };
        let metadata = record.metadata();
        let modality = record.file_type().modality();

        if modality == Modality::Unsupported {
            tracing::info!("Skipping {}: unsupported file type", record.filename);
            return FileOutcome::Skipped(SkipReason::UnsupportedFormat {
                extension: record.extension.clone(),
            });
        }

        let Some(normalizer) = self.normalizers.get(modality) else {
            let e = Error::Config(format!(
                "no normalizer configured for {} files",
                record.file_type()
            ));
            tracing::error!("Failed to process {}: {}", record.filename, e);
            return FileOutcome::Failed(e);
        };

        tracing::debug!("[{}] Normalizing with {}", record.filename, normalizer.name());
        let documents =
            match tokio::time::timeout(self.file_timeout, normalizer.normalize(&record, &metadata))
                .await
            {
                Ok(Ok(documents)) => documents,
                Ok(Err(Error::AudioExtraction { message, .. })) => {
                    tracing::warn!("Skipping {}: audio extraction failed: {}", record.filename, message);
                    return FileOutcome::Skipped(SkipReason::AudioExtractionFailed { message });
                }
                Ok(Err(e)) => {
                    tracing::error!("Failed to process {}: {}", record.filename, e);
                    return FileOutcome::Failed(e);
                }
                Err(_) => {
                    let e = Error::normalization(
                        &record.filename,
                        format!("timed out after {}s", self.file_timeout.as_secs()),
                    );
                    tracing::error!("Failed to process {}: {}", record.filename, e);
                    return FileOutcome::Failed(e);
                }
            };

        let chunks = self.chunker.chunk(&documents, &metadata);
        if chunks.is_empty() {
            tracing::info!("Skipping {}: no text content", record.filename);
            return FileOutcome::Skipped(SkipReason::EmptyContent);
        }

        tracing::info!(
            "[{}] {} documents, {} chunks",
            record.filename,
            documents.len(),
            chunks.len()
        );
        FileOutcome::Chunked(chunks)
    }
}
