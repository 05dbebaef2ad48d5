//! File ingestion: acquisition, normalization, chunking and indexing

pub mod acquisition;
mod chunker;
pub mod indexer;
mod metadata;
pub mod normalizer;
mod pipeline;

pub use acquisition::{FileSource, LocalDirectorySource, PathListSource};
pub use chunker::TextChunker;
pub use indexer::{assign_ids, partition, Indexer};
pub use metadata::MetadataBuilder;
pub use normalizer::{
    AudioExtractor, FfmpegExtractor, ImageNormalizer, Normalizer, PdfNormalizer, VideoNormalizer,
};
pub use pipeline::{ChunkedFiles, IngestPipeline, Normalizers};
