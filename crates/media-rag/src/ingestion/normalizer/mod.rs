//! Modality normalizers: turn a file into one or more text documents

mod document;
mod image;
mod video;

pub use document::PdfNormalizer;
pub use image::ImageNormalizer;
pub use video::{AudioExtractor, FfmpegExtractor, VideoNormalizer};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FileRecord, Metadata, NormalizedDocument};

/// Extracts text from one modality
///
/// Returned documents carry `metadata` plus any keys native to the modality
/// (`page`, `content_type`).
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(
        &self,
        record: &FileRecord,
        metadata: &Metadata,
    ) -> Result<Vec<NormalizedDocument>>;

    /// Get normalizer name for logging
    fn name(&self) -> &str;
}
