//! Image descriptions from a vision model

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{ImageInput, VisionDescriber};
use crate::types::{keys, ContentType, FileRecord, Metadata, NormalizedDocument};

use super::Normalizer;

/// One description document per image
pub struct ImageNormalizer {
    describer: Arc<dyn VisionDescriber>,
    instruction: String,
}

impl ImageNormalizer {
    pub fn new(describer: Arc<dyn VisionDescriber>, instruction: impl Into<String>) -> Self {
        Self {
            describer,
            instruction: instruction.into(),
        }
    }
}

#[async_trait]
impl Normalizer for ImageNormalizer {
    async fn normalize(
        &self,
        record: &FileRecord,
        metadata: &Metadata,
    ) -> Result<Vec<NormalizedDocument>> {
        let bytes = tokio::fs::read(&record.path).await.map_err(|e| {
            Error::normalization(&record.filename, format!("Failed to read image: {}", e))
        })?;
        let mime_type = mime_guess::from_path(&record.path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let image = ImageInput { bytes, mime_type };
        let description = self
            .describer
            .describe(std::slice::from_ref(&image), &self.instruction)
            .await?;

        let meta = metadata
            .clone()
            .with(keys::CONTENT_TYPE, ContentType::ImageDescription.as_str());
        Ok(vec![NormalizedDocument::new(description, meta)])
    }

    fn name(&self) -> &str {
        "image"
    }
}
