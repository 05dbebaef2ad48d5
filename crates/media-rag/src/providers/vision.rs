//! Vision description provider trait

use async_trait::async_trait;

use crate::error::Result;

/// An image sent inline to a vision model
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
}

/// Describes one or more images in natural language
#[async_trait]
pub trait VisionDescriber: Send + Sync {
    /// Describe `images` following `instruction`; returns the single `description` field
    async fn describe(&self, images: &[ImageInput], instruction: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
