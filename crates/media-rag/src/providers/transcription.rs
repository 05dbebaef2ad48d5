//! Speech-to-text provider trait

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Turns an audio file into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path`
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
