//! Video transcripts via an extracted audio track

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::providers::Transcriber;
use crate::types::{keys, ContentType, FileRecord, Metadata, NormalizedDocument};

use super::Normalizer;

/// Writes the audio track of a video to a file
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video: &Path, output: &Path) -> Result<()>;
}

/// Extracts audio with the `ffmpeg` executable
pub struct FfmpegExtractor {
    program: PathBuf,
}

impl FfmpegExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, video: &Path, output: &Path) -> Result<()> {
        let filename = video.display().to_string();
        let result = Command::new(&self.program)
            .arg("-i")
            .arg(video)
            .args(["-q:a", "0", "-map", "a"])
            .arg(output)
            .args(["-y", "-loglevel", "error"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::audio_extraction(
                    &filename,
                    format!("Failed to run {}: {}", self.program.display(), e),
                )
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::audio_extraction(filename, stderr.trim().to_string()));
        }
        Ok(())
    }
}

/// One transcript document per video
pub struct VideoNormalizer {
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
}

impl VideoNormalizer {
    pub fn new(extractor: Arc<dyn AudioExtractor>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            extractor,
            transcriber,
        }
    }
}

#[async_trait]
impl Normalizer for VideoNormalizer {
    async fn normalize(
        &self,
        record: &FileRecord,
        metadata: &Metadata,
    ) -> Result<Vec<NormalizedDocument>> {
        // Removed when dropped, whichever way this function returns
        let audio = tempfile::Builder::new()
            .prefix("media-rag-audio-")
            .suffix(".mp3")
            .tempfile()
            .map_err(|e| {
                Error::audio_extraction(
                    &record.filename,
                    format!("Failed to create temp file: {}", e),
                )
            })?;

        self.extractor
            .extract(&record.path, audio.path())
            .await
            .map_err(|e| match e {
                Error::AudioExtraction { .. } => e,
                other => Error::audio_extraction(&record.filename, other.to_string()),
            })?;

        tracing::debug!(
            "Transcribing {} with {}",
            record.filename,
            self.transcriber.name()
        );
        let transcript = self.transcriber.transcribe(audio.path()).await?;

        let meta = metadata
            .clone()
            .with(keys::CONTENT_TYPE, ContentType::Transcript.as_str());
        Ok(vec![NormalizedDocument::new(transcript, meta)])
    }

    fn name(&self) -> &str {
        "video"
    }
}
