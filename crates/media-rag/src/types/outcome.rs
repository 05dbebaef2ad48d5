//! Per-file results and run summaries

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::error::Error;

use super::document::Chunk;
use super::file_record::FileType;

/// Reason a file contributed no chunks without being an error
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No normalizer for this file type
    UnsupportedFormat { extension: String },
    /// The audio track could not be extracted from a video
    AudioExtractionFailed { message: String },
    /// Normalization succeeded but produced no text
    EmptyContent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat { extension } if extension.is_empty() => {
                f.write_str("unsupported file type (no extension)")
            }
            Self::UnsupportedFormat { extension } => {
                write!(f, "unsupported file type '{}'", extension)
            }
            Self::AudioExtractionFailed { message } => {
                write!(f, "audio extraction failed: {}", message)
            }
            Self::EmptyContent => f.write_str("no text content"),
        }
    }
}

/// Result of processing one file
#[derive(Debug)]
pub enum FileOutcome {
    /// Chunks ready for indexing
    Chunked(Vec<Chunk>),
    /// File deliberately contributes nothing
    Skipped(SkipReason),
    /// File could not be processed
    Failed(Error),
}

/// A skipped file in a run report
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// A failed file in a run report
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    pub error: String,
}

/// An upsert batch that could not be committed
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Position of the batch in the partition
    pub batch_index: usize,
    /// Offset of the batch's first chunk in the full chunk list
    pub start: usize,
    /// Chunks in the batch
    pub chunk_count: usize,
    pub error: String,
}

/// Outcome of writing a chunk list to the index
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub batches_total: usize,
    pub batches_committed: usize,
    pub chunks_indexed: usize,
    pub failures: Vec<BatchFailure>,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub files_seen: usize,
    pub files_processed: usize,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
    pub chunks_produced: usize,
    pub index: IndexReport,
}

impl IngestReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            files_seen: 0,
            files_processed: 0,
            skipped: Vec::new(),
            failed: Vec::new(),
            chunks_produced: 0,
            index: IndexReport::default(),
        }
    }

    pub fn chunks_indexed(&self) -> usize {
        self.index.chunks_indexed
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  files seen:      {}", self.files_seen)?;
        writeln!(f, "  files processed: {}", self.files_processed)?;
        writeln!(f, "  files skipped:   {}", self.skipped.len())?;
        for skip in &self.skipped {
            writeln!(f, "    - {}: {}", skip.path, skip.reason)?;
        }
        writeln!(f, "  files failed:    {}", self.failed.len())?;
        for failure in &self.failed {
            writeln!(f, "    - {}: {}", failure.path, failure.error)?;
        }
        writeln!(f, "  chunks produced: {}", self.chunks_produced)?;
        write!(
            f,
            "  chunks indexed:  {} ({}/{} batches)",
            self.index.chunks_indexed, self.index.batches_committed, self.index.batches_total
        )?;
        for batch in &self.index.failures {
            write!(
                f,
                "\n    - batch {} (chunks {}..{}): {}",
                batch.batch_index,
                batch.start,
                batch.start + batch.chunk_count,
                batch.error
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::UnsupportedFormat {
            extension: ".docx".to_string(),
        };
        assert_eq!(reason.to_string(), "unsupported file type '.docx'");
        let reason = SkipReason::UnsupportedFormat {
            extension: String::new(),
        };
        assert_eq!(reason.to_string(), "unsupported file type (no extension)");
    }

    #[test]
    fn test_report_summary_lists_problems() {
        let mut report = IngestReport::new(Uuid::nil());
        report.files_seen = 3;
        report.files_processed = 1;
        report.skipped.push(SkippedFile {
            path: "docs/notes.txt".to_string(),
            reason: SkipReason::UnsupportedFormat {
                extension: ".txt".to_string(),
            },
        });
        report.failed.push(FailedFile {
            path: "docs/broken.pdf".to_string(),
            file_type: Some(FileType::Pdf),
            error: "corrupt xref".to_string(),
        });
        report.index.failures.push(BatchFailure {
            batch_index: 1,
            start: 100,
            chunk_count: 40,
            error: "timeout".to_string(),
        });

        let text = report.to_string();
        assert!(text.contains("docs/notes.txt: unsupported file type '.txt'"));
        assert!(text.contains("docs/broken.pdf: corrupt xref"));
        assert!(text.contains("batch 1 (chunks 100..140): timeout"));
    }
}
