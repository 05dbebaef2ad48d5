//! File records and type classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::metadata::{keys, Metadata};

/// File type classification stored in metadata as `file_type`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Video with an audio track
    Video,
    /// Still image
    Image,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from an extension, with or without the leading dot
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "mp4" | "mov" | "avi" | "mkv" => Self::Video,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Value written to the `file_type` metadata key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Video => "video",
            Self::Image => "image",
            Self::Unknown => "unknown",
        }
    }

    /// Which normalizer handles this type
    pub fn modality(&self) -> Modality {
        match self {
            Self::Pdf => Modality::Document,
            Self::Video => Modality::Video,
            Self::Image => Modality::Image,
            Self::Unknown => Modality::Unsupported,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizer dispatch target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    /// Paginated text document
    Document,
    /// Audio transcript of a video
    Video,
    /// Vision description of an image
    Image,
    /// No normalizer available
    Unsupported,
}

/// What kind of text a normalizer produced, stored as `content_type`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Document,
    Transcript,
    ImageDescription,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Transcript => "transcript",
            Self::ImageDescription => "image_description",
        }
    }
}

/// Record of a discovered file, created once per file per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path as acquired
    pub path: PathBuf,
    /// Final path component
    pub filename: String,
    /// Lowercased extension including the dot, empty if none
    pub extension: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// Path relative to the documents root
    pub relative_path: String,
}

impl FileRecord {
    /// Type classification derived from the extension
    pub fn file_type(&self) -> FileType {
        FileType::from_extension(&self.extension)
    }

    /// Base provenance metadata for this file
    pub fn metadata(&self) -> Metadata {
        Metadata::new()
            .with(keys::FILENAME, self.filename.as_str())
            .with(keys::FILEPATH, self.path.to_string_lossy().into_owned())
            .with(keys::UPLOAD_TIME, self.created_at.to_rfc3339())
            .with(keys::FILE_SIZE, self.size_bytes)
            .with(keys::FILE_TYPE, self.file_type().as_str())
            .with(keys::RELATIVE_PATH, self.relative_path.as_str())
            .with(keys::EXTENSION, self.extension.as_str())
    }
}
