//! Provenance metadata for acquired files

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::FileRecord;

/// Builds [`FileRecord`]s from filesystem stat data
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    docs_root: PathBuf,
}

impl MetadataBuilder {
    /// `relative_path` is computed against `docs_root`
    pub fn new(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
        }
    }

    /// Stat `path` and describe it; the file must exist and be a regular file
    pub async fn build(&self, path: &Path) -> Result<FileRecord> {
        let display = path.display().to_string();
        let stat = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::acquisition(&display, e.to_string()))?;
        if !stat.is_file() {
            return Err(Error::acquisition(display, "not a regular file"));
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let relative_path = path
            .strip_prefix(&self.docs_root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();

        Ok(FileRecord {
            path: path.to_path_buf(),
            filename,
            extension,
            size_bytes: stat.len(),
            created_at: Utc::now(),
            relative_path,
        })
    }
}
