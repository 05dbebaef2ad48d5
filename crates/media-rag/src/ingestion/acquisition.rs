//! File acquisition sources

use async_trait::async_trait;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Produces the local paths a pipeline run should ingest
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Enumerate files to ingest
    async fn acquire(&self) -> Result<Vec<PathBuf>>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Every regular file below a local directory, in sorted order
pub struct LocalDirectorySource {
    root: PathBuf,
}

impl LocalDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileSource for LocalDirectorySource {
    async fn acquire(&self) -> Result<Vec<PathBuf>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            if !root.is_dir() {
                return Err(Error::acquisition(
                    root.display().to_string(),
                    "not a directory",
                ));
            }

            let mut paths = Vec::new();
            for entry in WalkDir::new(&root).follow_links(true) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => paths.push(entry.into_path()),
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e),
                }
            }
            paths.sort();
            Ok(paths)
        })
        .await
        .map_err(|e| Error::internal(format!("Acquisition task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "local-directory"
    }
}

/// A fixed list of paths, e.g. from the command line
pub struct PathListSource {
    paths: Vec<PathBuf>,
}

impl PathListSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl FileSource for PathListSource {
    async fn acquire(&self) -> Result<Vec<PathBuf>> {
        Ok(self.paths.clone())
    }

    fn name(&self) -> &str {
        "path-list"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_walks_nested_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b/inner")).unwrap();
        std::fs::write(dir.path().join("b/inner/z.pdf"), "z").unwrap();
        std::fs::write(dir.path().join("a.png"), "a").unwrap();
        std::fs::write(dir.path().join("b/c.mp4"), "c").unwrap();

        let paths = LocalDirectorySource::new(dir.path()).acquire().await.unwrap();
        let relative: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b/c.mp4"),
                PathBuf::from("b/inner/z.pdf"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let err = LocalDirectorySource::new("/definitely/not/here")
            .acquire()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Acquisition { .. }));
    }
}
