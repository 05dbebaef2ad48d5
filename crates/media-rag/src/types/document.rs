//! Normalized documents and the chunks cut from them

use serde::{Deserialize, Serialize};

use super::metadata::{keys, Metadata};

/// Text produced by a normalizer, one per file or per page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    /// Extracted text
    pub text: String,
    /// Metadata native to the document (page number, content type)
    pub metadata: Metadata,
}

impl NormalizedDocument {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

/// A bounded-length text segment, the unit of vector indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub text: String,
    /// Provenance, a superset of the parent document's metadata
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Identifies the source segment this chunk was cut from: file path plus page
    pub fn source_key(&self) -> String {
        let path = self.metadata.get_str(keys::FILEPATH).unwrap_or_default();
        match self.metadata.get(keys::PAGE) {
            Some(page) => format!("{}#{}", path, page),
            None => path.to_string(),
        }
    }
}
