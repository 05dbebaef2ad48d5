//! Core types for the pipeline

pub mod document;
pub mod file_record;
pub mod metadata;
pub mod outcome;
pub mod response;

pub use document::{Chunk, NormalizedDocument};
pub use file_record::{ContentType, FileRecord, FileType, Modality};
pub use metadata::{keys, Metadata, MetadataValue};
pub use outcome::{
    BatchFailure, FailedFile, FileOutcome, IndexReport, IngestReport, SkipReason, SkippedFile,
};
pub use response::RetrievalMatch;
