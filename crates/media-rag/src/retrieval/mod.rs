//! Similarity retrieval and metadata filtering

pub mod filter;
pub mod retriever;

pub use filter::MetadataFilter;
pub use retriever::{format_context, Retriever, CONTEXT_HEADER};
