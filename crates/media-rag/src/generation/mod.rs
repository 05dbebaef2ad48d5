//! Answer generation from retrieved context

pub mod prompt;
pub mod qa;

pub use prompt::PromptBuilder;
pub use qa::{Answer, QaService};
