//! Question answering over the index

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::{MetadataFilter, Retriever};

use super::prompt::PromptBuilder;

/// Answer returned by [`QaService::ask`]
#[derive(Debug, Clone)]
pub struct Answer {
    /// Generated answer text
    pub text: String,
    /// The formatted context the answer was generated from
    pub context: String,
}

/// Retrieves context for a question and asks the LLM to answer from it
pub struct QaService {
    retriever: Arc<Retriever>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl QaService {
    pub fn new(retriever: Arc<Retriever>, llm: Arc<dyn LlmProvider>, top_k: usize) -> Self {
        Self {
            retriever,
            llm,
            top_k,
        }
    }

    /// Answer `question` using the `top_k` most similar chunks
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_filtered(question, &MetadataFilter::new()).await
    }

    /// Answer `question` restricted to chunks matching `filter`
    pub async fn ask_filtered(&self, question: &str, filter: &MetadataFilter) -> Result<Answer> {
        let context = self.retriever.retrieve(question, self.top_k, filter).await?;
        tracing::debug!("Context for question has {} chars", context.chars().count());

        let text = self
            .llm
            .generate(PromptBuilder::SYSTEM_ROLE, &context, question)
            .await?;

        Ok(Answer { text, context })
    }
}
