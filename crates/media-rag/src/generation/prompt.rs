//! Prompt templates for RAG generation

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Role given to the model in the system message
    pub const SYSTEM_ROLE: &'static str =
        "You are a chatbot and you take user questions and answer them given the context provided";

    /// Build the user message from a formatted retrieval context and the question
    pub fn build_user_prompt(context: &str, question: &str) -> String {
        format!(
            "Here you have the following information as context:\n{context}\n\n\
             Answer this question: {question}\n\
             You should only use the above information and nothing more",
            context = context,
            question = question
        )
    }
}
