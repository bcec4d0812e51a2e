//! Question answering over an already-extracted document.

use std::sync::Arc;

use crate::llm::{self, ChatMessage, ChatRequest, LanguageModel, ModelCallError};
use crate::prompts::{self, QUESTION_SYSTEM_PROMPT, SDS_INFO};

/// Answers free-form questions against a document's full text.
///
/// Stateless: nothing is remembered between calls, so every call carries the whole document.
#[derive(Clone)]
pub struct QuestionAnswerer {
    model: Arc<dyn LanguageModel>,
}

impl QuestionAnswerer {
    /// Create an answerer backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Answer `question` using `full_text` as the only context.
    pub async fn answer(&self, question: &str, full_text: &str) -> Result<String, ModelCallError> {
        tracing::info!(question_chars = question.len(), "Answering question");
        let system = prompts::render(QUESTION_SYSTEM_PROMPT, &[(SDS_INFO, full_text)]);
        self.model
            .complete(ChatRequest::text(vec![
                ChatMessage::system(system),
                ChatMessage::user(question),
            ]))
            .await
    }

    /// Blocking form of [`answer`](Self::answer).
    pub fn answer_blocking(&self, question: &str, full_text: &str) -> Result<String, ModelCallError> {
        llm::block_on(self.answer(question, full_text))?
    }
}
