//! Section splitter: full document text to an ordered [`SectionList`].

use std::sync::Arc;

use crate::llm::{self, ChatMessage, LanguageModel, TypedCompletionError};
use crate::prompts::SPLIT_SECTIONS_SYSTEM_PROMPT;

use super::types::SectionList;

/// Asks a model to decompose a document into titled sections.
///
/// Section boundaries are whatever the model decides; the response must decode into
/// [`SectionList`] or the call fails with a malformed-response error. Nothing is retried here.
#[derive(Clone)]
pub struct SectionSplitter {
    model: Arc<dyn LanguageModel>,
}

impl SectionSplitter {
    /// Create a splitter backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Split `full_text` into sections.
    pub async fn split(&self, full_text: &str) -> Result<SectionList, TypedCompletionError> {
        tracing::info!(chars = full_text.len(), "Extracting sections");
        let messages = vec![
            ChatMessage::system(SPLIT_SECTIONS_SYSTEM_PROMPT),
            ChatMessage::user(full_text),
        ];
        let sections: SectionList = llm::complete_typed(self.model.as_ref(), messages).await?;
        tracing::info!(sections = sections.len(), "Extracted sections");
        Ok(sections)
    }

    /// Blocking form of [`split`](Self::split).
    pub fn split_blocking(&self, full_text: &str) -> Result<SectionList, TypedCompletionError> {
        llm::block_on(self.split(full_text))?
    }
}
