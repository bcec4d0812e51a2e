//! Document summarizer.

use std::sync::Arc;

use crate::llm::{self, ChatMessage, ChatRequest, LanguageModel, ModelCallError};
use crate::prompts::{self, SDS_INFO, SUMMARY_SYSTEM_PROMPT, SUMMARY_USER_MESSAGE};

/// Produces a prose summary of a whole document in one model call.
#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
}

impl Summarizer {
    /// Create a summarizer backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Summarize `full_text`. The answer is returned as-is; any text is a valid summary.
    pub async fn summarize(&self, full_text: &str) -> Result<String, ModelCallError> {
        let system = prompts::render(SUMMARY_SYSTEM_PROMPT, &[(SDS_INFO, full_text)]);
        let request = ChatRequest::text(vec![
            ChatMessage::system(system),
            ChatMessage::user(SUMMARY_USER_MESSAGE),
        ]);
        let summary = self.model.complete(request).await?;
        tracing::info!(chars = summary.len(), "Summary generated");
        Ok(summary)
    }

    /// Blocking form of [`summarize`](Self::summarize).
    pub fn summarize_blocking(&self, full_text: &str) -> Result<String, ModelCallError> {
        llm::block_on(self.summarize(full_text))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedModel;

    #[tokio::test]
    async fn summary_is_returned_verbatim() {
        let model = Arc::new(ScriptedModel::new(|_| {
            Ok("  **Foo** is flammable.\n".to_string())
        }));
        let summarizer = Summarizer::new(model.clone());

        let summary = summarizer.summarize("Chemical: Foo").await.expect("summary");
        assert_eq!(summary, "  **Foo** is flammable.\n");

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].messages[0].content.ends_with("Chemical: Foo"));
        assert_eq!(calls[0].messages[1].content, SUMMARY_USER_MESSAGE);
        assert!(calls[0].response_shape.is_none());
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced() {
        let model = Arc::new(ScriptedModel::new(|_| {
            Err(ModelCallError::Status {
                status: 401,
                body: "bad key".into(),
            })
        }));

        let error = Summarizer::new(model)
            .summarize("text")
            .await
            .expect_err("unauthorized");
        assert!(matches!(error, ModelCallError::Status { status: 401, .. }));
    }

    #[test]
    fn blocking_summary_matches_async_semantics() {
        let model = Arc::new(ScriptedModel::new(|_| Ok("Short.".to_string())));
        let summary = Summarizer::new(model)
            .summarize_blocking("text")
            .expect("summary");
        assert_eq!(summary, "Short.");
    }
}
