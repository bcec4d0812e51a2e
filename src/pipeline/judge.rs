//! Grading answers against acceptance criteria.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::llm::{self, ChatMessage, LanguageModel, TypedCompletionError};
use crate::prompts::{self, ACCEPTANCE_CRITERIA, ANSWER, JUDGE_PROMPT};

/// Verdict returned by [`AnswerJudge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Judgment {
    /// Why the answer is correct or wrong.
    pub reason: String,
    /// Whether the answer meets the acceptance criteria.
    pub correctness: bool,
}

/// Asks a model whether an answer meets a set of acceptance criteria.
#[derive(Clone)]
pub struct AnswerJudge {
    model: Arc<dyn LanguageModel>,
}

impl AnswerJudge {
    /// Create a judge backed by `model`.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Grade `answer` against `acceptance_criteria`.
    pub async fn judge(
        &self,
        answer: &str,
        acceptance_criteria: &str,
    ) -> Result<Judgment, TypedCompletionError> {
        let prompt = prompts::render(
            JUDGE_PROMPT,
            &[(ANSWER, answer), (ACCEPTANCE_CRITERIA, acceptance_criteria)],
        );
        let judgment: Judgment =
            llm::complete_typed(self.model.as_ref(), vec![ChatMessage::user(prompt)]).await?;
        tracing::info!(correct = judgment.correctness, "Answer judged");
        Ok(judgment)
    }

    /// Blocking form of [`judge`](Self::judge).
    pub fn judge_blocking(
        &self,
        answer: &str,
        acceptance_criteria: &str,
    ) -> Result<Judgment, TypedCompletionError> {
        llm::block_on(self.judge(answer, acceptance_criteria))?
    }
}
