//! Benchmark questions and the ask-then-judge evaluation loop.
//!
//! A benchmark file is the JSON object `{"questions": [...]}` with snake_case fields. Each
//! question is answered against the document text and the answer is graded by [`AnswerJudge`]
//! using the question's description and example of a correct answer as acceptance criteria.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{self, LanguageModel};

use super::judge::{AnswerJudge, Judgment};
use super::qa::QuestionAnswerer;
use super::types::ProcessingError;

/// Errors raised while reading or writing a benchmark file.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    /// The file could not be read or written.
    #[error("Benchmark file {path} could not be accessed: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file content is not a valid benchmark document.
    #[error("Benchmark file {path} is not valid: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Decoder diagnostic.
        #[source]
        source: serde_json::Error,
    },
}

/// A single benchmark question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkQuestion {
    /// Unique identifier for the question.
    pub id: u32,
    /// SDS section number and name.
    pub section: String,
    /// Reference text from the sheet.
    pub reference: String,
    /// Why the question is part of the benchmark.
    pub reason: String,
    /// The question text.
    pub question: String,
    /// Example of a correct answer.
    pub example_of_correct_answer: String,
    /// What a correct answer must contain.
    pub description_of_correct_answer: String,
}

impl BenchmarkQuestion {
    /// Criteria handed to the judge.
    pub fn acceptance_criteria(&self) -> String {
        format!(
            "{}\nExample of a correct answer: {}",
            self.description_of_correct_answer, self.example_of_correct_answer
        )
    }
}

/// A collection of benchmark questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkQuestions {
    /// Questions in file order.
    pub questions: Vec<BenchmarkQuestion>,
}

impl BenchmarkQuestions {
    /// Load questions from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BenchmarkError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| BenchmarkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| BenchmarkError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save questions to a JSON file, pretty-printed.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), BenchmarkError> {
        let path = path.as_ref();
        let body = serde_json::to_string_pretty(self).map_err(|source| BenchmarkError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, body).map_err(|source| BenchmarkError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the collection has no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Outcome for one benchmark question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkResult {
    /// Question identifier.
    pub id: u32,
    /// Question text.
    pub question: String,
    /// Answer produced from the document.
    pub answer: String,
    /// Judge verdict for the answer.
    pub judgment: Judgment,
}

/// Results of a benchmark run in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkReport {
    /// Per-question outcomes.
    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkReport {
    /// Number of answers judged correct.
    pub fn correct_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.judgment.correctness)
            .count()
    }

    /// Share of correct answers, `0.0` for an empty run.
    pub fn accuracy(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.correct_count() as f64 / self.results.len() as f64
        }
    }
}

/// Answers every benchmark question and grades each answer.
#[derive(Clone)]
pub struct BenchmarkRunner {
    answerer: QuestionAnswerer,
    judge: AnswerJudge,
}

impl BenchmarkRunner {
    /// Use `model` for both answering and judging.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            answerer: QuestionAnswerer::new(Arc::clone(&model)),
            judge: AnswerJudge::new(model),
        }
    }

    /// Run the benchmark against `full_text`, one question at a time.
    pub async fn run(
        &self,
        questions: &BenchmarkQuestions,
        full_text: &str,
    ) -> Result<BenchmarkReport, ProcessingError> {
        let mut results = Vec::with_capacity(questions.len());
        for item in &questions.questions {
            let answer = self.answerer.answer(&item.question, full_text).await?;
            let judgment = self
                .judge
                .judge(&answer, &item.acceptance_criteria())
                .await?;
            tracing::info!(id = item.id, correct = judgment.correctness, "Benchmark question graded");
            results.push(BenchmarkResult {
                id: item.id,
                question: item.question.clone(),
                answer,
                judgment,
            });
        }
        Ok(BenchmarkReport { results })
    }

    /// Blocking form of [`run`](Self::run).
    pub fn run_blocking(
        &self,
        questions: &BenchmarkQuestions,
        full_text: &str,
    ) -> Result<BenchmarkReport, ProcessingError> {
        llm::block_on(self.run(questions, full_text))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelCallError;
    use crate::pipeline::testing::ScriptedModel;

    fn question(id: u32, text: &str, description: &str) -> BenchmarkQuestion {
        BenchmarkQuestion {
            id,
            section: "Section 9: Physical and chemical properties".into(),
            reference: "Flash point: -20 C".into(),
            reason: "Flammability drives storage decisions".into(),
            question: text.into(),
            example_of_correct_answer: "-20 C".into(),
            description_of_correct_answer: description.into(),
        }
    }

    fn sample() -> BenchmarkQuestions {
        BenchmarkQuestions {
            questions: vec![
                question(1, "What is the flash point?", "States -20 C"),
                question(2, "What is the boiling point?", "States 56 C"),
            ],
        }
    }

    #[test]
    fn questions_load_from_snake_case_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("questions.json");
        std::fs::write(
            &path,
            r#"{"questions":[{"id":7,"section":"2. Hazards","reference":"Danger","reason":"signal word",
            "question":"What is the signal word?","example_of_correct_answer":"Danger",
            "description_of_correct_answer":"Names the signal word Danger"}]}"#,
        )
        .expect("write");

        let loaded = BenchmarkQuestions::from_json_file(&path).expect("loaded");

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.questions[0].id, 7);
        assert_eq!(loaded.questions[0].example_of_correct_answer, "Danger");
    }

    #[test]
    fn saved_questions_keep_non_ascii_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.json");
        let mut questions = sample();
        questions.questions[0].reference = "Flammpunkt: -20 °C".into();

        questions.to_json_file(&path).expect("saved");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("-20 °C"));
        assert_eq!(BenchmarkQuestions::from_json_file(&path).expect("reloaded"), questions);
    }

    #[test]
    fn missing_and_invalid_files_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = BenchmarkQuestions::from_json_file(dir.path().join("none.json"))
            .expect_err("missing");
        assert!(matches!(missing, BenchmarkError::Io { .. }));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"questions":[{"id":1}]}"#).expect("write");
        let invalid = BenchmarkQuestions::from_json_file(&path).expect_err("invalid");
        assert!(matches!(invalid, BenchmarkError::Json { .. }));
    }

    #[tokio::test]
    async fn run_answers_then_judges_each_question() {
        let model = Arc::new(ScriptedModel::new(|request| {
            let content = &request.messages.last().expect("message").content;
            if request.response_shape.is_some() {
                let correct = content.contains("-20 C.");
                Ok(format!(
                    r#"{{"reason":"checked","correctness":{correct}}}"#
                ))
            } else if content.contains("flash") {
                Ok("-20 C.".to_string())
            } else {
                Ok("I do not know.".to_string())
            }
        }));
        let runner = BenchmarkRunner::new(model.clone());

        let report = runner
            .run(&sample(), "Flash point: -20 C")
            .await
            .expect("report");

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].id, 1);
        assert_eq!(report.results[0].answer, "-20 C.");
        assert!(report.results[0].judgment.correctness);
        assert!(!report.results[1].judgment.correctness);
        assert_eq!(report.correct_count(), 1);
        assert!((report.accuracy() - 0.5).abs() < f64::EPSILON);

        let judged = model
            .calls()
            .into_iter()
            .filter(|request| request.response_shape.is_some())
            .collect::<Vec<_>>();
        assert_eq!(judged.len(), 2);
        assert!(judged[0].messages[0].content.contains("States -20 C"));
        assert!(judged[0].messages[0].content.contains("Example of a correct answer: -20 C"));
    }

    #[tokio::test]
    async fn run_stops_on_first_failed_call() {
        let model = Arc::new(ScriptedModel::new(|_| {
            Err(ModelCallError::Status {
                status: 429,
                body: "rate limited".into(),
            })
        }));

        let error = BenchmarkRunner::new(model.clone())
            .run(&sample(), "text")
            .await
            .expect_err("rate limited");

        assert!(matches!(
            error,
            ProcessingError::ModelCall(ModelCallError::Status { status: 429, .. })
        ));
        assert_eq!(model.calls().len(), 1);
    }

    #[test]
    fn empty_report_has_zero_accuracy() {
        let report = BenchmarkReport { results: Vec::new() };
        assert_eq!(report.correct_count(), 0);
        assert_eq!(report.accuracy(), 0.0);
    }
}
