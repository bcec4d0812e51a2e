//! Section structurer: one model call per section, fanned out behind a concurrency gate.
//!
//! - Decoding is best effort. Answers are fence-stripped and parsed as a JSON object; anything
//!   else is kept verbatim under [`RAW_TEXT_KEY`] instead of failing the document.
//! - `structure_all` admits at most `concurrency` calls at once through a semaphore. Each task
//!   writes its own pre-allocated slot keyed by section index, so the output order is the input
//!   order regardless of completion order.
//! - The first transport failure closes the gate, so queued sections never start, then aborts
//!   the tasks still running and fails the whole call. Dropping the future has the same effect.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::DEFAULT_STRUCTURING_CONCURRENCY;
use crate::llm::{self, ChatMessage, ChatRequest, LanguageModel, ModelCallError};
use crate::prompts::{self, SECTION_CONTENT, STRUCTURE_SECTION_SYSTEM_PROMPT};

use super::types::{
    ProcessingError, RAW_TEXT_KEY, Section, SectionList, StructuredSection,
    StructuredSectionList,
};

/// Outcome of decoding a structuring answer.
#[derive(Debug, Clone, PartialEq)]
enum DecodedContent {
    Object(Map<String, Value>),
    RawText(String),
}

impl DecodedContent {
    fn into_map(self) -> Map<String, Value> {
        match self {
            Self::Object(map) => map,
            Self::RawText(text) => {
                let mut map = Map::new();
                map.insert(RAW_TEXT_KEY.to_string(), Value::String(text));
                map
            }
        }
    }
}

/// Remove a surrounding markdown code fence (```` ```json ```` or bare ```` ``` ````).
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(opened) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    opened.strip_suffix("```").unwrap_or(opened).trim()
}

fn decode_content(raw: &str) -> DecodedContent {
    match serde_json::from_str::<Value>(strip_code_fence(raw)) {
        Ok(Value::Object(map)) => DecodedContent::Object(map),
        Ok(other) => {
            tracing::warn!(
                kind = json_kind(&other),
                "Structured section was valid JSON but not an object; keeping raw text"
            );
            DecodedContent::RawText(raw.to_string())
        }
        Err(error) => {
            tracing::warn!(%error, "Structured section was not valid JSON; keeping raw text");
            DecodedContent::RawText(raw.to_string())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Converts sections into key/value data with a bounded number of concurrent model calls.
#[derive(Clone)]
pub struct SectionStructurer {
    model: Arc<dyn LanguageModel>,
    concurrency: usize,
}

impl SectionStructurer {
    /// Create a structurer with the default concurrency cap.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            concurrency: DEFAULT_STRUCTURING_CONCURRENCY,
        }
    }

    /// Override the number of structuring calls allowed in flight (minimum one).
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Current concurrency cap.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn build_request(section: &Section) -> ChatRequest {
        let system = prompts::render(
            STRUCTURE_SECTION_SYSTEM_PROMPT,
            &[(SECTION_CONTENT, section.raw_excerpt.as_str())],
        );
        ChatRequest::text(vec![
            ChatMessage::system(system),
            ChatMessage::user(prompts::STRUCTURE_SECTION_USER_MESSAGE),
        ])
    }

    /// Structure a single section.
    ///
    /// Only transport/provider failures are errors; an undecodable answer degrades to raw text.
    pub async fn structure(&self, section: &Section) -> Result<StructuredSection, ModelCallError> {
        tracing::info!(title = %section.title, "Structuring section");
        let answer = self.model.complete(Self::build_request(section)).await?;
        Ok(StructuredSection {
            title: section.title.clone(),
            short_summary: section.short_summary.clone(),
            structured_content: decode_content(&answer).into_map(),
        })
    }

    /// Blocking form of [`structure`](Self::structure).
    pub fn structure_blocking(&self, section: &Section) -> Result<StructuredSection, ModelCallError> {
        llm::block_on(self.structure(section))?
    }

    /// Structure every section concurrently, preserving input order.
    pub async fn structure_all(
        &self,
        sections: &SectionList,
    ) -> Result<StructuredSectionList, ProcessingError> {
        let gate = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, section) in sections.iter().cloned().enumerate() {
            let gate = Arc::clone(&gate);
            let structurer = self.clone();
            tasks.spawn(async move {
                // A closed gate means another section already failed.
                let Ok(_permit) = Arc::clone(&gate).acquire_owned().await else {
                    return Ok(None);
                };
                match structurer.structure(&section).await {
                    Ok(structured) => Ok(Some((index, structured))),
                    Err(error) => {
                        gate.close();
                        Err(ProcessingError::from(error))
                    }
                }
            });
        }

        let mut slots: Vec<Option<StructuredSection>> = (0..sections.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|error| ProcessingError::TaskFailed(error.to_string()))?;
            match outcome {
                Ok(Some((index, structured))) => slots[index] = Some(structured),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%error, "Section structuring failed; aborting remaining sections");
                    tasks.abort_all();
                    return Err(error);
                }
            }
        }

        let structured = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ProcessingError::TaskFailed("a structuring slot was never filled".into()))?;
        Ok(StructuredSectionList::new(structured))
    }

    /// Structure every section one after another, in order.
    pub async fn structure_sequential(
        &self,
        sections: &SectionList,
    ) -> Result<StructuredSectionList, ProcessingError> {
        let mut structured = Vec::with_capacity(sections.len());
        for section in sections.iter() {
            structured.push(self.structure(section).await?);
        }
        Ok(StructuredSectionList::new(structured))
    }
}
