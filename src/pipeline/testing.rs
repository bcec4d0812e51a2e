//! Scripted language model used by unit tests across the crate.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{ChatRequest, LanguageModel, ModelCallError};
use crate::prompts::{STRUCTURE_SECTION_USER_MESSAGE, SUMMARY_USER_MESSAGE};

type Responder = dyn Fn(&ChatRequest) -> Result<String, ModelCallError> + Send + Sync;
type Delay = dyn Fn(&ChatRequest) -> Duration + Send + Sync;

/// Pipeline stage a request belongs to, recovered from its messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Split,
    Structure,
    Summary,
    Question,
}

/// Classify a request by the fixed messages each stage sends.
pub(crate) fn stage_of(request: &ChatRequest) -> Stage {
    let user = request
        .messages
        .last()
        .map(|message| message.content.as_str())
        .unwrap_or_default();
    if request.response_shape.is_some() {
        Stage::Split
    } else if user == STRUCTURE_SECTION_USER_MESSAGE {
        Stage::Structure
    } else if user == SUMMARY_USER_MESSAGE {
        Stage::Summary
    } else {
        Stage::Question
    }
}

/// Raw excerpt embedded in a structuring request.
pub(crate) fn excerpt_of(request: &ChatRequest) -> String {
    request
        .messages
        .first()
        .and_then(|message| message.content.split_once("Section content:\n"))
        .map(|(_, excerpt)| excerpt.to_string())
        .unwrap_or_default()
}

/// Language model whose answers, latency, and call log are controlled by the test.
pub(crate) struct ScriptedModel {
    respond: Box<Responder>,
    delay: Box<Delay>,
    calls: Mutex<Vec<ChatRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedModel {
    pub(crate) fn new(
        respond: impl Fn(&ChatRequest) -> Result<String, ModelCallError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay: Box::new(|_| Duration::ZERO),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(
        mut self,
        delay: impl Fn(&ChatRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Box::new(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn calls_for(&self, stage: Stage) -> Vec<ChatRequest> {
        self.calls()
            .into_iter()
            .filter(|request| stage_of(request) == stage)
            .collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, ModelCallError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().expect("calls lock").push(request.clone());

        let delay = (self.delay)(&request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = (self.respond)(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Model answering every stage of a one-section document about "Foo".
pub(crate) fn foo_model() -> ScriptedModel {
    ScriptedModel::new(|request| {
        Ok(match stage_of(request) {
            Stage::Split => r#"{"sections":[{"title":"Section 1: ID","shortSummary":"Identifies the product","rawExcerpt":"Chemical: Foo"}]}"#.to_string(),
            Stage::Structure => "```json\n{\"chemical_name\": \"Foo\"}\n```".to_string(),
            Stage::Summary => "Foo is a test chemical.".to_string(),
            Stage::Question => "Foo.".to_string(),
        })
    })
}
