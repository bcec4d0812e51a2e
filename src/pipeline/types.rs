//! Core data types and error definitions for the SDS pipeline.
//!
//! Every entity is built once and never mutated afterwards; collections expose read-only views.
//! Serialized field names follow the camelCase contract exposed to API callers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm::{MalformedModelResponseError, ModelCallError, TypedCompletionError};

/// Key used to wrap a section whose model answer could not be decoded as a JSON object.
pub const RAW_TEXT_KEY: &str = "section_content";

/// Text produced by the extraction adapter for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    /// Full document text (markdown for PDF sources).
    pub content: String,
    /// Path of the file the text came from.
    pub source_path: String,
}

/// One model-identified logical region of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Section heading; not guaranteed to be unique.
    pub title: String,
    /// One or two sentence description of the section.
    pub short_summary: String,
    /// Verbatim text of the section.
    pub raw_excerpt: String,
}

/// Sections of one document in document order.
///
/// Also the shape requested from the model when splitting, hence the `sections` wrapper object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SectionList {
    /// Sections in the order they appear in the source document.
    sections: Vec<Section>,
}

impl SectionList {
    /// Wrap sections that are already in document order.
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the document produced no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Iterate sections in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    /// Borrow the sections as a slice.
    pub fn as_slice(&self) -> &[Section] {
        &self.sections
    }
}

/// A section with its content converted to schema-free key/value data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSection {
    /// Title copied from the source section.
    pub title: String,
    /// Short summary copied from the source section.
    pub short_summary: String,
    /// Model-determined key/value content.
    pub structured_content: Map<String, Value>,
}

impl StructuredSection {
    /// Whether the content is the raw-text wrapper rather than model-structured data.
    pub fn is_raw_text(&self) -> bool {
        self.structured_content.len() == 1
            && self
                .structured_content
                .get(RAW_TEXT_KEY)
                .is_some_and(Value::is_string)
    }
}

/// Structured sections in the same order as the [`SectionList`] they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredSectionList {
    sections: Vec<StructuredSection>,
}

impl StructuredSectionList {
    /// Wrap sections that are already in source order.
    pub fn new(sections: Vec<StructuredSection>) -> Self {
        Self { sections }
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Iterate sections in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, StructuredSection> {
        self.sections.iter()
    }

    /// Borrow the sections as a slice.
    pub fn as_slice(&self) -> &[StructuredSection] {
        &self.sections
    }

    /// Number of sections stored as raw text.
    pub fn raw_text_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_raw_text()).count()
    }
}

/// Terminal artifact of the pipeline: full text, structured sections, and summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRecord {
    full_text: String,
    structured_sections: StructuredSectionList,
    summary: String,
}

impl ProcessedRecord {
    /// Assemble a record; every field is required.
    pub fn new(
        full_text: String,
        structured_sections: StructuredSectionList,
        summary: String,
    ) -> Self {
        Self {
            full_text,
            structured_sections,
            summary,
        }
    }

    /// Extracted text the record was built from.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Structured sections in document order.
    pub fn structured_sections(&self) -> &StructuredSectionList {
        &self.structured_sections
    }

    /// Prose summary of the document.
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// Errors emitted while turning extracted text into a [`ProcessedRecord`].
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The section-splitting answer did not match the section list shape.
    #[error("Section splitting failed: {0}")]
    MalformedResponse(#[from] MalformedModelResponseError),
    /// A model call failed in transport or at the provider.
    #[error("Model call failed: {0}")]
    ModelCall(#[from] ModelCallError),
    /// A structuring task panicked or was cancelled by the runtime.
    #[error("Structuring task failed: {0}")]
    TaskFailed(String),
}

impl From<TypedCompletionError> for ProcessingError {
    fn from(error: TypedCompletionError) -> Self {
        match error {
            TypedCompletionError::Call(inner) => Self::ModelCall(inner),
            TypedCompletionError::Malformed(inner) => Self::MalformedResponse(inner),
        }
    }
}
