//! Document-to-record pipeline.
//!
//! `split` feeds a bounded structuring fan-out that runs alongside the summary call; the
//! aggregator joins both into an immutable [`ProcessedRecord`]. Question answering sits beside
//! the pipeline and only needs the stored full text. The judge and benchmark runner grade QA
//! answers against acceptance criteria.

mod benchmark;
mod judge;
mod orchestrator;
mod qa;
mod splitter;
mod structurer;
mod summarizer;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use benchmark::{
    BenchmarkError, BenchmarkQuestion, BenchmarkQuestions, BenchmarkReport, BenchmarkResult,
    BenchmarkRunner,
};
pub use judge::{AnswerJudge, Judgment};
pub use orchestrator::SdsProcessor;
pub use qa::QuestionAnswerer;
pub use splitter::SectionSplitter;
pub use structurer::SectionStructurer;
pub use summarizer::Summarizer;
pub use types::{
    ExtractedDocument, ProcessedRecord, ProcessingError, RAW_TEXT_KEY, Section, SectionList,
    StructuredSection, StructuredSectionList,
};
