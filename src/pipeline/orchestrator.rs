//! Aggregator: runs the stages over one document and assembles the [`ProcessedRecord`].

use std::sync::Arc;

use crate::llm::{self, LanguageModel};

use super::splitter::SectionSplitter;
use super::structurer::SectionStructurer;
use super::summarizer::Summarizer;
use super::types::{ExtractedDocument, ProcessedRecord, ProcessingError};

/// Turns extracted text into a [`ProcessedRecord`].
///
/// The split must finish first. Structuring and summarizing then run side by side; both must
/// succeed, since a record is never returned with a missing summary or a short section list.
#[derive(Clone)]
pub struct SdsProcessor {
    splitter: SectionSplitter,
    structurer: SectionStructurer,
    summarizer: Summarizer,
}

impl SdsProcessor {
    /// Build every stage on the same model, capping structuring calls at `concurrency`.
    pub fn new(model: Arc<dyn LanguageModel>, concurrency: usize) -> Self {
        Self::from_parts(
            SectionSplitter::new(Arc::clone(&model)),
            SectionStructurer::new(Arc::clone(&model)).with_concurrency(concurrency),
            Summarizer::new(model),
        )
    }

    /// Assemble a processor from individually configured stages.
    pub fn from_parts(
        splitter: SectionSplitter,
        structurer: SectionStructurer,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            splitter,
            structurer,
            summarizer,
        }
    }

    /// Structuring concurrency cap in effect.
    pub fn concurrency(&self) -> usize {
        self.structurer.concurrency()
    }

    /// Process a document, overlapping the structuring fan-out with the summary call.
    pub async fn process(&self, document: ExtractedDocument) -> Result<ProcessedRecord, ProcessingError> {
        tracing::info!(source = %document.source_path, "Processing document");
        let sections = self.splitter.split(&document.content).await?;

        let (structured, summary) = tokio::try_join!(
            self.structurer.structure_all(&sections),
            async {
                self.summarizer
                    .summarize(&document.content)
                    .await
                    .map_err(ProcessingError::from)
            },
        )?;

        tracing::info!(
            source = %document.source_path,
            sections = structured.len(),
            fallbacks = structured.raw_text_count(),
            "Document processed"
        );
        Ok(ProcessedRecord::new(document.content, structured, summary))
    }

    /// Process a document with every model call issued one after another.
    ///
    /// Yields the same record as [`process`](Self::process) for the same model answers.
    pub async fn process_sequential(
        &self,
        document: ExtractedDocument,
    ) -> Result<ProcessedRecord, ProcessingError> {
        tracing::info!(source = %document.source_path, "Processing document sequentially");
        let sections = self.splitter.split(&document.content).await?;
        let structured = self.structurer.structure_sequential(&sections).await?;
        let summary = self.summarizer.summarize(&document.content).await?;
        Ok(ProcessedRecord::new(document.content, structured, summary))
    }

    /// Blocking form of [`process_sequential`](Self::process_sequential).
    pub fn process_blocking(&self, document: ExtractedDocument) -> Result<ProcessedRecord, ProcessingError> {
        llm::block_on(self.process_sequential(document))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelCallError;
    use crate::pipeline::testing::{ScriptedModel, Stage, excerpt_of, foo_model, stage_of};
    use serde_json::json;

    const FOO_TEXT: &str = "# SDS\n## Section 1: ID\nChemical: Foo";

    fn foo_document() -> ExtractedDocument {
        ExtractedDocument {
            content: FOO_TEXT.into(),
            source_path: "foo.md".into(),
        }
    }

    #[tokio::test]
    async fn end_to_end_record_for_single_section_document() {
        let processor = SdsProcessor::new(Arc::new(foo_model()), 5);

        let record = processor.process(foo_document()).await.expect("record");

        assert_eq!(record.full_text(), FOO_TEXT);
        assert_eq!(record.summary(), "Foo is a test chemical.");
        assert_eq!(record.structured_sections().len(), 1);
        let section = &record.structured_sections().as_slice()[0];
        assert_eq!(section.title, "Section 1: ID");
        assert_eq!(section.short_summary, "Identifies the product");
        assert_eq!(section.structured_content["chemical_name"], json!("Foo"));
    }

    #[tokio::test]
    async fn summary_and_structuring_only_see_post_split_inputs() {
        let model = Arc::new(foo_model());
        let processor = SdsProcessor::new(model.clone(), 5);

        processor.process(foo_document()).await.expect("record");

        assert_eq!(model.calls_for(Stage::Split).len(), 1);

        let summaries = model.calls_for(Stage::Summary);
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].messages[0].content.ends_with(FOO_TEXT));
        assert!(!summaries[0].messages[0].content.contains("chemical_name"));

        let structures = model.calls_for(Stage::Structure);
        assert_eq!(structures.len(), 1);
        assert_eq!(excerpt_of(&structures[0]), "Chemical: Foo");
        assert!(!structures[0].messages[0].content.contains("Foo is a test chemical."));
    }

    #[tokio::test]
    async fn structuring_failure_fails_the_whole_document() {
        let model = ScriptedModel::new(|request| match stage_of(request) {
            Stage::Split => Ok(r#"{"sections":[
                {"title":"A","shortSummary":"a","rawExcerpt":"one"},
                {"title":"B","shortSummary":"b","rawExcerpt":"two"},
                {"title":"C","shortSummary":"c","rawExcerpt":"three"}
            ]}"#
            .to_string()),
            Stage::Structure if excerpt_of(request) == "two" => {
                Err(ModelCallError::ProviderUnavailable("reset by peer".into()))
            }
            Stage::Structure => Ok("{}".to_string()),
            Stage::Summary | Stage::Question => Ok("summary".to_string()),
        });
        let processor = SdsProcessor::new(Arc::new(model), 3);

        let error = processor
            .process(foo_document())
            .await
            .expect_err("no partial record");
        assert!(matches!(
            error,
            ProcessingError::ModelCall(ModelCallError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn summary_failure_fails_the_whole_document() {
        let model = ScriptedModel::new(|request| match stage_of(request) {
            Stage::Summary => Err(ModelCallError::Status {
                status: 500,
                body: "boom".into(),
            }),
            _ => foo_model_answer(request),
        });
        let processor = SdsProcessor::new(Arc::new(model), 5);

        let error = processor.process(foo_document()).await.expect_err("failed");
        assert!(matches!(
            error,
            ProcessingError::ModelCall(ModelCallError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn malformed_split_answer_stops_before_structuring() {
        let model = Arc::new(ScriptedModel::new(|request| match stage_of(request) {
            Stage::Split => Ok("definitely not sections".to_string()),
            _ => Ok("{}".to_string()),
        }));
        let processor = SdsProcessor::new(model.clone(), 5);

        let error = processor.process(foo_document()).await.expect_err("malformed");
        assert!(matches!(error, ProcessingError::MalformedResponse(_)));
        assert!(model.calls_for(Stage::Structure).is_empty());
        assert!(model.calls_for(Stage::Summary).is_empty());
    }

    #[tokio::test]
    async fn sequential_variant_builds_the_same_record() {
        let processor = SdsProcessor::new(Arc::new(foo_model()), 5);

        let concurrent = processor.process(foo_document()).await.expect("concurrent");
        let sequential = processor
            .process_sequential(foo_document())
            .await
            .expect("sequential");

        assert_eq!(concurrent, sequential);
    }

    #[test]
    fn blocking_variant_builds_the_same_record() {
        let processor = SdsProcessor::new(Arc::new(foo_model()), 2);

        let record = processor.process_blocking(foo_document()).expect("record");
        assert_eq!(record.summary(), "Foo is a test chemical.");
        assert_eq!(record.structured_sections().len(), 1);
        assert_eq!(processor.concurrency(), 2);
    }

    fn foo_model_answer(request: &crate::llm::ChatRequest) -> Result<String, ModelCallError> {
        Ok(match stage_of(request) {
            Stage::Split => r#"{"sections":[{"title":"Section 1: ID","shortSummary":"Identifies the product","rawExcerpt":"Chemical: Foo"}]}"#.to_string(),
            Stage::Structure => "{\"chemical_name\": \"Foo\"}".to_string(),
            Stage::Summary => "Foo is a test chemical.".to_string(),
            Stage::Question => "Foo.".to_string(),
        })
    }
}
