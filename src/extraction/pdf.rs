use std::path::Path;

use super::{ExtractionError, Extractor, finish, read_file};
use crate::pipeline::ExtractedDocument;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; scanned pages yield no text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Extract page texts from an in-memory PDF, joined with blank lines.
    pub fn extract_bytes(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
        tracing::debug!(pages = pages.len(), "Extracted PDF pages");

        Ok(pages
            .iter()
            .map(|page| page.trim())
            .filter(|page| !page.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

impl Extractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        let bytes = read_file(path)?;
        let content = self.extract_bytes(&bytes)?;
        finish(path, content)
    }
}
