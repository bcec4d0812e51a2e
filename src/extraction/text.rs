use std::path::Path;

use super::{ExtractionError, Extractor, finish, read_file};
use crate::pipeline::ExtractedDocument;

/// Reads markdown or plain-text files verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        let bytes = read_file(path)?;
        let content =
            String::from_utf8(bytes).map_err(|_| ExtractionError::Encoding(path.to_path_buf()))?;
        finish(path, content)
    }
}
