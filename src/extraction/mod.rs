//! Extraction adapter: source file to [`ExtractedDocument`].
//!
//! Engines implement [`Extractor`]; [`FileExtractor`] picks one by file extension. Extraction
//! is synchronous and CPU bound, so async callers run it on the blocking pool.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::ExtractedDocument;

mod pdf;
mod text;

pub use pdf::PdfTextExtractor;
pub use text::PlainTextExtractor;

/// File extensions handled as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Errors raised while turning a source file into text. None of them are retried.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// No engine handles this file type.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
    /// The PDF engine rejected the file.
    #[error("PDF parsing failed: {0}")]
    Pdf(String),
    /// A text file was not valid UTF-8.
    #[error("Text encoding error in {0}")]
    Encoding(PathBuf),
    /// The engine ran but produced no text (scanned or empty document).
    #[error("No extractable text in {0}")]
    EmptyDocument(PathBuf),
}

/// Document-to-text engine.
pub trait Extractor: Send + Sync {
    /// Extract the full text of the file at `path`.
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError>;
}

/// Lowercased extension of `path`, if any.
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether some engine in [`FileExtractor`] accepts `path`.
pub fn is_supported(path: &Path) -> bool {
    matches!(
        extension_of(path).as_deref(),
        Some(ext) if ext == "pdf" || TEXT_EXTENSIONS.contains(&ext)
    )
}

fn read_file(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn finish(path: &Path, content: String) -> Result<ExtractedDocument, ExtractionError> {
    if content.trim().is_empty() {
        return Err(ExtractionError::EmptyDocument(path.to_path_buf()));
    }
    tracing::info!(path = %path.display(), chars = content.len(), "Extracted document text");
    Ok(ExtractedDocument {
        content,
        source_path: path.display().to_string(),
    })
}

/// Dispatches to the PDF or plain-text engine by file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor {
    pdf: PdfTextExtractor,
    text: PlainTextExtractor,
}

impl FileExtractor {
    /// Create the default dispatcher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Extractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        match extension_of(path).as_deref() {
            Some("pdf") => self.pdf.extract(path),
            Some(ext) if TEXT_EXTENSIONS.contains(&ext) => self.text.extract(path),
            _ => Err(ExtractionError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Single-page PDF with one line of Helvetica text.
    pub(crate) fn make_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("serialize pdf");
        buf
    }

    fn write_temp(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(bytes).expect("write temp file");
        file
    }

    #[test]
    fn dispatches_markdown_to_plain_text_engine() {
        let file = write_temp(".MD", b"# SDS\n## Section 1: ID\nChemical: Foo");

        let document = FileExtractor::new().extract(file.path()).expect("document");

        assert_eq!(document.content, "# SDS\n## Section 1: ID\nChemical: Foo");
        assert_eq!(document.source_path, file.path().display().to_string());
    }

    #[test]
    fn dispatches_pdf_to_pdf_engine() {
        let file = write_temp(".pdf", &make_test_pdf("Acetone Safety Data Sheet"));

        let document = FileExtractor::new().extract(file.path()).expect("document");

        assert!(
            document.content.contains("Acetone") || document.content.contains("Safety"),
            "unexpected text: {}",
            document.content
        );
    }

    #[test]
    fn rejects_unknown_extensions() {
        let file = write_temp(".docx", b"binary");
        let error = FileExtractor::new().extract(file.path()).expect_err("unsupported");
        assert!(matches!(error, ExtractionError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = FileExtractor::new()
            .extract(Path::new("/definitely/not/here.pdf"))
            .expect_err("missing");
        assert!(matches!(error, ExtractionError::Io { .. }));
    }

    #[test]
    fn support_check_is_case_insensitive() {
        assert!(is_supported(Path::new("sheet.PDF")));
        assert!(is_supported(Path::new("notes.markdown")));
        assert!(!is_supported(Path::new("archive.zip")));
        assert!(!is_supported(Path::new("README")));
    }
}
