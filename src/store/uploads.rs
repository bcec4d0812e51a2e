//! Upload persistence: `<root>/<sds_id>/<file_name>` plus the extracted text next to it.

use std::io;
use std::path::PathBuf;

use super::SdsId;

/// File name used for the extracted text of an upload.
pub const EXTRACTED_FILE_NAME: &str = "extracted.md";

const FALLBACK_FILE_NAME: &str = "upload";

/// Reduce a client-supplied file name to its final path component.
///
/// Both separators are honoured so `..\\..\\x.pdf` cannot escape the upload directory either.
pub fn sanitize_file_name(raw: &str) -> String {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if last.is_empty() || last == "." || last == ".." || last == EXTRACTED_FILE_NAME {
        FALLBACK_FILE_NAME.to_string()
    } else {
        last.to_string()
    }
}

/// Writes uploaded files and their extracted text under a root directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Store uploads under `root`; directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the files of one document.
    pub fn dir_for(&self, id: &SdsId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Persist the raw upload and return where it was written.
    pub async fn save_upload(&self, id: &SdsId, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let dir = self.dir_for(id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(sanitize_file_name(file_name));
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved upload");
        Ok(path)
    }

    /// Persist the extracted text of a document.
    pub async fn save_extracted(&self, id: &SdsId, content: &str) -> io::Result<PathBuf> {
        let dir = self.dir_for(id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(EXTRACTED_FILE_NAME);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}
