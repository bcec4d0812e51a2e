//! Digest service coordinating extraction, the model pipeline, and record storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;

use crate::config::Config;
use crate::extraction::{ExtractionError, Extractor, FileExtractor};
use crate::llm::{self, LanguageModel, ModelCallError};
use crate::metrics::{DigestMetrics, MetricsSnapshot};
use crate::pipeline::{
    ExtractedDocument, ProcessingError, QuestionAnswerer, SdsProcessor, StructuredSectionList,
};
use crate::store::{
    InMemoryRecordStore, RecordMetadata, RecordStore, SdsId, StoreError, StoredRecord,
    UploadStore, sanitize_file_name,
};

/// Errors surfaced by [`DigestService`] to its transports.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No record exists under the requested identifier.
    #[error("SDS {0} not found")]
    NotFound(String),
    /// The caller supplied an unusable request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The source document could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The model pipeline failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    /// A standalone model call (question answering, model construction) failed.
    #[error(transparent)]
    Model(#[from] ModelCallError),
    /// The record store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Upload persistence failed.
    #[error("Upload storage failed: {0}")]
    Io(#[from] std::io::Error),
    /// A blocking extraction task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Parse a client-supplied identifier; anything unparseable can never have been issued.
pub fn parse_sds_id(raw: &str) -> Result<SdsId, ServiceError> {
    raw.parse()
        .map_err(|_| ServiceError::NotFound(raw.trim().to_string()))
}

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// Identifier the record is stored under.
    pub sds_id: SdsId,
    /// Sanitized file name of the source.
    pub file_name: String,
    /// Number of structured sections.
    pub section_count: usize,
    /// Sections stored as raw text because the model answer was not a JSON object.
    pub fallback_count: usize,
}

/// Static description of how the service is wired, reported by health endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceProfile {
    /// Provider label (`openai`, `ollama`, ...).
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Structuring fan-out cap.
    pub structuring_concurrency: usize,
}

/// Abstraction over the digest service used by external surfaces (HTTP, MCP).
#[async_trait]
pub trait DigestApi: Send + Sync {
    /// Persist an uploaded file, process it, and store the record.
    async fn ingest_upload(&self, file_name: String, bytes: Vec<u8>) -> Result<IngestOutcome, ServiceError>;

    /// Process a file already on disk and store the record.
    async fn ingest_path(&self, path: PathBuf) -> Result<IngestOutcome, ServiceError>;

    /// Structured sections of a stored record.
    async fn structured(&self, id: &SdsId) -> Result<StructuredSectionList, ServiceError>;

    /// Summary of a stored record.
    async fn summary(&self, id: &SdsId) -> Result<String, ServiceError>;

    /// Full stored record with provenance.
    async fn record(&self, id: &SdsId) -> Result<Arc<StoredRecord>, ServiceError>;

    /// Answer a question against a stored record's full text.
    async fn ask(&self, id: &SdsId, question: &str) -> Result<String, ServiceError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Describe the model wiring.
    fn profile(&self) -> ServiceProfile;
}

/// Construction parameters for [`DigestService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Directory receiving uploads and extracted text.
    pub upload_dir: PathBuf,
    /// Structuring fan-out cap.
    pub structuring_concurrency: usize,
    /// Reported model wiring.
    pub profile_provider: String,
    /// Reported model identifier.
    pub profile_model: String,
}

/// Coordinates extraction, processing, storage, and question answering.
///
/// Build once near process start and share through an `Arc`; the HTTP surface, the MCP tools,
/// and the CLI all drive the same instance type.
pub struct DigestService {
    extractor: Arc<dyn Extractor>,
    processor: SdsProcessor,
    answerer: QuestionAnswerer,
    store: Arc<dyn RecordStore>,
    uploads: UploadStore,
    metrics: Arc<DigestMetrics>,
    profile: ServiceProfile,
}

impl DigestService {
    /// Build a service around `model` with the default extractor and an in-memory store.
    pub fn new(model: Arc<dyn LanguageModel>, options: ServiceOptions) -> Self {
        let processor = SdsProcessor::new(Arc::clone(&model), options.structuring_concurrency);
        let profile = ServiceProfile {
            provider: options.profile_provider,
            model: options.profile_model,
            structuring_concurrency: processor.concurrency(),
        };
        Self {
            extractor: Arc::new(FileExtractor::new()),
            processor,
            answerer: QuestionAnswerer::new(model),
            store: Arc::new(InMemoryRecordStore::new()),
            uploads: UploadStore::new(options.upload_dir),
            metrics: Arc::new(DigestMetrics::new()),
            profile,
        }
    }

    /// Build a service from loaded configuration, constructing the configured model.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let model = llm::build_language_model(&config.llm_settings())?;
        Ok(Self::new(
            model,
            ServiceOptions {
                upload_dir: config.upload_dir.clone(),
                structuring_concurrency: config.structuring_concurrency,
                profile_provider: config.llm_provider.label().to_string(),
                profile_model: config.llm_model.clone(),
            },
        ))
    }

    /// Replace the extraction engine.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the record store.
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = store;
        self
    }

    /// Extract `path` on the blocking pool.
    pub async fn extract(&self, path: &Path) -> Result<ExtractedDocument, ServiceError> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|error| ServiceError::Task(error.to_string()))?
            .map_err(ServiceError::from)
    }

    /// Persist an uploaded file, process it, and store the record.
    pub async fn ingest_upload(
        &self,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::InvalidInput("uploaded file is empty".into()));
        }
        let file_name = sanitize_file_name(&file_name);
        let id = SdsId::new();
        tracing::info!(sds_id = %id, file = %file_name, bytes = bytes.len(), "Received upload");

        let saved = self.uploads.save_upload(&id, &file_name, &bytes).await?;
        let document = self.extract(&saved).await?;
        self.uploads.save_extracted(&id, &document.content).await?;

        self.process_and_store(id, file_name, sha256_hex(&bytes), document)
            .await
    }

    /// Process a file already on disk and store the record.
    pub async fn ingest_path(&self, path: PathBuf) -> Result<IngestOutcome, ServiceError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ServiceError::InvalidInput(format!("{} is not a file", path.display())))?;
        let id = SdsId::new();
        tracing::info!(sds_id = %id, path = %path.display(), "Ingesting file");

        let document = self.extract(&path).await?;
        let bytes = tokio::fs::read(&path).await.map_err(|source| {
            ServiceError::Extraction(ExtractionError::Io {
                path: path.clone(),
                source,
            })
        })?;
        self.uploads.save_extracted(&id, &document.content).await?;

        self.process_and_store(id, file_name, sha256_hex(&bytes), document)
            .await
    }

    async fn process_and_store(
        &self,
        id: SdsId,
        file_name: String,
        source_sha256: String,
        document: ExtractedDocument,
    ) -> Result<IngestOutcome, ServiceError> {
        let record = self.processor.process(document).await?;
        let section_count = record.structured_sections().len();
        let fallback_count = record.structured_sections().raw_text_count();

        self.store
            .insert(
                id,
                StoredRecord {
                    record,
                    metadata: RecordMetadata {
                        file_name: file_name.clone(),
                        source_sha256,
                        processed_at: current_timestamp_rfc3339(),
                    },
                },
            )
            .await?;
        self.metrics
            .record_document(section_count as u64, fallback_count as u64);
        tracing::info!(
            sds_id = %id,
            file = %file_name,
            sections = section_count,
            fallbacks = fallback_count,
            "SDS stored"
        );

        Ok(IngestOutcome {
            sds_id: id,
            file_name,
            section_count,
            fallback_count,
        })
    }

    /// Full stored record with provenance.
    pub async fn record(&self, id: &SdsId) -> Result<Arc<StoredRecord>, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Structured sections of a stored record.
    pub async fn structured(&self, id: &SdsId) -> Result<StructuredSectionList, ServiceError> {
        Ok(self.record(id).await?.record.structured_sections().clone())
    }

    /// Summary of a stored record.
    pub async fn summary(&self, id: &SdsId) -> Result<String, ServiceError> {
        Ok(self.record(id).await?.record.summary().to_string())
    }

    /// Answer a question against a stored record's full text.
    pub async fn ask(&self, id: &SdsId, question: &str) -> Result<String, ServiceError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::InvalidInput("question must not be empty".into()));
        }
        let stored = self.record(id).await?;
        let answer = self
            .answerer
            .answer(question, stored.record.full_text())
            .await?;
        self.metrics.record_question();
        Ok(answer)
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Describe the model wiring.
    pub fn profile(&self) -> ServiceProfile {
        self.profile.clone()
    }
}

#[async_trait]
impl DigestApi for DigestService {
    async fn ingest_upload(&self, file_name: String, bytes: Vec<u8>) -> Result<IngestOutcome, ServiceError> {
        DigestService::ingest_upload(self, file_name, bytes).await
    }

    async fn ingest_path(&self, path: PathBuf) -> Result<IngestOutcome, ServiceError> {
        DigestService::ingest_path(self, path).await
    }

    async fn structured(&self, id: &SdsId) -> Result<StructuredSectionList, ServiceError> {
        DigestService::structured(self, id).await
    }

    async fn summary(&self, id: &SdsId) -> Result<String, ServiceError> {
        DigestService::summary(self, id).await
    }

    async fn record(&self, id: &SdsId) -> Result<Arc<StoredRecord>, ServiceError> {
        DigestService::record(self, id).await
    }

    async fn ask(&self, id: &SdsId, question: &str) -> Result<String, ServiceError> {
        DigestService::ask(self, id, question).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DigestService::metrics_snapshot(self)
    }

    fn profile(&self) -> ServiceProfile {
        DigestService::profile(self)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
