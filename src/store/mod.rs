//! Keyed storage for processed records plus on-disk upload persistence.
//!
//! Records live behind the [`RecordStore`] trait so transports never touch a global map. The
//! bundled [`InMemoryRecordStore`] keeps everything for the life of the process with no
//! eviction.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::pipeline::ProcessedRecord;

mod uploads;

pub use uploads::{EXTRACTED_FILE_NAME, UploadStore, sanitize_file_name};

/// Opaque identifier assigned to each processed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SdsId(Uuid);

impl SdsId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SdsId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SdsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The string is not an identifier this service could have issued.
#[derive(Debug, Error)]
#[error("Invalid SDS id: {0}")]
pub struct InvalidSdsId(pub String);

impl FromStr for SdsId {
    type Err = InvalidSdsId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| InvalidSdsId(s.to_string()))
    }
}

/// Provenance stored next to each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// File name the document was submitted under.
    pub file_name: String,
    /// Hex SHA-256 of the source bytes.
    pub source_sha256: String,
    /// RFC 3339 timestamp of when processing finished.
    pub processed_at: String,
}

/// A processed record together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Pipeline output.
    pub record: ProcessedRecord,
    /// Provenance.
    pub metadata: RecordMetadata,
}

/// Failures raised by record stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record already exists under this identifier.
    #[error("SDS {0} already exists")]
    Duplicate(SdsId),
    /// Backend-specific failure.
    #[error("Record store failure: {0}")]
    Backend(String),
}

/// Assigns keys to records and retrieves them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store `record` under `id`.
    async fn insert(&self, id: SdsId, record: StoredRecord) -> Result<(), StoreError>;
    /// Fetch the record stored under `id`.
    async fn get(&self, id: &SdsId) -> Result<Option<Arc<StoredRecord>>, StoreError>;
    /// Number of stored records.
    async fn len(&self) -> Result<usize, StoreError>;
}

/// Process-memory store.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<SdsId, Arc<StoredRecord>>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, id: SdsId, record: StoredRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        records.insert(id, Arc::new(record));
        Ok(())
    }

    async fn get(&self, id: &SdsId) -> Result<Option<Arc<StoredRecord>>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}
