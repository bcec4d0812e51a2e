use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct DigestMetrics {
    documents_processed: AtomicU64,
    sections_structured: AtomicU64,
    structuring_fallbacks: AtomicU64,
    questions_answered: AtomicU64,
    last_section_count: AtomicU64,
}

impl DigestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed document along with its section and fallback counts.
    pub fn record_document(&self, section_count: u64, fallback_count: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.sections_structured
            .fetch_add(section_count, Ordering::Relaxed);
        self.structuring_fallbacks
            .fetch_add(fallback_count, Ordering::Relaxed);
        self.last_section_count
            .store(section_count, Ordering::Relaxed);
    }

    /// Record a successfully answered question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents_processed = self.documents_processed.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_processed,
            sections_structured: self.sections_structured.load(Ordering::Relaxed),
            structuring_fallbacks: self.structuring_fallbacks.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            last_section_count: (documents_processed > 0)
                .then(|| self.last_section_count.load(Ordering::Relaxed)),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents processed since startup.
    pub documents_processed: u64,
    /// Total sections structured across all processed documents.
    pub sections_structured: u64,
    /// Sections whose model answer was not JSON and fell back to raw text.
    pub structuring_fallbacks: u64,
    /// Number of questions answered.
    pub questions_answered: u64,
    /// Section count of the most recently processed document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_section_count: Option<u64>,
}
