//! Handler for the metrics tool.

use std::sync::Arc;

use crate::service::DigestApi;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the current pipeline counters.
pub(crate) async fn handle_metrics(service: &Arc<dyn DigestApi>) -> Result<CallToolResult, McpError> {
    let snapshot = service.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "documentsProcessed": snapshot.documents_processed,
        "sectionsStructured": snapshot.sections_structured,
        "structuringFallbacks": snapshot.structuring_fallbacks,
        "questionsAnswered": snapshot.questions_answered,
        "lastSectionCount": snapshot.last_section_count,
    })))
}
