//! MCP handler for document processing.

use std::path::PathBuf;
use std::sync::Arc;

use crate::service::DigestApi;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::parse_arguments;
use crate::mcp::format::service_error;

/// Request payload accepted by the `process-sds` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct ProcessToolRequest {
    /// Path of the sheet on the server host.
    pub(crate) path: String,
}

/// Handle the `process-sds` tool by extracting, processing, and storing the file.
pub(crate) async fn handle_process(
    service: &Arc<dyn DigestApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: ProcessToolRequest = parse_arguments(arguments)?;
    let path = args.path.trim();
    if path.is_empty() {
        return Err(McpError::invalid_params("`path` must not be empty", None));
    }

    let outcome = service
        .ingest_path(PathBuf::from(path))
        .await
        .map_err(service_error)?;

    Ok(CallToolResult::structured(json!({
        "status": "ok",
        "sdsId": outcome.sds_id.to_string(),
        "fileName": outcome.file_name,
        "sectionCount": outcome.section_count,
        "fallbackCount": outcome.fallback_count,
    })))
}
