//! MCP handlers reading processed records.

use std::sync::Arc;

use crate::service::DigestApi;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

use super::{parse_arguments, parse_id_argument};
use crate::mcp::format::service_error;

/// Request payload for tools addressing one record.
#[derive(Debug, Deserialize)]
pub(crate) struct RecordToolRequest {
    pub(crate) sds_id: String,
}

/// Handle the `get-summary` tool.
pub(crate) async fn handle_get_summary(
    service: &Arc<dyn DigestApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: RecordToolRequest = parse_arguments(arguments)?;
    let id = parse_id_argument(&args.sds_id)?;
    let summary = service.summary(&id).await.map_err(service_error)?;

    Ok(CallToolResult::structured(json!({
        "sdsId": id.to_string(),
        "summary": summary,
    })))
}

/// Handle the `get-structured` tool, returning sections in document order.
pub(crate) async fn handle_get_structured(
    service: &Arc<dyn DigestApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: RecordToolRequest = parse_arguments(arguments)?;
    let id = parse_id_argument(&args.sds_id)?;
    let structured = service.structured(&id).await.map_err(service_error)?;
    let titles: Vec<&str> = structured.iter().map(|s| s.title.as_str()).collect();

    Ok(CallToolResult::structured(json!({
        "sdsId": id.to_string(),
        "sections": titles,
        "structuredSections": structured,
    })))
}
