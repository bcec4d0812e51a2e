//! MCP handler for question answering.

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

/// Request payload accepted by the `ask` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct AskToolRequest {
    pub(crate) sds_id: String,
    pub(crate) question: String,
}

/// Handle the `ask` tool.
pub(crate) async fn handle_ask(
    service: &Arc<dyn DigestApi>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: AskToolRequest = parse_arguments(arguments)?;
    if args.question.trim().is_empty() {
        return Err(McpError::invalid_params("`question` must not be empty", None));
    }
    let id = parse_id_argument(&args.sds_id)?;
    let answer = service
        .ask(&id, &args.question)
        .await
        .map_err(service_error)?;

    Ok(CallToolResult::structured(json!({
        "sdsId": id.to_string(),
        "question": args.question,
        "answer": answer,
    })))
}
