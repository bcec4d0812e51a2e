//! Tool handlers for the MCP server.

use rmcp::{ErrorData as McpError, model::JsonObject};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::service::parse_sds_id;
use crate::store::SdsId;

use super::format::service_error;

pub mod ask;
pub mod metrics;
pub mod process;
pub mod records;

/// Parse structured arguments supplied to a tool invocation.
pub(crate) fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    let value = arguments
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(JsonObject::new()));
    parse_arguments_value(value)
}

/// Deserialize arguments represented as a JSON value into the target type.
pub(crate) fn parse_arguments_value<T: DeserializeOwned>(value: Value) -> Result<T, McpError> {
    serde_json::from_value(value)
        .map_err(|err| McpError::invalid_params(format!("Invalid arguments: {err}"), None))
}

/// Parse an `sds_id` argument, reporting unknown shapes as not found.
pub(crate) fn parse_id_argument(raw: &str) -> Result<SdsId, McpError> {
    parse_sds_id(raw).map_err(service_error)
}
