//! Formatting helpers shared across MCP handlers and resources.

use crate::metrics::MetricsSnapshot;
use crate::service::{ServiceError, ServiceProfile};
use rmcp::ErrorData as McpError;
use rmcp::model::ResourceContents;
use serde::Serialize;
use serde_json::{Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Build the health payload describing the model wiring and activity so far.
pub(crate) fn health_payload(profile: &ServiceProfile, metrics: &MetricsSnapshot) -> String {
    let payload = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": {
            "provider": profile.provider,
            "name": profile.model,
        },
        "structuringConcurrency": profile.structuring_concurrency,
        "documentsProcessed": metrics.documents_processed,
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

/// Recommended tool flow returned by the `usage` resource.
pub(crate) fn usage_payload() -> Value {
    json!({
        "title": "SDS Digest MCP Usage",
        "policy": [
            "Process a sheet once with `process-sds`; reuse the returned sds_id afterwards.",
            "Prefer `get-summary` for an overview and `get-structured` for exact values.",
            "Use `ask` for targeted questions; answers only draw on the sheet's own text.",
            "Do not paste whole sheets into prompts.",
        ],
        "flows": [
            {
                "name": "Digest & Query",
                "steps": [
                    "process-sds({ path })",
                    "get-summary({ sds_id })",
                    "get-structured({ sds_id })",
                    "ask({ sds_id, question })"
                ]
            }
        ]
    })
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Map a service failure onto an MCP error: caller mistakes are `invalid_params`, the rest are
/// internal errors.
pub(crate) fn service_error(error: ServiceError) -> McpError {
    match error {
        ServiceError::NotFound(_) | ServiceError::InvalidInput(_) => {
            McpError::invalid_params(error.to_string(), None)
        }
        other => {
            tracing::error!(error = %other, "MCP tool failed");
            McpError::internal_error(other.to_string(), None)
        }
    }
}
