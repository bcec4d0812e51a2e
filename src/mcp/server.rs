//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    mcp::{
        format::{health_payload, json_resource_contents, serialize_json, usage_payload},
        handlers::{
            ask::handle_ask,
            metrics::handle_metrics,
            process::handle_process,
            records::{handle_get_structured, handle_get_summary},
        },
        registry, schemas,
    },
    service::DigestApi,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const HEALTH_URI: &str = "mcp://health";
const USAGE_URI: &str = "mcp://usage";

/// MCP server implementation exposing SDS Digest operations.
#[derive(Clone)]
pub struct SdsDigestMcpServer {
    service: Arc<dyn DigestApi>,
    registry: Arc<registry::Registry>,
}

impl SdsDigestMcpServer {
    /// Create a new MCP server over the supplied digest service.
    pub fn new(service: Arc<dyn DigestApi>) -> Self {
        let mut registry = registry::Registry::new();
        registry.register_resource(HEALTH_URI, resource_health);
        registry.register_resource(USAGE_URI, resource_usage);

        registry.register_tool("process-sds", tool_process);
        registry.register_tool("get-summary", tool_get_summary);
        registry.register_tool("get-structured", tool_get_structured);
        registry.register_tool("ask", tool_ask);
        registry.register_tool("metrics", tool_metrics);
        tracing::debug!(tools = ?registry.tool_names(), "Registered MCP tools");

        Self {
            service,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        let record_schema = Arc::new(schemas::sds_id_input_schema());
        vec![
            Tool {
                name: Cow::Borrowed("process-sds"),
                title: Some("Process Safety Data Sheet".to_string()),
                description: Some(Cow::Borrowed(
                    "Extract a safety data sheet from a file path, split it into sections, structure each section, and summarize it. Returns the sds_id used by the other tools.",
                )),
                input_schema: Arc::new(schemas::process_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Process Safety Data Sheet")
                        .destructive(false)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("get-summary"),
                title: Some("Get Summary".to_string()),
                description: Some(Cow::Borrowed(
                    "Return the prose summary of a processed sheet.",
                )),
                input_schema: record_schema.clone(),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Get Summary")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("get-structured"),
                title: Some("Get Structured Sections".to_string()),
                description: Some(Cow::Borrowed(
                    "Return the structured key/value content of every section, in document order.",
                )),
                input_schema: record_schema,
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Get Structured Sections")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("ask"),
                title: Some("Ask About Sheet".to_string()),
                description: Some(Cow::Borrowed(
                    "Answer a question using only the full text of a processed sheet.",
                )),
                input_schema: Arc::new(schemas::ask_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Ask About Sheet")
                        .read_only(true)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("metrics"),
                title: Some("Metrics Snapshot".to_string()),
                description: Some(Cow::Borrowed(
                    "Check processed documents, structured sections, fallbacks, and questions at a glance.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Metrics Snapshot")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut health = RawResource::new(HEALTH_URI, "health");
        health.description = Some("Model provider, model name, and structuring concurrency".into());

        let mut usage = RawResource::new(USAGE_URI, "usage");
        usage.description = Some(
            "Recommended tool flow: process-sds once, then get-summary, get-structured, or ask."
                .into(),
        );

        vec![health.no_annotation(), usage.no_annotation()]
    }
}

fn resource_health(
    server: &SdsDigestMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let service = server.service.clone();
    Box::pin(async move {
        let body = health_payload(&service.profile(), &service.metrics_snapshot());
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(HEALTH_URI, body)],
        })
    })
}

fn resource_usage(
    _server: &SdsDigestMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                USAGE_URI,
                serialize_json(&usage_payload(), USAGE_URI),
            )],
        })
    })
}

fn tool_process(server: &SdsDigestMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_process(&service, request.arguments).await })
}

fn tool_get_summary(
    server: &SdsDigestMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_get_summary(&service, request.arguments).await })
}

fn tool_get_structured(
    server: &SdsDigestMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_get_structured(&service, request.arguments).await })
}

fn tool_ask(server: &SdsDigestMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_ask(&service, request.arguments).await })
}

fn tool_metrics(
    server: &SdsDigestMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_metrics(&service).await })
}

impl ServerHandler for SdsDigestMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "sds-digest".to_string();
        implementation.title = Some("SDS Digest MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to digest Safety Data Sheets. Process a sheet by path, then read its summary or structured sections, or ask questions answered from the sheet's text.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
