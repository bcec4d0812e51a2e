//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes SDS Digest's tools and resources over stdio. This mode is
//! designed for editor/agent integrations and shares all runtime configuration with the HTTP
//! binary. Logs go to stderr so stdout stays reserved for protocol frames.
use anyhow::{Context, Result};
use rmcp::{service::ServiceExt, transport::stdio};
use sds_digest::{
    config,
    logging::{self, ConsoleTarget},
    mcp::SdsDigestMcpServer,
    service::DigestService,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing_with(ConsoleTarget::Stderr);

    let service = DigestService::from_config(config::get_config())
        .context("failed to initialize digest service")?;
    let server = SdsDigestMcpServer::new(Arc::new(service));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
