//! Model Context Protocol (MCP) integration for SDS Digest.
//!
//! This module wires the digest service into an MCP server so editors and agent hosts can
//! process safety data sheets and query them over stdio. The surface area consists of:
//!
//! - Tools: `process-sds`, `get-summary`, `get-structured`, `ask`, and `metrics`.
//! - Resources: `mcp://health` and `mcp://usage`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::SdsDigestMcpServer;
