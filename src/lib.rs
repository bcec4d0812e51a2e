#![deny(missing_docs)]

//! Core library for SDS Digest: Safety Data Sheets in, structured records out.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Source-file text extraction.
pub mod extraction;
/// Language-model capability and provider adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Pipeline activity counters.
pub mod metrics;
/// Section splitting, structuring, summarizing, and question answering.
pub mod pipeline;
/// Fixed model instructions.
pub mod prompts;
/// Digest service shared by every transport.
pub mod service;
/// Record storage and upload persistence.
pub mod store;
