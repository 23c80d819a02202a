//! Roleplay Reports MCP Server Library
//!
//! This library provides two MCP (Model Context Protocol) tools for AI assistants
//! to explore and query the restaurant roleplay daily KPI view read-only:
//! `get_view_schema_and_samples` and `execute_custom_query`.

pub mod backend;
pub mod config;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::ReportError;
pub use mcp::ReportService;
