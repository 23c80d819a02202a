//! Data models for the roleplay reports MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod envelope;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use envelope::{
    ErrorBody, ErrorEnvelope, ErrorKind, QueryEnvelope, SchemaEnvelope, TruncationNotice,
};
pub use query::{
    CHARACTER_LIMIT, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_QUERY_CHARS,
    MAX_ROW_LIMIT, MIN_QUERY_CHARS, Row, RowLimit,
};
pub use schema::{
    ColumnDescriptor, DateRange, GENERIC_COLUMN_DESCRIPTION, InferredType, ReportView,
    ViewMetadata, column_annotation, describe_columns,
};
