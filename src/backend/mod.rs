//! Query execution backends.
//!
//! The report tools only need "run this SELECT text and give me the rows back".
//! [`QueryBackend`] captures that seam so the tools can be driven by either the
//! Supabase RPC endpoint or a direct PostgreSQL pool, and by scripted backends in tests.

use crate::error::{ReportError, ReportResult};
use crate::models::Row;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub mod postgres;
pub mod supabase;

pub use postgres::PostgresBackend;
pub use supabase::SupabaseBackend;

/// A read-only SQL executor returning rows as ordered JSON objects.
///
/// Implementations are shared across concurrent tool calls behind an `Arc`.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Execute a single SELECT statement and return its rows in backend order.
    async fn execute_sql(&self, sql: &str) -> ReportResult<Vec<Row>>;

    /// Release connections held by the backend. Called once on shutdown.
    async fn close(&self) {}
}

/// Interpret a JSON result set: an array of objects, or `null` for no rows.
pub(crate) fn rows_from_json(value: JsonValue) -> ReportResult<Vec<Row>> {
    match value {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                JsonValue::Object(row) => Ok(row),
                other => Err(ReportError::decode(format!(
                    "row {} is not an object: {}",
                    index,
                    json_kind(&other)
                ))),
            })
            .collect(),
        other => Err(ReportError::decode(format!(
            "expected an array of rows, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
