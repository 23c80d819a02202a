//! Response envelopes returned by every report tool.
//!
//! Success envelopes are tool-specific structs; failures share [`ErrorEnvelope`].
//! Both serialize with a leading `success` flag so callers can branch on it.

use crate::models::query::Row;
use crate::models::schema::{ColumnDescriptor, ViewMetadata};
use serde::Serialize;

/// Kind of failure reported in an error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The query failed the SELECT-only allow-list.
    QueryValidationError,
    /// The backend call failed (connectivity, SQL rejected, permission, timeout).
    DatabaseError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueryValidationError => write!(f, "QueryValidationError"),
            Self::DatabaseError => write!(f, "DatabaseError"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// `{success: false, error: {type, message, suggestion?}}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>, suggestion: Option<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                kind,
                message: message.into(),
                suggestion,
            },
        }
    }

    /// Create a query validation error with a corrective suggestion.
    pub fn query_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::QueryValidationError,
            message,
            Some(suggestion.into()),
        )
    }

    /// Create a database error with a remediation hint.
    pub fn database(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError, message, Some(suggestion.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind
    }
}

/// Flag and explanation appended to an envelope whose payload was shrunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncationNotice {
    #[serde(rename = "_truncated")]
    pub truncated: bool,
    #[serde(rename = "_message")]
    pub message: String,
}

impl TruncationNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            truncated: true,
            message: message.into(),
        }
    }
}

/// Success envelope of `execute_custom_query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryEnvelope {
    pub success: bool,
    /// Executed query text, with the enforced LIMIT
    pub query: String,
    /// Number of rows in `data`
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub data: Vec<Row>,
    #[serde(flatten)]
    pub truncation: Option<TruncationNotice>,
}

/// Success envelope of `get_view_schema_and_samples`.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaEnvelope {
    pub success: bool,
    pub view_name: String,
    pub description: String,
    pub columns: Vec<ColumnDescriptor>,
    pub sample_data: Vec<Row>,
    pub metadata: ViewMetadata,
    pub usage_hints: Vec<String>,
    #[serde(flatten)]
    pub truncation: Option<TruncationNotice>,
}
