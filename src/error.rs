//! Error types for the roleplay reports MCP server.
//!
//! `ReportError` covers backend, configuration and transport failures. Tool-level
//! failures never leave the facade as `ReportError`: they are converted into
//! [`ErrorEnvelope`](crate::models::ErrorEnvelope)s. Only protocol-level problems
//! reach MCP clients through the `rmcp::ErrorData` conversion below.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table, or a PostgREST code such as "PGRST202"
        code: Option<String>,
        hint: Option<String>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Unexpected response from backend: {message}")]
    Decode { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ReportError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional error code and hint.
    pub fn database(
        message: impl Into<String>,
        code: Option<String>,
        hint: Option<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            code,
            hint,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a decode error for a malformed backend response.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { hint, .. } => hint.as_deref(),
            Self::Timeout { .. } => {
                Some("Narrow the query with WHERE filters or a smaller row_limit")
            }
            _ => None,
        }
    }

    /// Message with the backend error code and hint appended, as surfaced in envelopes.
    pub fn detail(&self) -> String {
        match self {
            Self::Database {
                message,
                code,
                hint,
            } => {
                let mut detail = message.clone();
                if let Some(code) = code {
                    detail.push_str(&format!(" (code: {})", code));
                }
                if let Some(hint) = hint.as_deref().filter(|h| !h.is_empty()) {
                    detail.push_str(&format!("; hint: {}", hint));
                }
                detail
            }
            other => other.to_string(),
        }
    }
}

/// Convert sqlx errors to ReportError.
impl From<sqlx::Error> for ReportError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => ReportError::connection(
                msg.to_string(),
                "Check the DATABASE_URL format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let hint = db_err
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.hint())
                    .map(str::to_string);
                ReportError::database(db_err.message(), db_err.code().map(|c| c.to_string()), hint)
            }
            sqlx::Error::PoolTimedOut => ReportError::connection(
                "Timed out waiting for a pooled connection",
                "Raise --max-connections or --connect-timeout",
            ),
            sqlx::Error::PoolClosed => {
                ReportError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => ReportError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => ReportError::connection(
                format!("TLS error: {}", tls_err),
                "Build with the tls-native or tls-rustls feature and verify certificates",
            ),
            sqlx::Error::Protocol(msg) => ReportError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                ReportError::decode(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => ReportError::decode(source.to_string()),
            _ => ReportError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert HTTP client errors to ReportError.
impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReportError::connection(
                format!("Backend request timed out: {}", err),
                "Narrow the query with WHERE filters or raise --query-timeout",
            )
        } else if err.is_connect() {
            ReportError::connection(
                format!("Failed to reach backend: {}", err),
                "Check SUPABASE_URL and network connectivity",
            )
        } else if err.is_decode() {
            ReportError::decode(err.to_string())
        } else {
            ReportError::connection(
                format!("Backend request failed: {}", err),
                "Check SUPABASE_URL and SUPABASE_ANON_KEY",
            )
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::internal(format!("JSON serialization failed: {}", err))
    }
}

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert ReportError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<ReportError> for rmcp::ErrorData {
    fn from(err: ReportError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            ReportError::InvalidInput { .. } => rmcp::ErrorData::invalid_params(err.to_string(), data),
            ReportError::Database { .. } => rmcp::ErrorData::invalid_params(err.detail(), data),
            ReportError::Connection { .. }
            | ReportError::Timeout { .. }
            | ReportError::Decode { .. }
            | ReportError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), data)
            }
        }
    }
}
