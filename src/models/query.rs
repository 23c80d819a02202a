//! Query-related data models.
//!
//! This module defines the row representation returned by query backends and
//! the row limit applied to ad-hoc queries.

use serde_json::Value as JsonValue;

/// Default row limit for custom queries.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 1000;

/// Default response budget in characters of pretty-printed JSON.
pub const CHARACTER_LIMIT: usize = 25_000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Minimum accepted query length in characters.
pub const MIN_QUERY_CHARS: usize = 10;

/// Maximum accepted query length in characters.
pub const MAX_QUERY_CHARS: usize = 5000;

/// A single result row: field name to value, in the order the backend returned them.
pub type Row = serde_json::Map<String, JsonValue>;

/// Row limit for a custom query, always within `[1, MAX_ROW_LIMIT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLimit(u32);

impl RowLimit {
    /// Clamp an untrusted caller value into the accepted range.
    pub fn clamped(requested: u32) -> Self {
        Self(requested.clamp(1, MAX_ROW_LIMIT))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for RowLimit {
    fn default() -> Self {
        Self(DEFAULT_ROW_LIMIT)
    }
}

impl std::fmt::Display for RowLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
