//! SELECT-only query guard for the custom query tool.
//!
//! The guard is a syntactic allow-list: the statement must start with `SELECT` and
//! must not contain any denylisted keyword as a standalone word. It does not parse
//! SQL, so keywords hidden by comments or string concatenation tricks are outside
//! what it can judge; keywords inside string literals or quoted identifiers are
//! rejected just like bare ones. The backend's read-only role remains the
//! authoritative safety layer.

use regex::Regex;
use std::sync::LazyLock;

/// Keywords that may not appear as standalone words, checked in this order.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT",
    "UPDATE",
    "DELETE",
    "DROP",
    "ALTER",
    "CREATE",
    "TRUNCATE",
    "GRANT",
    "REVOKE",
    "EXEC",
    "EXECUTE",
    "PROCEDURE",
    "FUNCTION",
    "TRIGGER",
    "INDEX",
    "VIEW",
    "SCHEMA",
    "DATABASE",
    "TABLE",
    "COLUMN",
    "INTO",
];

/// One word-boundary pattern per keyword, in denylist order.
static KEYWORD_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    FORBIDDEN_KEYWORDS
        .iter()
        .map(|keyword| {
            let pattern = format!(r"\b{}\b", regex::escape(keyword));
            // Patterns are built from the constant list above.
            let regex = Regex::new(&pattern).expect("keyword pattern is valid");
            (*keyword, regex)
        })
        .collect()
});

/// Reason a query was rejected by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    /// The statement does not start with SELECT.
    NotSelect,
    /// The statement contains a denylisted keyword.
    ForbiddenKeyword(&'static str),
}

impl GuardRejection {
    /// The keyword that triggered the rejection, if any.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::NotSelect => None,
            Self::ForbiddenKeyword(keyword) => Some(*keyword),
        }
    }
}

impl std::fmt::Display for GuardRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSelect => write!(
                f,
                "Only SELECT queries are allowed. Your query must start with SELECT."
            ),
            Self::ForbiddenKeyword(keyword) => write!(
                f,
                "Keyword '{}' is not allowed. Only read-only SELECT queries are permitted.",
                keyword
            ),
        }
    }
}

/// Validate that a query is a read-only SELECT statement.
///
/// Matching is case-insensitive. Keywords are scanned in [`FORBIDDEN_KEYWORDS`]
/// order and the first one present is reported.
///
/// # Examples
///
/// ```
/// use roleplay_reports_mcp::tools::guard::{GuardRejection, validate_query};
///
/// assert!(validate_query("SELECT * FROM roleplay_daily_reports").is_ok());
/// assert_eq!(
///     validate_query("DROP TABLE x"),
///     Err(GuardRejection::NotSelect)
/// );
/// assert_eq!(
///     validate_query("SELECT * FROM t; DROP TABLE t"),
///     Err(GuardRejection::ForbiddenKeyword("DROP"))
/// );
/// ```
pub fn validate_query(query: &str) -> Result<(), GuardRejection> {
    let normalized = query.trim().to_uppercase();

    if !normalized.starts_with("SELECT") {
        return Err(GuardRejection::NotSelect);
    }

    match KEYWORD_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&normalized))
    {
        Some((keyword, _)) => Err(GuardRejection::ForbiddenKeyword(*keyword)),
        None => Ok(()),
    }
}
