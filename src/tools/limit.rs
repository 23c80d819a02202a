//! Row limit enforcement for guarded queries.
//!
//! Rewrites a query so that its LIMIT clause never exceeds the requested row
//! limit. Only the first `LIMIT` clause found in the query's code is considered;
//! a LIMIT inside a subquery or CTE is treated exactly like an outer one. Text in
//! string literals, quoted identifiers and comments is never taken for a clause.

use crate::models::RowLimit;
use regex::Regex;
use std::sync::LazyLock;

/// `LIMIT <digits>` or `LIMIT ALL`, case-insensitive, on word boundaries.
static LIMIT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bLIMIT\s+([0-9]+|ALL)\b").expect("LIMIT pattern is valid")
});

/// Lexical region of a SQL text position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    /// Inside `'...'` or `"..."`; holds the opening quote
    Quoted(char),
    LineComment,
    /// Inside `/* ... */`; Postgres block comments nest
    BlockComment(u32),
}

/// Copy of `sql` with string literals, quoted identifiers and comments replaced by
/// spaces, plus the region the text ends in.
///
/// Every character is blanked to as many spaces as its UTF-8 width, so byte
/// offsets in the copy are valid in the original.
fn blank_non_code(sql: &str) -> (String, Region) {
    let mut masked = String::with_capacity(sql.len());
    let mut region = Region::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        // Characters consumed in this step; `None` keeps the character as code.
        let blanked: Option<usize> = match region {
            Region::Code => match (c, next) {
                ('\'' | '"', _) => {
                    region = Region::Quoted(c);
                    Some(1)
                }
                ('-', Some('-')) => {
                    region = Region::LineComment;
                    Some(1)
                }
                ('/', Some('*')) => {
                    region = Region::BlockComment(1);
                    Some(2)
                }
                _ => None,
            },
            // A doubled quote is an escaped quote, not the end of the literal.
            Region::Quoted(quote) if c == quote && next == Some(quote) => Some(2),
            Region::Quoted(quote) => {
                if c == quote {
                    region = Region::Code;
                }
                Some(1)
            }
            Region::LineComment => {
                if c == '\n' {
                    region = Region::Code;
                }
                Some(1)
            }
            Region::BlockComment(depth) => match (c, next) {
                ('*', Some('/')) => {
                    region = if depth == 1 {
                        Region::Code
                    } else {
                        Region::BlockComment(depth - 1)
                    };
                    Some(2)
                }
                ('/', Some('*')) => {
                    region = Region::BlockComment(depth + 1);
                    Some(2)
                }
                _ => Some(1),
            },
        };

        match blanked {
            None => masked.push(c),
            Some(count) => {
                masked.extend(std::iter::repeat_n(' ', c.len_utf8()));
                if count == 2 {
                    if let Some(second) = chars.next() {
                        masked.extend(std::iter::repeat_n(' ', second.len_utf8()));
                    }
                }
            }
        }
    }

    (masked, region)
}

/// Ensure the query cannot return more than `limit` rows through its LIMIT clause.
///
/// - An existing `LIMIT n` with `n <= limit` is left untouched.
/// - An existing `LIMIT n` with `n > limit`, or `LIMIT ALL`, becomes `LIMIT {limit}`.
/// - Otherwise one trailing `;` is dropped and ` LIMIT {limit}` is appended. When
///   the query ends in a `--` comment the clause goes on a new line instead.
///
/// The function is idempotent for a fixed `limit`.
///
/// # Examples
///
/// ```
/// use roleplay_reports_mcp::models::RowLimit;
/// use roleplay_reports_mcp::tools::limit::enforce_limit;
///
/// let limit = RowLimit::clamped(100);
/// assert_eq!(enforce_limit("SELECT 1;", limit), "SELECT 1 LIMIT 100");
/// assert_eq!(enforce_limit("SELECT * FROM t LIMIT 5000", limit), "SELECT * FROM t LIMIT 100");
/// assert_eq!(enforce_limit("SELECT * FROM t LIMIT 10", limit), "SELECT * FROM t LIMIT 10");
/// assert_eq!(enforce_limit("SELECT 'limit 1'", limit), "SELECT 'limit 1' LIMIT 100");
/// ```
pub fn enforce_limit(query: &str, limit: RowLimit) -> String {
    let limit = limit.get();
    let (code, _) = blank_non_code(query);

    if let Some(captures) = LIMIT_CLAUSE.captures(&code) {
        // Digits that overflow u64 are certainly above the limit; ALL has no bound.
        let within_limit = captures[1]
            .parse::<u64>()
            .is_ok_and(|existing| existing <= u64::from(limit));
        if within_limit {
            return query.to_string();
        }

        let clause = captures.get_match();
        return format!(
            "{}LIMIT {}{}",
            &query[..clause.start()],
            limit,
            &query[clause.end()..]
        );
    }

    let trimmed = query.trim();
    let (_, tail) = blank_non_code(trimmed);
    match tail {
        Region::LineComment => format!("{}\nLIMIT {}", trimmed, limit),
        Region::Code => {
            let statement = trimmed.strip_suffix(';').unwrap_or(trimmed);
            format!("{} LIMIT {}", statement, limit)
        }
        // Unterminated literal or block comment.
        _ => format!("{} LIMIT {}", trimmed, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(n: u32) -> RowLimit {
        RowLimit::clamped(n)
    }

    #[test]
    fn test_appends_limit_when_missing() {
        assert_eq!(
            enforce_limit("SELECT * FROM roleplay_daily_reports", limit(100)),
            "SELECT * FROM roleplay_daily_reports LIMIT 100"
        );
    }

    #[test]
    fn test_strips_single_trailing_semicolon() {
        assert_eq!(enforce_limit("SELECT 1;", limit(5)), "SELECT 1 LIMIT 5");
        // Only one terminator is removed.
        assert_eq!(enforce_limit("SELECT 1;;", limit(5)), "SELECT 1; LIMIT 5");
    }

    #[test]
    fn test_trims_surrounding_whitespace_before_appending() {
        assert_eq!(
            enforce_limit("  SELECT 1 FROM t ;\n", limit(5)),
            "SELECT 1 FROM t  LIMIT 5"
        );
    }

    #[test]
    fn test_lowers_larger_limit() {
        assert_eq!(
            enforce_limit("SELECT * FROM reports LIMIT 5000", limit(100)),
            "SELECT * FROM reports LIMIT 100"
        );
    }

    #[test]
    fn test_lowercase_clause_rewritten_uppercase() {
        assert_eq!(
            enforce_limit("select * from reports limit 5000 offset 10", limit(100)),
            "select * from reports LIMIT 100 offset 10"
        );
    }

    #[test]
    fn test_keeps_smaller_or_equal_limit() {
        let sql = "SELECT * FROM reports limit 20";
        assert_eq!(enforce_limit(sql, limit(100)), sql);
        let sql = "SELECT * FROM reports LIMIT 100";
        assert_eq!(enforce_limit(sql, limit(100)), sql);
    }

    #[test]
    fn test_existing_limit_with_semicolon_untouched() {
        let sql = "SELECT * FROM reports LIMIT 10;";
        assert_eq!(enforce_limit(sql, limit(100)), sql);
    }

    #[test]
    fn test_limit_all_replaced() {
        assert_eq!(
            enforce_limit("SELECT * FROM reports LIMIT ALL", limit(50)),
            "SELECT * FROM reports LIMIT 50"
        );
    }

    #[test]
    fn test_overflowing_limit_replaced() {
        assert_eq!(
            enforce_limit("SELECT 1 LIMIT 99999999999999999999999", limit(10)),
            "SELECT 1 LIMIT 10"
        );
    }

    #[test]
    fn test_limit_inside_identifier_is_not_a_clause() {
        assert_eq!(
            enforce_limit("SELECT credit_limit FROM accounts", limit(10)),
            "SELECT credit_limit FROM accounts LIMIT 10"
        );
    }

    #[test]
    fn test_limit_word_without_number_is_not_a_clause() {
        assert_eq!(
            enforce_limit(r#"SELECT "limit" FROM quotas"#, limit(10)),
            r#"SELECT "limit" FROM quotas LIMIT 10"#
        );
    }

    #[test]
    fn test_limit_in_string_literal_is_not_a_clause() {
        let sql = r#"SELECT * FROM roleplay_daily_reports WHERE "餐厅完整名称" <> 'limit 1'"#;
        assert_eq!(enforce_limit(sql, limit(100)), format!("{} LIMIT 100", sql));
    }

    #[test]
    fn test_limit_in_quoted_identifier_is_not_a_clause() {
        assert_eq!(
            enforce_limit(r#"SELECT 1 AS "limit 10""#, limit(100)),
            r#"SELECT 1 AS "limit 10" LIMIT 100"#
        );
    }

    #[test]
    fn test_limit_in_block_comment_is_not_a_clause() {
        assert_eq!(
            enforce_limit("SELECT /* limit 5 /* nested */ */ 1", limit(100)),
            "SELECT /* limit 5 /* nested */ */ 1 LIMIT 100"
        );
    }

    #[test]
    fn test_trailing_line_comment_gets_limit_on_new_line() {
        let enforced = enforce_limit("SELECT * FROM reports -- limit 5", limit(100));
        assert_eq!(enforced, "SELECT * FROM reports -- limit 5\nLIMIT 100");
        assert_eq!(enforce_limit(&enforced, limit(100)), enforced);
    }

    #[test]
    fn test_escaped_quote_keeps_literal_open() {
        assert_eq!(
            enforce_limit("SELECT 'it''s limit 3' AS note", limit(100)),
            "SELECT 'it''s limit 3' AS note LIMIT 100"
        );
    }

    #[test]
    fn test_real_clause_after_literal_is_rewritten() {
        assert_eq!(
            enforce_limit(r#"SELECT '餐厅 limit 1' AS "运营日期" LIMIT 5000"#, limit(100)),
            r#"SELECT '餐厅 limit 1' AS "运营日期" LIMIT 100"#
        );
    }

    #[test]
    fn test_blanking_preserves_byte_offsets() {
        let sql = r#"SELECT "餐厅ID", '绵阳' -- 备注
FROM t /* 注释 */"#;
        let (masked, tail) = blank_non_code(sql);
        assert_eq!(masked.len(), sql.len());
        assert_eq!(tail, Region::Code);
        assert!(masked.starts_with("SELECT "));
        assert!(masked.contains("FROM t"));
        assert!(!masked.contains('餐'));
    }

    // Nested LIMIT semantics are undefined; these tests pin current behavior.

    #[test]
    fn test_subquery_limit_within_bound_suppresses_outer_limit() {
        let sql = "SELECT * FROM (SELECT * FROM reports LIMIT 10) t";
        assert_eq!(enforce_limit(sql, limit(100)), sql);
    }

    #[test]
    fn test_only_first_of_multiple_limits_rewritten() {
        assert_eq!(
            enforce_limit(
                "SELECT * FROM (SELECT * FROM reports LIMIT 500) t LIMIT 900",
                limit(100)
            ),
            "SELECT * FROM (SELECT * FROM reports LIMIT 100) t LIMIT 900"
        );
    }

    #[test]
    fn test_idempotent() {
        let cases = [
            "SELECT 1",
            "SELECT 1;",
            "SELECT * FROM reports LIMIT 5000",
            "SELECT * FROM reports LIMIT 3",
            "SELECT * FROM reports LIMIT ALL",
        ];
        for sql in cases {
            let once = enforce_limit(sql, limit(100));
            assert_eq!(enforce_limit(&once, limit(100)), once, "not idempotent: {}", sql);
        }
    }
}
