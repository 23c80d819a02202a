//! Response size shaping.
//!
//! Tool results are returned as pretty-printed JSON text. The shaper measures that
//! text in characters (non-ASCII kept literal, so `餐厅` counts as two) and drops
//! trailing rows until the rendered response fits the character budget.
//!
//! The prefix search assumes the rendered size never shrinks when a row is added.
//! That holds for row lists because earlier rows are never rewritten; the only
//! other field that depends on the prefix length is a row count, which grows with it.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::io;

/// `io::Write` sink that counts UTF-8 scalar values instead of storing bytes.
#[derive(Debug, Default)]
struct CharCounter {
    chars: usize,
}

impl io::Write for CharCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Every scalar value has exactly one non-continuation byte.
        self.chars += buf.iter().filter(|b| (**b & 0xC0) != 0x80).count();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Number of characters in the pretty-printed JSON form of `value`.
///
/// Equal to `serde_json::to_string_pretty(value)?.chars().count()` without
/// building the string.
pub fn rendered_len<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<usize> {
    let mut counter = CharCounter::default();
    serde_json::to_writer_pretty(&mut counter, value)?;
    Ok(counter.chars)
}

/// Largest `k` in `1..=len` for which `fits(k)` holds, found by binary search.
///
/// Returns 1 when no prefix fits, and 0 only when `len` is 0. `fits` must be
/// monotone: once false for some `k` it stays false for every larger `k`.
pub fn largest_fitting_prefix<E>(
    len: usize,
    mut fits: impl FnMut(usize) -> Result<bool, E>,
) -> Result<usize, E> {
    if len == 0 {
        return Ok(0);
    }

    let (mut lo, mut hi) = (1, len);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if fits(mid)? {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Ok(lo)
}

/// Result of fitting a row list into an envelope.
#[derive(Debug, Clone)]
pub struct Shaped<E> {
    pub envelope: E,
    pub truncated: bool,
    /// Rows kept in `envelope`
    pub kept: usize,
}

/// Build the largest envelope around a prefix of `rows` that renders within `max_chars`.
///
/// `build(prefix, truncated)` assembles the envelope; when `truncated` is true it is
/// expected to add its truncation markers, and those markers count against the budget.
/// If the full envelope fits it is returned untouched. Otherwise the longest fitting
/// prefix is kept; when even a single row does not fit, one row is kept anyway. With
/// zero or one rows nothing can be dropped and the envelope is returned flagged.
pub fn fit_rows<T, E, B>(rows: &[T], max_chars: usize, build: B) -> serde_json::Result<Shaped<E>>
where
    E: Serialize,
    B: Fn(&[T], bool) -> E,
{
    let full = build(rows, false);
    if rendered_len(&full)? <= max_chars {
        return Ok(Shaped {
            envelope: full,
            truncated: false,
            kept: rows.len(),
        });
    }

    if rows.len() <= 1 {
        return Ok(Shaped {
            envelope: build(rows, true),
            truncated: true,
            kept: rows.len(),
        });
    }

    let kept = largest_fitting_prefix(rows.len(), |k| {
        rendered_len(&build(&rows[..k], true)).map(|len| len <= max_chars)
    })?;

    Ok(Shaped {
        envelope: build(&rows[..kept], true),
        truncated: true,
        kept,
    })
}

/// Shape a bare JSON payload to `max_chars`.
///
/// Arrays shrink to their longest fitting prefix (at least one element). Any other
/// payload, or a single-element array, is returned unchanged and flagged when it is
/// over budget.
///
/// # Examples
///
/// ```
/// use roleplay_reports_mcp::tools::shaper::shape;
/// use serde_json::json;
///
/// let (small, truncated) = shape(json!([1, 2, 3]), 1_000).unwrap();
/// assert_eq!(small, json!([1, 2, 3]));
/// assert!(!truncated);
///
/// let (shrunk, truncated) = shape(json!(["aaaa", "bbbb", "cccc"]), 25).unwrap();
/// assert_eq!(shrunk, json!(["aaaa", "bbbb"]));
/// assert!(truncated);
/// ```
pub fn shape(payload: JsonValue, max_chars: usize) -> serde_json::Result<(JsonValue, bool)> {
    match payload {
        JsonValue::Array(items) => {
            let shaped = fit_rows(&items, max_chars, |prefix, _| prefix.to_vec())?;
            Ok((JsonValue::Array(shaped.envelope), shaped.truncated))
        }
        other => {
            let truncated = rendered_len(&other)? > max_chars;
            Ok((other, truncated))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rendered_len_matches_pretty_string() {
        let value = json!({"餐厅完整名称": "测试餐厅", "总体任务完成率": 0.95, "rows": [1, 2]});
        let expected = serde_json::to_string_pretty(&value).unwrap().chars().count();
        assert_eq!(rendered_len(&value).unwrap(), expected);
    }

    #[test]
    fn test_rendered_len_counts_chars_not_bytes() {
        // "\"餐厅\"" is 4 characters but 8 bytes.
        assert_eq!(rendered_len(&json!("餐厅")).unwrap(), 4);
    }

    #[test]
    fn test_rendered_len_keeps_non_ascii_literal() {
        let text = serde_json::to_string_pretty(&json!("运营日期")).unwrap();
        assert_eq!(text, "\"运营日期\"");
    }

    #[test]
    fn test_largest_fitting_prefix_bounds() {
        let fits = |limit: usize| move |k: usize| Ok::<_, ()>(k <= limit);
        assert_eq!(largest_fitting_prefix(10, fits(10)), Ok(10));
        assert_eq!(largest_fitting_prefix(10, fits(7)), Ok(7));
        assert_eq!(largest_fitting_prefix(10, fits(1)), Ok(1));
        // Nothing fits: floor at one.
        assert_eq!(largest_fitting_prefix(10, fits(0)), Ok(1));
        assert_eq!(largest_fitting_prefix(0, fits(5)), Ok(0));
    }

    #[test]
    fn test_largest_fitting_prefix_propagates_error() {
        let result = largest_fitting_prefix(8, |k| if k > 2 { Err("boom") } else { Ok(true) });
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn test_shape_within_budget_unchanged() {
        let payload = json!([{"a": 1}, {"a": 2}]);
        let budget = rendered_len(&payload).unwrap();
        let (shaped, truncated) = shape(payload.clone(), budget).unwrap();
        assert_eq!(shaped, payload);
        assert!(!truncated);
    }

    #[test]
    fn test_shape_one_over_budget_drops_last() {
        let payload = json!([{"a": 1}, {"a": 2}]);
        let budget = rendered_len(&payload).unwrap() - 1;
        let (shaped, truncated) = shape(payload, budget).unwrap();
        assert_eq!(shaped, json!([{"a": 1}]));
        assert!(truncated);
    }

    #[test]
    fn test_shape_keeps_one_element_when_nothing_fits() {
        let (shaped, truncated) = shape(json!(["long value", "another"]), 3).unwrap();
        assert_eq!(shaped, json!(["long value"]));
        assert!(truncated);
    }

    #[test]
    fn test_shape_single_element_flagged_unchanged() {
        let payload = json!([{"note": "far too long for the budget"}]);
        let (shaped, truncated) = shape(payload.clone(), 5).unwrap();
        assert_eq!(shaped, payload);
        assert!(truncated);
    }

    #[test]
    fn test_shape_scalar_over_budget_flagged_unchanged() {
        let (shaped, truncated) = shape(json!("a long string"), 4).unwrap();
        assert_eq!(shaped, json!("a long string"));
        assert!(truncated);

        let (_, truncated) = shape(json!(42), 4).unwrap();
        assert!(!truncated);
    }

    #[derive(Serialize)]
    struct Wrapped {
        count: usize,
        items: Vec<u32>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        truncated: bool,
    }

    #[test]
    fn test_fit_rows_counts_markers_against_budget() {
        let rows: Vec<u32> = (0..50).collect();
        let build = |prefix: &[u32], truncated: bool| Wrapped {
            count: prefix.len(),
            items: prefix.to_vec(),
            truncated,
        };
        let budget = 120;
        let shaped = fit_rows(&rows, budget, build).unwrap();

        assert!(shaped.truncated);
        assert!(shaped.envelope.truncated);
        assert_eq!(shaped.envelope.items.len(), shaped.kept);
        assert!(rendered_len(&shaped.envelope).unwrap() <= budget);
        // One more row would not fit.
        let bigger = build(&rows[..shaped.kept + 1], true);
        assert!(rendered_len(&bigger).unwrap() > budget);
    }

    #[test]
    fn test_fit_rows_empty_list_over_budget() {
        let rows: Vec<u32> = Vec::new();
        let shaped = fit_rows(&rows, 0, |prefix, _| prefix.to_vec()).unwrap();
        assert!(shaped.truncated);
        assert_eq!(shaped.kept, 0);
    }
}
