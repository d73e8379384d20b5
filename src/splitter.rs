//! Recovery of malformed two-part report exports.
//!
//! App Store Connect finance exports concatenate two tab-separated tables
//! with a `Total_Rows<TAB>n` line between them. [`recover`] takes such a
//! payload apart again. When no sentinel line is present the payload is
//! split positionally at its midpoint, and the sentinel value becomes the
//! row count of the first table.
//!
//! Everything in this module is pure: no I/O, no shared state.

use crate::error::SplitError;
use crate::table::{FIELD_SEPARATOR, Table};

/// Sentinel label used by every App Store Connect export seen so far.
pub(crate) const DEFAULT_SENTINEL_LABEL: &str = "Total_Rows";

/// The two tables and sentinel payload recovered from one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecoveryResult {
    /// Table preceding the sentinel line.
    pub(crate) first_table: Table,
    /// Payload of the sentinel line, or the first table's row count when
    /// the payload was split positionally.
    pub(crate) sentinel_value: String,
    /// Table following the sentinel line. Empty when nothing follows it.
    pub(crate) second_table: Table,
}

/// Recovers both tables and the sentinel value from `raw_text`.
///
/// Blank lines are dropped and every line is trimmed before the search.
/// The sentinel is the first line starting with `sentinel_label`.
///
/// # Errors
///
/// - [`SplitError::EmptyInput`] if no non-blank line remains.
/// - [`SplitError::MalformedSentinel`] if the sentinel line has no second
///   tab-separated field.
/// - [`SplitError::RowArityMismatch`] if a data row is wider than its
///   header.
pub(crate) fn recover(raw_text: &str, sentinel_label: &str) -> Result<RecoveryResult, SplitError> {
    let lines: Vec<&str> = raw_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(SplitError::EmptyInput);
    }

    match lines
        .iter()
        .position(|line| line.starts_with(sentinel_label))
    {
        Some(index) => split_at_sentinel(&lines, index),
        None => split_at_midpoint(&lines),
    }
}

/// Splits around the sentinel line at `index`.
fn split_at_sentinel(lines: &[&str], index: usize) -> Result<RecoveryResult, SplitError> {
    // A sentinel on line 0 still serves as the first table's header.
    let first_end = index.max(1);
    let first_table = parse_section(lines.get(..first_end).unwrap_or_default(), 0)?;

    let sentinel = lines.get(index).copied().unwrap_or_default();
    let sentinel_value = sentinel
        .split(FIELD_SEPARATOR)
        .nth(1)
        .ok_or_else(|| SplitError::MalformedSentinel {
            line: sentinel.to_owned(),
        })?
        .to_owned();

    let second_start = index.saturating_add(1);
    let second_table = parse_section(lines.get(second_start..).unwrap_or_default(), second_start)?;

    Ok(RecoveryResult {
        first_table,
        sentinel_value,
        second_table,
    })
}

/// Splits at the midpoint when no sentinel line exists.
fn split_at_midpoint(lines: &[&str]) -> Result<RecoveryResult, SplitError> {
    #[allow(clippy::integer_division, reason = "floor of the halved line count")]
    let midpoint = lines.len() / 2;
    if midpoint == 0 {
        return Ok(RecoveryResult {
            first_table: Table::empty(),
            sentinel_value: "0".to_owned(),
            second_table: Table::empty(),
        });
    }

    let first_table = parse_section(lines.get(..midpoint).unwrap_or_default(), 0)?;
    let second_table = parse_section(lines.get(midpoint..).unwrap_or_default(), midpoint)?;
    Ok(RecoveryResult {
        sentinel_value: first_table.len().to_string(),
        first_table,
        second_table,
    })
}

/// Parses a header-led run of lines starting at 0-based `start` in the input.
fn parse_section(section: &[&str], start: usize) -> Result<Table, SplitError> {
    match section.split_first() {
        Some((header, data)) => Table::parse(header, data, start.saturating_add(2)),
        None => Ok(Table::empty()),
    }
}

/// Splits `text` around the first occurrence of `keyword`.
///
/// The keyword may occur anywhere, not only at a line start, and is
/// dropped from both halves. Returns `None` when the keyword is absent
/// or empty; callers treat that as "nothing to split".
pub(crate) fn split_on_keyword<'text>(
    text: &'text str,
    keyword: &str,
) -> Option<(&'text str, &'text str)> {
    if keyword.is_empty() {
        return None;
    }
    text.split_once(keyword)
}

/// Removes sentinel lines such as `Total_Rows\t42` and blank lines.
///
/// The label match ignores ASCII case; the payload must be a run of
/// decimal digits. The result is trimmed.
pub(crate) fn remove_sentinel_lines(content: &str, label: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_sentinel_line(line, label))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Returns `true` for `<label> <digits>` with any surrounding whitespace.
fn is_sentinel_line(line: &str, label: &str) -> bool {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(name), Some(count), None) => {
            name.eq_ignore_ascii_case(label) && count.bytes().all(|byte| byte.is_ascii_digit())
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use super::{DEFAULT_SENTINEL_LABEL, recover, remove_sentinel_lines, split_on_keyword};
    use crate::error::SplitError;
    use crate::table::Table;

    const WITH_SENTINEL: &str = "H1\tH2\na\tb\nTotal_Rows\t2\nH3\tH4\nc\td";

    fn values<'table>(table: &'table Table, column: &str) -> Vec<&'table str> {
        table
            .records()
            .map(|record| record.get(column).unwrap_or_default())
            .collect()
    }

    #[test]
    fn sentinel_separates_both_tables() {
        let result = recover(WITH_SENTINEL, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result.first_table.columns(), ["H1", "H2"]);
        assert_eq!(values(&result.first_table, "H1"), ["a"]);
        assert_eq!(values(&result.first_table, "H2"), ["b"]);
        assert_eq!(result.sentinel_value, "2");
        assert_eq!(result.second_table.columns(), ["H3", "H4"]);
        assert_eq!(values(&result.second_table, "H3"), ["c"]);
        assert_eq!(values(&result.second_table, "H4"), ["d"]);
    }

    #[test]
    fn blank_lines_and_padding_whitespace_are_ignored() {
        let raw = "\n  H1\tH2  \n\n a\tb\r\nTotal_Rows\t2\n\nH3\tH4\nc\td\n\n";
        let result = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        let expected = recover(WITH_SENTINEL, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result, expected);
    }

    #[test]
    fn recovering_reserialized_output_is_stable() {
        let raw = "A\tB\tC\n1\t2\n3\t4\t5\nTotal_Rows\t2\nX\tY\nx\ty\nz";
        let first = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        let rebuilt = format!(
            "{}\n{DEFAULT_SENTINEL_LABEL}\t{}\n{}",
            first.first_table.to_tsv(),
            first.sentinel_value,
            first.second_table.to_tsv()
        );
        let second = recover(&rebuilt, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(first, second);
    }

    #[test]
    fn sentinel_on_last_line_leaves_second_table_empty() {
        let raw = "H1\tH2\na\tb\nTotal_Rows\t1";
        let result = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result.first_table.len(), 1);
        assert_eq!(result.sentinel_value, "1");
        assert_eq!(result.second_table, Table::empty());
    }

    #[test]
    fn header_right_after_sentinel_gives_header_only_table() {
        let raw = "H1\na\nTotal_Rows\t1\nH3\tH4";
        let result = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result.second_table.columns(), ["H3", "H4"]);
        assert!(result.second_table.is_empty());
    }

    #[test]
    fn sentinel_on_first_line_is_its_own_header() {
        let raw = "Total_Rows\t0\nH\nv";
        let result = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result.first_table.columns(), ["Total_Rows", "0"]);
        assert!(result.first_table.is_empty());
        assert_eq!(result.sentinel_value, "0");
        assert_eq!(values(&result.second_table, "H"), ["v"]);
    }

    #[test]
    fn sentinel_without_payload_is_malformed() {
        let raw = "H1\na\nTotal_Rows\nH2\nb";
        let err = recover(raw, DEFAULT_SENTINEL_LABEL).expect_err("should fail");
        assert_eq!(
            err,
            SplitError::MalformedSentinel {
                line: "Total_Rows".to_owned(),
            }
        );
    }

    #[test]
    fn sentinel_label_is_case_sensitive() {
        let raw = "H1\na\ntotal_rows\t1\nH2\nb";
        let result = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        // No sentinel found: five lines split after the second.
        assert_eq!(result.first_table.columns(), ["H1"]);
        assert_eq!(result.sentinel_value, "1");
        assert_eq!(result.second_table.columns(), ["total_rows", "1"]);
    }

    #[test]
    fn custom_label_is_honoured() {
        let raw = "H1\na\nROWS\t7\nH2\nb";
        let result = recover(raw, "ROWS").expect("should recover");
        assert_eq!(result.sentinel_value, "7");
        assert_eq!(values(&result.second_table, "H2"), ["b"]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            recover("", DEFAULT_SENTINEL_LABEL),
            Err(SplitError::EmptyInput)
        );
        assert_eq!(
            recover(" \n\t\n  ", DEFAULT_SENTINEL_LABEL),
            Err(SplitError::EmptyInput)
        );
    }

    #[test]
    fn single_line_without_sentinel_is_degenerate() {
        let result = recover("H1\tH2", DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result.first_table, Table::empty());
        assert_eq!(result.sentinel_value, "0");
        assert_eq!(result.second_table, Table::empty());
    }

    #[test]
    fn four_lines_without_sentinel_split_at_midpoint() {
        let raw = "H1\tH2\na\tb\nH3\tH4\nc\td";
        let result = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result.first_table.columns(), ["H1", "H2"]);
        assert_eq!(values(&result.first_table, "H2"), ["b"]);
        assert_eq!(result.sentinel_value, "1");
        assert_eq!(result.second_table.columns(), ["H3", "H4"]);
        assert_eq!(values(&result.second_table, "H3"), ["c"]);
    }

    #[test]
    fn odd_line_count_puts_extra_line_in_second_table() {
        let raw = "H1\na\nH2\nb\nc";
        let result = recover(raw, DEFAULT_SENTINEL_LABEL).expect("should recover");
        assert_eq!(result.first_table.len(), 1);
        assert_eq!(result.sentinel_value, "1");
        assert_eq!(values(&result.second_table, "H2"), ["b", "c"]);
    }

    #[test]
    fn wide_row_reports_its_line_number() {
        let raw = "H1\na\nTotal_Rows\t1\nH2\nb\tc";
        let err = recover(raw, DEFAULT_SENTINEL_LABEL).expect_err("should fail");
        assert_eq!(
            err,
            SplitError::RowArityMismatch {
                line: 5,
                expected: 1,
                found: 2,
            }
        );
    }

    #[test]
    fn keyword_split_drops_keyword() {
        assert_eq!(
            split_on_keyword("AAAkeywordBBB", "keyword"),
            Some(("AAA", "BBB"))
        );
    }

    #[test]
    fn keyword_split_uses_first_occurrence() {
        assert_eq!(split_on_keyword("a-b-c", "-"), Some(("a", "b-c")));
    }

    #[test]
    fn missing_keyword_is_not_found() {
        assert_eq!(split_on_keyword("AAABBB", "zzz"), None);
        assert_eq!(split_on_keyword("AAABBB", ""), None);
    }

    #[test]
    fn sentinel_lines_are_stripped() {
        let content = "H1\tH2\na\tb\n  total_rows   12 \n\n\nH3\nc\nTotal_Rows\tx\n";
        assert_eq!(
            remove_sentinel_lines(content, DEFAULT_SENTINEL_LABEL),
            "H1\tH2\na\tb\nH3\nc\nTotal_Rows\tx"
        );
    }
}
