//! Response structs for MCP tool outputs.
//!
//! Tools that touch the filesystem or the database answer with a small
//! JSON summary instead of echoing whole reports back to the assistant.

use std::path::Path;

use serde::Serialize;

use crate::splitter::RecoveryResult;
use crate::table::{Record, Table};

/// Rows of each recovered table echoed back in a split summary.
pub(crate) const PREVIEW_ROWS: usize = 5;

/// A report downloaded and written to disk.
#[derive(Debug, Serialize)]
pub(crate) struct SavedReportResponse {
    /// Absolute path of the saved file.
    pub(crate) path: String,
    /// Size of the decompressed report in bytes.
    pub(crate) bytes: usize,
    /// Number of non-blank lines in the report.
    pub(crate) lines: usize,
}

impl SavedReportResponse {
    /// Describes `data` saved at `path`.
    pub(crate) fn new(path: &Path, data: &str) -> Self {
        Self {
            path: path.display().to_string(),
            bytes: data.len(),
            lines: data.lines().filter(|line| !line.trim().is_empty()).count(),
        }
    }
}

/// One recovered table and where it was written.
#[derive(Debug, Serialize)]
pub(crate) struct TableSummary<'table> {
    /// Output file path.
    pub(crate) path: String,
    /// Header names, in order.
    pub(crate) columns: &'table [String],
    /// Number of data rows.
    pub(crate) rows: usize,
    /// Leading rows as column-keyed objects.
    pub(crate) preview: Vec<Record<'table>>,
}

impl<'table> TableSummary<'table> {
    /// Summarises `table` written to `path`.
    pub(crate) fn new(path: &Path, table: &'table Table) -> Self {
        Self {
            path: path.display().to_string(),
            columns: table.columns(),
            rows: table.len(),
            preview: table.records().take(PREVIEW_ROWS).collect(),
        }
    }
}

/// Outcome of the `split_report_file` tool.
#[derive(Debug, Serialize)]
pub(crate) struct SplitReportResponse<'table> {
    /// Payload of the sentinel line, or the first table's row count when
    /// no sentinel was found.
    pub(crate) sentinel_value: String,
    /// Table before the sentinel.
    pub(crate) first: TableSummary<'table>,
    /// Table after the sentinel.
    pub(crate) second: TableSummary<'table>,
}

impl<'table> SplitReportResponse<'table> {
    /// Summarises `result` whose tables were written to the given paths.
    pub(crate) fn new(
        result: &'table RecoveryResult,
        first_path: &Path,
        second_path: &Path,
    ) -> Self {
        Self {
            sentinel_value: result.sentinel_value.clone(),
            first: TableSummary::new(first_path, &result.first_table),
            second: TableSummary::new(second_path, &result.second_table),
        }
    }
}

/// Outcome of the `split_file_by_keyword` tool.
#[derive(Debug, Serialize)]
pub(crate) struct KeywordSplitResponse {
    /// The keyword searched for.
    pub(crate) keyword: String,
    /// Whether the keyword occurred and files were written.
    pub(crate) split: bool,
    /// Path of the text before the keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) first_path: Option<String>,
    /// Path of the text after the keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) second_path: Option<String>,
}

impl KeywordSplitResponse {
    /// Both halves were written.
    pub(crate) fn written(keyword: &str, first_path: &Path, second_path: &Path) -> Self {
        Self {
            keyword: keyword.to_owned(),
            split: true,
            first_path: Some(first_path.display().to_string()),
            second_path: Some(second_path.display().to_string()),
        }
    }

    /// The keyword was absent; nothing was written.
    pub(crate) fn not_found(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_owned(),
            split: false,
            first_path: None,
            second_path: None,
        }
    }
}

/// Outcome of the `load_report_to_postgresql` tool.
#[derive(Debug, Serialize)]
pub(crate) struct LoadReportResponse {
    /// Target database.
    pub(crate) dbname: String,
    /// Target table.
    pub(crate) table_name: String,
    /// Rows inserted.
    pub(crate) rows: usize,
    /// Columns written, including `hash` when requested.
    pub(crate) columns: Vec<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::{
        KeywordSplitResponse, PREVIEW_ROWS, SavedReportResponse, SplitReportResponse, TableSummary,
    };
    use crate::splitter::recover;
    use crate::table::Table;

    #[test]
    fn saved_report_counts_lines() {
        let response = SavedReportResponse::new(Path::new("/data/a.csv"), "A\tB\n\n1\t2\n");
        assert_eq!(response.path, "/data/a.csv");
        assert_eq!(response.bytes, 9);
        assert_eq!(response.lines, 2);
    }

    #[test]
    fn split_response_summarises_both_tables() {
        let result = recover("A\tB\n1\t2\nTotal_Rows\t1\nC\n3\n4", "Total_Rows")
            .expect("should recover");
        let response = SplitReportResponse::new(
            &result,
            Path::new("/data/r_part1.csv"),
            Path::new("/data/r_part2.csv"),
        );
        let value = serde_json::to_value(&response).expect("should serialize");
        assert_eq!(
            value,
            json!({
                "sentinel_value": "1",
                "first": {
                    "path": "/data/r_part1.csv",
                    "columns": ["A", "B"],
                    "rows": 1,
                    "preview": [{"A": "1", "B": "2"}]
                },
                "second": {
                    "path": "/data/r_part2.csv",
                    "columns": ["C"],
                    "rows": 2,
                    "preview": [{"C": "3"}, {"C": "4"}]
                }
            })
        );
    }

    #[test]
    fn preview_is_capped() {
        let data: Vec<String> = (0..20).map(|row| row.to_string()).collect();
        let lines: Vec<&str> = data.iter().map(String::as_str).collect();
        let table = Table::parse("N", &lines, 2).expect("should parse");
        let summary = TableSummary::new(Path::new("/data/n.csv"), &table);
        assert_eq!(summary.rows, 20);
        assert_eq!(summary.preview.len(), PREVIEW_ROWS);
        assert_eq!(summary.preview.first().and_then(|record| record.get("N")), Some("0"));
    }

    #[test]
    fn keyword_not_found_omits_paths() {
        let value = serde_json::to_value(KeywordSplitResponse::not_found("Country Of Sale"))
            .expect("should serialize");
        assert_eq!(value, json!({"keyword": "Country Of Sale", "split": false}));
    }

    #[test]
    fn keyword_split_lists_paths() {
        let response = KeywordSplitResponse::written(
            "Country Of Sale",
            Path::new("/data/f_part1.csv"),
            Path::new("/data/f_part2.csv"),
        );
        assert!(response.split);
        assert_eq!(response.first_path.as_deref(), Some("/data/f_part1.csv"));
        assert_eq!(response.second_path.as_deref(), Some("/data/f_part2.csv"));
    }
}
