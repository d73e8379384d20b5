//! Parameter structs for MCP tool inputs.
//!
//! Each struct derives [`serde::Deserialize`] and [`schemars::JsonSchema`]
//! so that `rmcp` can auto-generate JSON schemas for tool parameters.

use schemars::JsonSchema;
use serde::Deserialize;

/// Default sales report family.
fn default_report_type() -> String {
    "SALES".to_owned()
}

/// Default sales report detail level.
fn default_report_subtype() -> String {
    "SUMMARY".to_owned()
}

/// Default sales report period.
fn default_frequency() -> String {
    "DAILY".to_owned()
}

/// Default finance region (all regions).
fn default_region_code() -> String {
    "ZZ".to_owned()
}

/// Parameters for the `get_appstore_sales_report` and
/// `download_appstore_sales_data` tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct SalesReportParams {
    /// Report family, e.g. `SALES`, `SUBSCRIPTION`, `INSTALLS`.
    #[serde(default = "default_report_type")]
    pub(crate) report_type: String,
    /// Detail level, e.g. `SUMMARY` or `DETAILED`.
    #[serde(default = "default_report_subtype")]
    pub(crate) report_subtype: String,
    /// `DAILY`, `WEEKLY`, `MONTHLY` or `YEARLY`.
    #[serde(default = "default_frequency")]
    pub(crate) frequency: String,
    /// Report date (`YYYY-MM-DD`, or `YYYY-MM` for monthly). Empty for the
    /// most recent report.
    #[serde(default)]
    pub(crate) report_date: String,
}

/// Parameters for the `get_appstore_finance_report` and
/// `download_appstore_finance_data` tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct FinanceReportParams {
    /// Region code; `ZZ` covers all regions.
    #[serde(default = "default_region_code")]
    pub(crate) region_code: String,
    /// Fiscal month, format `YYYY-MM`.
    pub(crate) report_date: String,
}

/// Parameters for the `split_report_file` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct SplitReportParams {
    /// Path to a `.csv` or `.txt` report export.
    pub(crate) file_path: String,
}

/// Parameters for the `split_file_by_keyword` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct SplitByKeywordParams {
    /// Path to a `.csv` or `.txt` file.
    pub(crate) file_path: String,
    /// Text to split at; its first occurrence is removed.
    pub(crate) keyword: String,
    /// If `true`, drop `Total_Rows` style lines before splitting.
    #[serde(default)]
    pub(crate) strip_sentinel: bool,
}

/// Which recovered table to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TablePart {
    /// Table before the sentinel line.
    #[default]
    First,
    /// Table after the sentinel line.
    Second,
}

/// Parameters for the `load_report_to_postgresql` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct LoadReportParams {
    /// Path to a `.csv` or `.txt` report export.
    pub(crate) file_path: String,
    /// Target database; created if missing.
    pub(crate) dbname: String,
    /// Target table in the `public` schema.
    pub(crate) table_name: String,
    /// `append` (default), `replace` or `fail`.
    pub(crate) if_exists: Option<String>,
    /// `first` (default) or `second`.
    #[serde(default)]
    pub(crate) part: TablePart,
    /// Columns whose values feed a `hash` column. No hash when omitted.
    pub(crate) hash_columns: Option<Vec<String>>,
    /// `md5` (default), `sha1`, `sha224`, `sha256`, `sha384` or `sha512`.
    pub(crate) hash_algorithm: Option<String>,
    /// Separator placed between hashed values, default `|||`.
    pub(crate) hash_separator: Option<String>,
}

/// Parameters for the `query_postgresql` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub(crate) struct QueryParams {
    /// A `SELECT` or `WITH ... SELECT` statement.
    pub(crate) sql: String,
    /// Database to query; the DSN's database when omitted.
    pub(crate) dbname: Option<String>,
}

/// Arguments of the `appstore_analytics` prompt. All are optional.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub(crate) struct AnalyticsPromptParams {
    /// What the user wants to do, e.g. `sales report` or `finance report`.
    #[serde(default)]
    pub(crate) operation: String,
    /// App the question is about.
    #[serde(default)]
    pub(crate) app_name: String,
    /// Vendor number to report on.
    #[serde(default)]
    pub(crate) vendor_number: String,
    /// Period of interest, free form.
    #[serde(default)]
    pub(crate) date_range: String,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use super::{
        AnalyticsPromptParams, FinanceReportParams, LoadReportParams, QueryParams,
        SalesReportParams, SplitByKeywordParams, SplitReportParams, TablePart,
    };

    #[test]
    fn sales_report_defaults() {
        let params: SalesReportParams = serde_json::from_str("{}").expect("should deserialize");
        assert_eq!(params.report_type, "SALES");
        assert_eq!(params.report_subtype, "SUMMARY");
        assert_eq!(params.frequency, "DAILY");
        assert!(params.report_date.is_empty());
    }

    #[test]
    fn sales_report_full() {
        let json = r#"{
            "report_type": "SUBSCRIPTION",
            "report_subtype": "DETAILED",
            "frequency": "MONTHLY",
            "report_date": "2025-01"
        }"#;
        let params: SalesReportParams = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(params.report_type, "SUBSCRIPTION");
        assert_eq!(params.report_subtype, "DETAILED");
        assert_eq!(params.frequency, "MONTHLY");
        assert_eq!(params.report_date, "2025-01");
    }

    #[test]
    fn finance_report_requires_date() {
        let params: FinanceReportParams =
            serde_json::from_str(r#"{"report_date": "2024-08"}"#).expect("should deserialize");
        assert_eq!(params.region_code, "ZZ");
        assert_eq!(params.report_date, "2024-08");

        assert!(serde_json::from_str::<FinanceReportParams>("{}").is_err());
    }

    #[test]
    fn split_params() {
        let split: SplitReportParams =
            serde_json::from_str(r#"{"file_path": "/data/report.csv"}"#)
                .expect("should deserialize");
        assert_eq!(split.file_path, "/data/report.csv");

        let by_keyword: SplitByKeywordParams = serde_json::from_str(
            r#"{"file_path": "/data/report.csv", "keyword": "Country Of Sale"}"#,
        )
        .expect("should deserialize");
        assert_eq!(by_keyword.keyword, "Country Of Sale");
        assert!(!by_keyword.strip_sentinel);
    }

    #[test]
    fn load_report_minimal() {
        let json = r#"{
            "file_path": "/data/report.csv",
            "dbname": "test_db",
            "table_name": "apple_finance"
        }"#;
        let params: LoadReportParams = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(params.part, TablePart::First);
        assert!(params.if_exists.is_none());
        assert!(params.hash_columns.is_none());
        assert!(params.hash_algorithm.is_none());
        assert!(params.hash_separator.is_none());
    }

    #[test]
    fn load_report_full() {
        let json = r#"{
            "file_path": "/data/report.csv",
            "dbname": "test_db",
            "table_name": "apple_finance",
            "if_exists": "replace",
            "part": "second",
            "hash_columns": ["Start Date", "Vendor Identifier"],
            "hash_algorithm": "sha512",
            "hash_separator": "|"
        }"#;
        let params: LoadReportParams = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(params.part, TablePart::Second);
        assert_eq!(params.if_exists.as_deref(), Some("replace"));
        assert_eq!(
            params.hash_columns.as_deref(),
            Some(["Start Date".to_owned(), "Vendor Identifier".to_owned()].as_slice())
        );
        assert_eq!(params.hash_algorithm.as_deref(), Some("sha512"));
        assert_eq!(params.hash_separator.as_deref(), Some("|"));
    }

    #[test]
    fn unknown_part_is_rejected() {
        let json = r#"{
            "file_path": "a.csv",
            "dbname": "d",
            "table_name": "t",
            "part": "third"
        }"#;
        assert!(serde_json::from_str::<LoadReportParams>(json).is_err());
    }

    #[test]
    fn query_params() {
        let params: QueryParams =
            serde_json::from_str(r#"{"sql": "SELECT 1"}"#).expect("should deserialize");
        assert_eq!(params.sql, "SELECT 1");
        assert!(params.dbname.is_none());
    }

    #[test]
    fn analytics_prompt_arguments_are_optional() {
        let empty: AnalyticsPromptParams =
            serde_json::from_str("{}").expect("should deserialize");
        assert!(empty.operation.is_empty());
        assert!(empty.date_range.is_empty());

        let filled: AnalyticsPromptParams =
            serde_json::from_str(r#"{"app_name": "Notes", "vendor_number": "8501"}"#)
                .expect("should deserialize");
        assert_eq!(filled.app_name, "Notes");
        assert_eq!(filled.vendor_number, "8501");
        assert!(filled.operation.is_empty());
    }
}
