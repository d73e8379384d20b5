//! MCP server exposing App Store Connect reports, report splitting and
//! PostgreSQL loading as tools.
//!
//! Uses `rmcp` macros to route tool calls to the collaborators built at
//! startup.

extern crate alloc;

use alloc::sync::Arc;
use std::path::{Path, PathBuf};

use rmcp::handler::server::router::prompt::PromptRouter;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, GetPromptRequestParams, GetPromptResult, ListPromptsResult,
    PaginatedRequestParams, PromptMessage, PromptMessageRole, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, prompt, prompt_handler, prompt_router, tool,
    tool_handler, tool_router,
};
use tracing::info;

use crate::appstore::{AppStoreClient, SalesReportRequest};
use crate::config::Config;
use crate::database::{Database, IfExists};
use crate::error::{DatabaseError, FileError, HashError, ReportError, SplitError};
use crate::files::{
    ReportKind, finance_period_label, part_paths, period_label, read_report_file, save_report,
    write_text,
};
use crate::hashing::{DEFAULT_SEPARATOR, HashAlgorithm, compute_row_hash};
use crate::params::{
    AnalyticsPromptParams, FinanceReportParams, LoadReportParams, QueryParams, SalesReportParams,
    SplitByKeywordParams, SplitReportParams, TablePart,
};
use crate::response::{
    KeywordSplitResponse, LoadReportResponse, SavedReportResponse, SplitReportResponse,
};
use crate::splitter::{recover, remove_sentinel_lines, split_on_keyword};

/// MCP server for App Store Connect report workflows.
#[derive(Clone)]
pub(crate) struct AppStoreReportServer {
    /// App Store Connect client (shared via Arc).
    client: Arc<AppStoreClient>,
    /// PostgreSQL access (shared via Arc).
    database: Arc<Database>,
    /// Startup configuration.
    config: Arc<Config>,
    /// Tool router for dispatching MCP tool calls.
    tool_router: ToolRouter<Self>,
    /// Prompt router for MCP prompt requests.
    prompt_router: PromptRouter<Self>,
}

impl core::fmt::Debug for AppStoreReportServer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppStoreReportServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Converts a [`ReportError`] into an MCP error.
#[allow(clippy::needless_pass_by_value, reason = "map_err passes by value")]
fn report_err(err: ReportError) -> McpError {
    match err {
        ReportError::MissingToken => McpError::invalid_request(err.to_string(), None),
        ReportError::Http(_)
        | ReportError::Status { .. }
        | ReportError::Decompress(_)
        | ReportError::Encoding(_) => McpError::internal_error(err.to_string(), None),
    }
}

/// Converts a [`FileError`] into an MCP error.
#[allow(clippy::needless_pass_by_value, reason = "map_err passes by value")]
fn file_err(err: FileError) -> McpError {
    match err {
        FileError::NotFound(_)
        | FileError::InvalidEncoding(_)
        | FileError::UnsupportedExtension(_) => {
            McpError::invalid_params(err.to_string(), None)
        }
        FileError::Io { .. } => McpError::internal_error(err.to_string(), None),
    }
}

/// Converts a [`SplitError`] into an MCP invalid-params error.
#[allow(clippy::needless_pass_by_value, reason = "map_err passes by value")]
fn split_err(err: SplitError) -> McpError {
    McpError::invalid_params(err.to_string(), None)
}

/// Converts a [`HashError`] into an MCP invalid-params error.
#[allow(clippy::needless_pass_by_value, reason = "map_err passes by value")]
fn hash_err(err: HashError) -> McpError {
    McpError::invalid_params(err.to_string(), None)
}

/// Converts a [`DatabaseError`] into an MCP error.
#[allow(clippy::needless_pass_by_value, reason = "map_err passes by value")]
fn database_err(err: DatabaseError) -> McpError {
    match err {
        DatabaseError::MissingDsn => McpError::invalid_request(err.to_string(), None),
        DatabaseError::InvalidIdentifier(_)
        | DatabaseError::TableExists(_)
        | DatabaseError::NoColumns
        | DatabaseError::NotReadOnly => McpError::invalid_params(err.to_string(), None),
        DatabaseError::Sqlx(_) => McpError::internal_error(err.to_string(), None),
    }
}

/// Parses a report vocabulary value supplied by the caller.
fn parse_param<T>(value: &str) -> Result<T, McpError>
where
    T: core::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|err: String| McpError::invalid_params(err, None))
}

/// Serializes a value to a pretty-printed JSON string for tool output.
fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|err| {
        McpError::internal_error(format!("failed to serialize response: {err}"), None)
    })
}

/// Creates a successful tool result containing JSON text.
fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = to_json_text(value)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Creates a successful tool result containing plain text.
fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

#[tool_router]
impl AppStoreReportServer {
    /// Creates a new MCP server around the given collaborators.
    pub(crate) fn new(client: AppStoreClient, database: Database, config: Config) -> Self {
        Self {
            client: Arc::new(client),
            database: Arc::new(database),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    /// Configured vendor number, or an invalid-request error.
    fn vendor_number(&self) -> Result<&str, McpError> {
        self.client.vendor_number().ok_or_else(|| {
            McpError::invalid_request("ASC_VENDOR_NUMBER is not configured", None)
        })
    }

    /// Downloads the sales report selected by `params`.
    async fn fetch_sales_report<'req>(
        &self,
        params: &'req SalesReportParams,
    ) -> Result<(SalesReportRequest<'req>, String), McpError> {
        let vendor_number = self.vendor_number()?;
        let request = SalesReportRequest {
            report_type: parse_param(&params.report_type)?,
            report_subtype: parse_param(&params.report_subtype)?,
            frequency: parse_param(&params.frequency)?,
            report_date: params.report_date.trim(),
        };
        let report = self
            .client
            .sales_report(vendor_number, request)
            .await
            .map_err(report_err)?;
        Ok((request, report))
    }

    /// Downloads the finance report selected by `params`.
    async fn fetch_finance_report(&self, params: &FinanceReportParams) -> Result<String, McpError> {
        let vendor_number = self.vendor_number()?;
        let report_date = params.report_date.trim();
        if report_date.is_empty() {
            return Err(McpError::invalid_params(
                "report_date is required, format YYYY-MM",
                None,
            ));
        }
        self.client
            .finance_report(vendor_number, params.region_code.trim(), report_date)
            .await
            .map_err(report_err)
    }

    // ── App Store Connect tools ─────────────────────────────────────

    /// Returns a decompressed sales report as text.
    #[tool(
        description = "Download an App Store Connect sales and trends report and return it as tab-separated text. Defaults: SALES / SUMMARY / DAILY, latest date"
    )]
    async fn get_appstore_sales_report(
        &self,
        params: Parameters<SalesReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let (_request, report) = self.fetch_sales_report(&params.0).await?;
        Ok(text_result(report))
    }

    /// Returns a decompressed finance report as text.
    #[tool(
        description = "Download an App Store Connect finance report for a fiscal month (YYYY-MM) and return it as tab-separated text. region_code defaults to ZZ (all regions)"
    )]
    async fn get_appstore_finance_report(
        &self,
        params: Parameters<FinanceReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = self.fetch_finance_report(&params.0).await?;
        Ok(text_result(report))
    }

    /// Saves a sales report to the output directory.
    #[tool(
        description = "Download an App Store Connect sales and trends report and save it to a local file. Returns the absolute file path"
    )]
    async fn download_appstore_sales_data(
        &self,
        params: Parameters<SalesReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let (request, report) = self.fetch_sales_report(&params.0).await?;
        let period = period_label(request.frequency, request.report_date);
        let path = save_report(&self.config.output_dir, ReportKind::Sales, &period, &report)
            .await
            .map_err(file_err)?;
        json_result(&SavedReportResponse::new(&path, &report))
    }

    /// Saves a finance report to the output directory.
    #[tool(
        description = "Download an App Store Connect finance report for a fiscal month (YYYY-MM) and save it to a local file. Returns the absolute file path"
    )]
    async fn download_appstore_finance_data(
        &self,
        params: Parameters<FinanceReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let report = self.fetch_finance_report(&params.0).await?;
        let period = finance_period_label(&params.0.report_date);
        let path = save_report(&self.config.output_dir, ReportKind::Finance, &period, &report)
            .await
            .map_err(file_err)?;
        json_result(&SavedReportResponse::new(&path, &report))
    }

    // ── Report file tools ───────────────────────────────────────────

    /// Recovers both tables of a report export and writes them as parts.
    #[tool(
        description = "Split a two-table report export (tables separated by a Total_Rows line) into <name>_part1 and <name>_part2 files. Returns columns and row counts of both tables"
    )]
    async fn split_report_file(
        &self,
        params: Parameters<SplitReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let path = PathBuf::from(&params.0.file_path);
        let content = read_report_file(&path).await.map_err(file_err)?;
        let result = recover(&content, &self.config.sentinel_label).map_err(split_err)?;

        let (first_path, second_path) = part_paths(&path);
        write_text(&first_path, &result.first_table.to_tsv())
            .await
            .map_err(file_err)?;
        write_text(&second_path, &result.second_table.to_tsv())
            .await
            .map_err(file_err)?;
        info!(
            path = %path.display(),
            first_rows = result.first_table.len(),
            second_rows = result.second_table.len(),
            "report split"
        );
        json_result(&SplitReportResponse::new(&result, &first_path, &second_path))
    }

    /// Splits a file around the first occurrence of a keyword.
    #[tool(
        description = "Split a text file at the first occurrence of a keyword (e.g. 'Country Of Sale') into <name>_part1 and <name>_part2 files. The keyword itself is dropped. Set strip_sentinel=true to remove Total_Rows lines first"
    )]
    async fn split_file_by_keyword(
        &self,
        params: Parameters<SplitByKeywordParams>,
    ) -> Result<CallToolResult, McpError> {
        let path = PathBuf::from(&params.0.file_path);
        let raw = read_report_file(&path).await.map_err(file_err)?;
        let content = if params.0.strip_sentinel {
            remove_sentinel_lines(&raw, &self.config.sentinel_label)
        } else {
            raw
        };

        let Some((before, after)) = split_on_keyword(&content, &params.0.keyword) else {
            info!(keyword = %params.0.keyword, "keyword not found, nothing split");
            return json_result(&KeywordSplitResponse::not_found(&params.0.keyword));
        };

        let (first_path, second_path) = part_paths(&path);
        write_text(&first_path, before).await.map_err(file_err)?;
        write_text(&second_path, after).await.map_err(file_err)?;
        json_result(&KeywordSplitResponse::written(
            &params.0.keyword,
            &first_path,
            &second_path,
        ))
    }

    // ── PostgreSQL tools ────────────────────────────────────────────

    /// Loads one recovered table of a report export into PostgreSQL.
    #[tool(
        description = "Load the first (default) or second table of a report export into a PostgreSQL table. Creates the database if missing. if_exists: append (default), replace or fail. Optionally adds a 'hash' column computed from hash_columns"
    )]
    async fn load_report_to_postgresql(
        &self,
        params: Parameters<LoadReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        let if_exists = request
            .if_exists
            .as_deref()
            .map(parse_param::<IfExists>)
            .transpose()?
            .unwrap_or_default();

        let content = read_report_file(Path::new(&request.file_path))
            .await
            .map_err(file_err)?;
        let result = recover(&content, &self.config.sentinel_label).map_err(split_err)?;
        let mut table = match request.part {
            TablePart::First => result.first_table,
            TablePart::Second => result.second_table,
        };

        if let Some(columns) = request.hash_columns.as_deref() {
            let algorithm = request
                .hash_algorithm
                .as_deref()
                .map(str::parse::<HashAlgorithm>)
                .transpose()
                .map_err(hash_err)?
                .unwrap_or_default();
            let separator = request
                .hash_separator
                .as_deref()
                .unwrap_or(DEFAULT_SEPARATOR);
            compute_row_hash(&mut table, columns, separator, algorithm).map_err(hash_err)?;
        }

        let rows = self
            .database
            .load_table(&request.dbname, &request.table_name, &table, if_exists)
            .await
            .map_err(database_err)?;
        json_result(&LoadReportResponse {
            dbname: request.dbname,
            table_name: request.table_name,
            rows,
            columns: table.columns().to_vec(),
        })
    }

    /// Runs a read-only SQL query.
    #[tool(
        description = "Run a read-only SQL query (SELECT or WITH ... SELECT) against PostgreSQL and return the rows as JSON. At most 500 rows are returned"
    )]
    async fn query_postgresql(
        &self,
        params: Parameters<QueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let rows = self
            .database
            .read_query(params.0.dbname.as_deref(), &params.0.sql)
            .await
            .map_err(database_err)?;
        Ok(text_result(rows))
    }
}

/// Renders the analytics assistant prompt.
fn analytics_prompt_text(args: &AnalyticsPromptParams, vendor_number: &str) -> String {
    format!(
        "App Store Connect analytics assistant

Request:
- Operation: {operation}
- App: {app_name}
- Vendor number: {vendor_number}
- Date range: {date_range}

Tools:
- get_appstore_sales_report / download_appstore_sales_data: sales and trends reports
- get_appstore_finance_report / download_appstore_finance_data: monthly finance reports
- split_report_file: separate the two tables of a finance export
- split_file_by_keyword: split a report at a line such as `Country Of Sale`
- load_report_to_postgresql / query_postgresql: load a table and query it read-only

Sales report types:
- SALES: downloads and purchases
- SUBSCRIPTION, SUBSCRIPTION_EVENT, SUBSCRIBER: subscription activity
- NEWSSTAND: newsstand subscriptions
- PRE_ORDER, INSTALLS, FIRST_ANNUAL: other report families

Finance reports:
- Report type FINANCIAL (proceeds, taxes and exchange rates)
- Region code ZZ covers all regions
- Report date is a fiscal month, YYYY-MM

Sales frequencies: DAILY, WEEKLY, MONTHLY, YEARLY

Steps:
1. Make sure a vendor number is configured (ASC_VENDOR_NUMBER).
2. Pick the app and the date range.
3. Download the report, split it if it holds two tables, then load and query it.

Example: get_appstore_finance_report(region_code=\"ZZ\", report_date=\"2024-08\")

Notes:
- Sales data usually lags one to two days.
- Finance data is published monthly and lags longer.
- Some reports need additional account permissions.
",
        operation = args.operation,
        app_name = args.app_name,
        date_range = args.date_range,
    )
}

#[prompt_router]
#[allow(
    clippy::multiple_inherent_impl,
    reason = "prompt_router needs its own impl block"
)]
impl AppStoreReportServer {
    /// Guide for App Store Connect analytics requests.
    #[prompt(
        name = "appstore_analytics",
        description = "Guide for App Store Connect sales and finance analytics: report types, frequencies, finance regions and the tool workflow."
    )]
    fn appstore_analytics(
        &self,
        params: Parameters<AnalyticsPromptParams>,
    ) -> Vec<PromptMessage> {
        let args = params.0;
        let vendor_number = if args.vendor_number.is_empty() {
            self.client.vendor_number().unwrap_or_default()
        } else {
            args.vendor_number.as_str()
        };
        info!(operation = %args.operation, "rendering appstore_analytics prompt");
        vec![PromptMessage::new_text(
            PromptMessageRole::User,
            analytics_prompt_text(&args, vendor_number),
        )]
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for AppStoreReportServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "App Store Connect report MCP server. \
                 Download sales and finance reports, split two-table report \
                 exports, load them into PostgreSQL, and query them read-only."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use std::path::{Path, PathBuf};

    use rmcp::ServerHandler;
    use rmcp::handler::server::wrapper::Parameters;
    use rmcp::model::ErrorCode;

    use super::{AppStoreReportServer, database_err, file_err, report_err};
    use crate::appstore::AppStoreClient;
    use crate::config::Config;
    use crate::database::Database;
    use crate::error::{DatabaseError, FileError, ReportError};
    use crate::params::{
        AnalyticsPromptParams, FinanceReportParams, LoadReportParams, QueryParams,
        SalesReportParams, SplitByKeywordParams, SplitReportParams, TablePart,
    };

    fn server(output_dir: &Path) -> AppStoreReportServer {
        let mut config = Config::from_lookup(|_name| None).expect("defaults are valid");
        config.output_dir = output_dir.to_path_buf();
        let client = AppStoreClient::new(config.api.clone()).expect("client should build");
        let database = Database::new(None).expect("no DSN is valid");
        AppStoreReportServer::new(client, database, config)
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    #[test]
    fn analytics_prompt_renders_arguments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let messages = server(dir.path()).appstore_analytics(Parameters(AnalyticsPromptParams {
            operation: "finance report".to_owned(),
            app_name: "Notes".to_owned(),
            vendor_number: "8501".to_owned(),
            date_range: "2024-08".to_owned(),
        }));
        assert_eq!(messages.len(), 1);
        let rendered = serde_json::to_string(&messages).expect("should serialize");
        assert!(rendered.contains("\"role\":\"user\""));
        assert!(rendered.contains("- Operation: finance report"));
        assert!(rendered.contains("- App: Notes"));
        assert!(rendered.contains("- Vendor number: 8501"));
        assert!(rendered.contains("- Date range: 2024-08"));
        assert!(rendered.contains("Region code ZZ"));
    }

    #[test]
    fn analytics_prompt_falls_back_to_configured_vendor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::from_lookup(|_name| None).expect("defaults are valid");
        config.output_dir = dir.path().to_path_buf();
        config.api.vendor_number = Some("9900".to_owned());
        let client = AppStoreClient::new(config.api.clone()).expect("client should build");
        let database = Database::new(None).expect("no DSN is valid");
        let messages = AppStoreReportServer::new(client, database, config)
            .appstore_analytics(Parameters(AnalyticsPromptParams::default()));
        let rendered = serde_json::to_string(&messages).expect("should serialize");
        assert!(rendered.contains("- Vendor number: 9900"));
    }

    #[test]
    fn prompts_capability_is_advertised() {
        let dir = tempfile::tempdir().expect("tempdir");
        let capabilities = server(dir.path()).get_info().capabilities;
        assert!(capabilities.prompts.is_some());
        assert!(capabilities.tools.is_some());
    }

    #[test]
    fn errors_map_to_mcp_codes() {
        assert_eq!(report_err(ReportError::MissingToken).code, ErrorCode::INVALID_REQUEST);
        assert_eq!(
            file_err(FileError::NotFound(PathBuf::from("x.csv"))).code,
            ErrorCode::INVALID_PARAMS
        );
        assert_eq!(
            file_err(FileError::InvalidEncoding(PathBuf::from("x.csv"))).code,
            ErrorCode::INVALID_PARAMS
        );
        assert_eq!(database_err(DatabaseError::MissingDsn).code, ErrorCode::INVALID_REQUEST);
        assert_eq!(database_err(DatabaseError::NotReadOnly).code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn split_report_file_writes_both_parts() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_file(
            dir.path(),
            "finance.csv",
            "Start Date\tUnits\n01/01/2025\t3\nTotal_Rows\t1\nCountry Of Sale\tRate\nUS\t1.0\n",
        );
        let server = server(dir.path());
        let result = server
            .split_report_file(Parameters(SplitReportParams {
                file_path: path.display().to_string(),
            }))
            .await
            .expect("should split");
        let summary = serde_json::to_string(&result).expect("should serialize");
        assert!(summary.contains("preview"));
        assert!(summary.contains("01/01/2025"));

        let first = std::fs::read_to_string(dir.path().join("finance_part1.csv"))
            .expect("part1 written");
        let second = std::fs::read_to_string(dir.path().join("finance_part2.csv"))
            .expect("part2 written");
        assert_eq!(first, "Start Date\tUnits\n01/01/2025\t3");
        assert_eq!(second, "Country Of Sale\tRate\nUS\t1.0");
    }

    #[tokio::test]
    async fn split_report_file_rejects_empty_input() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_file(dir.path(), "empty.txt", "\n  \n");
        let err = server(dir.path())
            .split_report_file(Parameters(SplitReportParams {
                file_path: path.display().to_string(),
            }))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn keyword_split_strips_sentinel_first() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_file(
            dir.path(),
            "finance.csv",
            "A\tB\n1\t2\nTotal_Rows\t1\nCountry Of Sale\tRate\nUS\t1.0",
        );
        let _result = server(dir.path())
            .split_file_by_keyword(Parameters(SplitByKeywordParams {
                file_path: path.display().to_string(),
                keyword: "Country Of Sale".to_owned(),
                strip_sentinel: true,
            }))
            .await
            .expect("should split");

        let first = std::fs::read_to_string(dir.path().join("finance_part1.csv"))
            .expect("part1 written");
        let second = std::fs::read_to_string(dir.path().join("finance_part2.csv"))
            .expect("part2 written");
        assert_eq!(first, "A\tB\n1\t2\n");
        assert_eq!(second, "\tRate\nUS\t1.0");
    }

    #[tokio::test]
    async fn keyword_split_without_match_writes_nothing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_file(dir.path(), "sales.txt", "A\tB\n1\t2");
        let _result = server(dir.path())
            .split_file_by_keyword(Parameters(SplitByKeywordParams {
                file_path: path.display().to_string(),
                keyword: "Country Of Sale".to_owned(),
                strip_sentinel: false,
            }))
            .await
            .expect("absent keyword is not an error");
        assert!(!dir.path().join("sales_part1.txt").exists());
    }

    #[tokio::test]
    async fn downloads_require_vendor_number() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let server = server(dir.path());
        let sales_err = server
            .get_appstore_sales_report(Parameters(SalesReportParams {
                report_type: "SALES".to_owned(),
                report_subtype: "SUMMARY".to_owned(),
                frequency: "DAILY".to_owned(),
                report_date: String::new(),
            }))
            .await
            .expect_err("should fail");
        assert_eq!(sales_err.code, ErrorCode::INVALID_REQUEST);

        let finance_err = server
            .download_appstore_finance_data(Parameters(FinanceReportParams {
                region_code: "ZZ".to_owned(),
                report_date: "2024-08".to_owned(),
            }))
            .await
            .expect_err("should fail");
        assert_eq!(finance_err.code, ErrorCode::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn load_rejects_unknown_if_exists() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_file(dir.path(), "r.csv", "A\n1");
        let err = server(dir.path())
            .load_report_to_postgresql(Parameters(LoadReportParams {
                file_path: path.display().to_string(),
                dbname: "test_db".to_owned(),
                table_name: "apple_sales".to_owned(),
                if_exists: Some("merge".to_owned()),
                part: TablePart::First,
                hash_columns: None,
                hash_algorithm: None,
                hash_separator: None,
            }))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn load_reports_missing_hash_columns() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_file(dir.path(), "r.csv", "A\n1");
        let err = server(dir.path())
            .load_report_to_postgresql(Parameters(LoadReportParams {
                file_path: path.display().to_string(),
                dbname: "test_db".to_owned(),
                table_name: "apple_sales".to_owned(),
                if_exists: None,
                part: TablePart::First,
                hash_columns: Some(vec!["Missing".to_owned()]),
                hash_algorithm: None,
                hash_separator: None,
            }))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("Missing"));
    }

    #[tokio::test]
    async fn query_without_dsn_is_invalid_request() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = server(dir.path())
            .query_postgresql(Parameters(QueryParams {
                sql: "SELECT 1".to_owned(),
                dbname: None,
            }))
            .await
            .expect_err("should fail");
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
    }
}
