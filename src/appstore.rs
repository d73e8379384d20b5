//! App Store Connect report downloads.
//!
//! Both report endpoints answer with a gzip-compressed, tab-separated
//! payload. [`AppStoreClient`] fetches it and hands back decoded text.

use core::fmt;
use core::str::FromStr;
use std::io::Read;

use flate2::read::GzDecoder;
use reqwest::header::ACCEPT;
use tracing::{debug, info, instrument};

use crate::config::ApiConfig;
use crate::error::ReportError;

/// Media type requested for report downloads.
const GZIP_MEDIA_TYPE: &str = "application/a-gzip";

/// Declares a report vocabulary enum with its API spelling.
macro_rules! api_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$variant_meta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub(crate) enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            /// Spelling expected by the App Store Connect API.
            pub(crate) const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(
                        "unknown {} '{value}', expected one of: {}",
                        stringify!($name),
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

api_enum! {
    /// Sales and trends report family.
    SalesReportType {
        /// Downloads and purchases.
        Sales => "SALES",
        /// Pre-orders.
        PreOrder => "PRE_ORDER",
        /// Newsstand subscriptions.
        Newsstand => "NEWSSTAND",
        /// Auto-renewable subscriptions.
        Subscription => "SUBSCRIPTION",
        /// Subscription lifecycle events.
        SubscriptionEvent => "SUBSCRIPTION_EVENT",
        /// Subscriber activity.
        Subscriber => "SUBSCRIBER",
        /// Offer code redemptions.
        SubscriptionOfferCodeRedemption => "SUBSCRIPTION_OFFER_CODE_REDEMPTION",
        /// Installs.
        Installs => "INSTALLS",
        /// First annual subscriptions.
        FirstAnnual => "FIRST_ANNUAL",
        /// Win-back offer eligibility.
        WinBackEligibility => "WIN_BACK_ELIGIBILITY",
    }
}

api_enum! {
    /// Level of detail of a sales report.
    SalesReportSubType {
        /// Aggregated rows.
        Summary => "SUMMARY",
        /// One row per transaction.
        Detailed => "DETAILED",
        /// Summary split by install type.
        SummaryInstallType => "SUMMARY_INSTALL_TYPE",
        /// Summary split by territory.
        SummaryTerritory => "SUMMARY_TERRITORY",
        /// Summary split by channel.
        SummaryChannel => "SUMMARY_CHANNEL",
    }
}

api_enum! {
    /// Period covered by a sales report.
    ReportFrequency {
        /// One day.
        Daily => "DAILY",
        /// One week.
        Weekly => "WEEKLY",
        /// One month.
        Monthly => "MONTHLY",
        /// One year.
        Yearly => "YEARLY",
    }
}

/// Selection of a sales and trends report.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SalesReportRequest<'req> {
    /// Report family.
    pub(crate) report_type: SalesReportType,
    /// Level of detail.
    pub(crate) report_subtype: SalesReportSubType,
    /// Period length.
    pub(crate) frequency: ReportFrequency,
    /// Report date; empty requests the most recent report.
    pub(crate) report_date: &'req str,
}

/// HTTP client for the App Store Connect reporting endpoints.
#[derive(Debug, Clone)]
pub(crate) struct AppStoreClient {
    /// Shared connection pool.
    http: reqwest::Client,
    /// API root and credentials.
    config: ApiConfig,
}

impl AppStoreClient {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Http`] if the TLS backend cannot initialise.
    pub(crate) fn new(config: ApiConfig) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Configured vendor number, if any.
    pub(crate) fn vendor_number(&self) -> Option<&str> {
        self.config.vendor_number.as_deref()
    }

    /// Downloads and decompresses a sales and trends report.
    ///
    /// # Errors
    ///
    /// See [`ReportError`].
    #[instrument(skip(self), fields(report_type = %request.report_type, frequency = %request.frequency))]
    pub(crate) async fn sales_report(
        &self,
        vendor_number: &str,
        request: SalesReportRequest<'_>,
    ) -> Result<String, ReportError> {
        let query = sales_report_query(vendor_number, &request);
        let report = self.download("salesReports", &query).await?;
        info!(chars = report.len(), "sales report decompressed");
        Ok(report)
    }

    /// Downloads and decompresses a monthly finance report.
    ///
    /// # Errors
    ///
    /// See [`ReportError`].
    #[instrument(skip(self))]
    pub(crate) async fn finance_report(
        &self,
        vendor_number: &str,
        region_code: &str,
        report_date: &str,
    ) -> Result<String, ReportError> {
        let query = finance_report_query(vendor_number, region_code, report_date);
        let report = self.download("financeReports", &query).await?;
        info!(chars = report.len(), "finance report decompressed");
        Ok(report)
    }

    /// Issues the GET request and decodes the gzip body.
    async fn download(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<String, ReportError> {
        let token = self
            .config
            .token
            .as_deref()
            .ok_or(ReportError::MissingToken)?;
        let url = format!("{}/{endpoint}", self.config.base_url);
        debug!(%url, "requesting report");

        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .header(ACCEPT, GZIP_MEDIA_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let compressed = response.bytes().await?;
        debug!(bytes = compressed.len(), "report payload received");
        decompress_report(&compressed)
    }
}

/// Query parameters of a sales report request, in API order.
fn sales_report_query<'req>(
    vendor_number: &'req str,
    request: &SalesReportRequest<'req>,
) -> Vec<(&'static str, &'req str)> {
    let mut query = vec![("filter[frequency]", request.frequency.as_str())];
    if !request.report_date.is_empty() {
        query.push(("filter[reportDate]", request.report_date));
    }
    query.extend([
        ("filter[reportSubType]", request.report_subtype.as_str()),
        ("filter[reportType]", request.report_type.as_str()),
        ("filter[vendorNumber]", vendor_number),
    ]);
    query
}

/// Query parameters of a finance report request.
fn finance_report_query<'req>(
    vendor_number: &'req str,
    region_code: &'req str,
    report_date: &'req str,
) -> Vec<(&'static str, &'req str)> {
    vec![
        ("filter[regionCode]", region_code),
        ("filter[reportDate]", report_date),
        ("filter[reportType]", "FINANCIAL"),
        ("filter[vendorNumber]", vendor_number),
    ]
}

/// Gunzips a report payload and decodes it as UTF-8.
///
/// # Errors
///
/// Returns [`ReportError::Decompress`] for corrupt gzip data and
/// [`ReportError::Encoding`] for non-UTF-8 content.
pub(crate) fn decompress_report(compressed: &[u8]) -> Result<String, ReportError> {
    let mut decoder = GzDecoder::new(compressed);
    let mut bytes = Vec::new();
    let _read = decoder.read_to_end(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use core::time::Duration;
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::{
        AppStoreClient, ReportFrequency, SalesReportRequest, SalesReportSubType,
        SalesReportType, decompress_report, finance_report_query, sales_report_query,
    };
    use crate::config::ApiConfig;
    use crate::error::ReportError;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("write to encoder");
        encoder.finish().expect("finish gzip")
    }

    /// Serves one HTTP response on a loopback port and hands back the
    /// raw request head it received.
    async fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut stream, _peer) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = stream.read(&mut chunk).await.expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(chunk.get(..read).unwrap_or_default());
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).await.expect("write head");
            stream.write_all(&body).await.expect("write body");
            stream.shutdown().await.expect("shutdown");
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn client(base_url: String) -> AppStoreClient {
        AppStoreClient::new(ApiConfig {
            base_url,
            token: Some("test-token".to_owned()),
            vendor_number: Some("8501".to_owned()),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build")
    }

    fn daily_sales() -> SalesReportRequest<'static> {
        SalesReportRequest {
            report_type: SalesReportType::Sales,
            report_subtype: SalesReportSubType::Summary,
            frequency: ReportFrequency::Daily,
            report_date: "2025-01-15",
        }
    }

    #[tokio::test]
    async fn download_sends_token_and_gzip_accept() {
        let report = "Provider\tSKU\nAPPLE\tcom.example";
        let (base_url, server) = serve_once("200 OK", gzip(report.as_bytes())).await;
        let text = client(base_url)
            .sales_report("8501", daily_sales())
            .await
            .expect("should download");
        assert_eq!(text, report);

        let request = server.await.expect("server task").to_ascii_lowercase();
        assert!(request.starts_with("get /salesreports?"));
        assert!(request.contains("authorization: bearer test-token"));
        assert!(request.contains("accept: application/a-gzip"));
        assert!(request.contains("filter%5breportdate%5d=2025-01-15"));
    }

    #[tokio::test]
    async fn error_status_keeps_code_and_body() {
        let (base_url, server) =
            serve_once("500 Internal Server Error", b"upstream failure".to_vec()).await;
        let err = client(base_url)
            .finance_report("8501", "ZZ", "2024-08")
            .await
            .expect_err("should fail");
        assert!(matches!(err, ReportError::Status { status: 500, .. }));
        assert_eq!(
            err.to_string(),
            "App Store Connect returned 500: upstream failure"
        );
        let request = server.await.expect("server task");
        assert!(request.starts_with("GET /financeReports?"));
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let err = AppStoreClient::new(ApiConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            token: None,
            vendor_number: Some("8501".to_owned()),
            timeout: Duration::from_secs(1),
        })
        .expect("client should build")
        .sales_report("8501", daily_sales())
        .await
        .expect_err("should fail");
        assert!(matches!(err, ReportError::MissingToken));
    }

    #[test]
    fn decompresses_gzip_payload() {
        let report = "Provider\tSKU\nAPPLE\tcom.example\n";
        let text = decompress_report(&gzip(report.as_bytes())).expect("should decompress");
        assert_eq!(text, report);
    }

    #[test]
    fn rejects_plain_payload() {
        let err = decompress_report(b"not gzip").expect_err("should fail");
        assert!(matches!(err, ReportError::Decompress(_)));
    }

    #[test]
    fn rejects_non_utf8_payload() {
        let err = decompress_report(&gzip(&[0xff, 0xfe, 0x00])).expect_err("should fail");
        assert!(matches!(err, ReportError::Encoding(_)));
    }

    #[test]
    fn vocabularies_parse_case_insensitively() {
        assert_eq!(
            "subscription_event".parse::<SalesReportType>(),
            Ok(SalesReportType::SubscriptionEvent)
        );
        assert_eq!(
            " Summary_Territory ".parse::<SalesReportSubType>(),
            Ok(SalesReportSubType::SummaryTerritory)
        );
        assert_eq!("monthly".parse::<ReportFrequency>(), Ok(ReportFrequency::Monthly));
    }

    #[test]
    fn unknown_vocabulary_lists_choices() {
        let err = "HOURLY"
            .parse::<ReportFrequency>()
            .expect_err("should fail");
        assert!(err.contains("DAILY, WEEKLY, MONTHLY, YEARLY"));
    }

    #[test]
    fn sales_query_omits_empty_date() {
        let request = SalesReportRequest {
            report_type: SalesReportType::Sales,
            report_subtype: SalesReportSubType::Summary,
            frequency: ReportFrequency::Daily,
            report_date: "",
        };
        let query = sales_report_query("8501", &request);
        assert_eq!(
            query,
            [
                ("filter[frequency]", "DAILY"),
                ("filter[reportSubType]", "SUMMARY"),
                ("filter[reportType]", "SALES"),
                ("filter[vendorNumber]", "8501"),
            ]
        );
    }

    #[test]
    fn sales_query_includes_date() {
        let request = SalesReportRequest {
            report_type: SalesReportType::Subscription,
            report_subtype: SalesReportSubType::Detailed,
            frequency: ReportFrequency::Monthly,
            report_date: "2025-01",
        };
        let query = sales_report_query("8501", &request);
        assert_eq!(query.get(1), Some(&("filter[reportDate]", "2025-01")));
        assert_eq!(query.len(), 5);
    }

    #[test]
    fn finance_query_is_always_financial() {
        let query = finance_report_query("8501", "ZZ", "2024-08");
        assert_eq!(
            query,
            [
                ("filter[regionCode]", "ZZ"),
                ("filter[reportDate]", "2024-08"),
                ("filter[reportType]", "FINANCIAL"),
                ("filter[vendorNumber]", "8501"),
            ]
        );
    }
}
