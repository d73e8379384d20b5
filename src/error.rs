//! Error types for every layer of the server.
//!
//! The pure core only ever produces [`SplitError`]; the remaining enums
//! belong to the I/O collaborators around it.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to recover tables from a report export.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SplitError {
    /// The input had no non-blank lines.
    #[error("report contains no data lines")]
    EmptyInput,
    /// The sentinel line has no tab-separated payload field.
    #[error("sentinel line '{line}' has no payload field")]
    MalformedSentinel {
        /// The offending line, as trimmed.
        line: String,
    },
    /// A data row has more fields than its table header.
    #[error("line {line}: expected at most {expected} fields, found {found}")]
    RowArityMismatch {
        /// 1-based line number within the trimmed input.
        line: usize,
        /// Number of header columns.
        expected: usize,
        /// Number of fields in the row.
        found: usize,
    },
}

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value '{value}' for {name}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// Failure while downloading a report from App Store Connect.
#[derive(Debug, Error)]
pub(crate) enum ReportError {
    /// No bearer token was configured.
    #[error("ASC_API_TOKEN is not configured")]
    MissingToken,
    /// The HTTP request itself failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("App Store Connect returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a JSON error document.
        body: String,
    },
    /// The payload was not valid gzip.
    #[error("failed to decompress report: {0}")]
    Decompress(#[from] std::io::Error),
    /// The decompressed payload was not UTF-8.
    #[error("report is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Failure reading or writing report files.
#[derive(Debug, Error)]
pub(crate) enum FileError {
    /// The file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file is not valid UTF-8 text.
    #[error("file is not valid UTF-8: {}", .0.display())]
    InvalidEncoding(PathBuf),
    /// The file extension is neither `.csv` nor `.txt`.
    #[error("unsupported file extension '{0}', expected .csv or .txt")]
    UnsupportedExtension(String),
    /// Underlying filesystem error.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Source error.
        #[source]
        source: std::io::Error,
    },
}

/// Failure computing row hashes.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum HashError {
    /// Some requested columns are not in the table.
    #[error("columns not found in table: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// The algorithm name is not supported.
    #[error("unsupported hash algorithm '{0}', supported: md5, sha1, sha224, sha256, sha384, sha512")]
    UnsupportedAlgorithm(String),
}

/// Failure talking to PostgreSQL.
#[derive(Debug, Error)]
pub(crate) enum DatabaseError {
    /// No DSN was configured.
    #[error("DSN is not configured")]
    MissingDsn,
    /// A database, table or column name is not a plain identifier.
    #[error("invalid identifier '{0}': only letters, digits and '_' are allowed")]
    InvalidIdentifier(String),
    /// The target table exists and the caller asked to fail in that case.
    #[error("table '{0}' already exists")]
    TableExists(String),
    /// The table to load has no columns.
    #[error("table has no columns to load")]
    NoColumns,
    /// The statement is not a read-only query.
    #[error("read-only mode: only SELECT and WITH...SELECT queries are allowed")]
    NotReadOnly,
    /// Error reported by the driver.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
