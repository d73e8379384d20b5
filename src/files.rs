//! Report files on disk.
//!
//! Downloaded reports are stored as `AppleData_<kind>_<period>_<timestamp>.csv`.
//! Files are created exclusively; a name already taken within the same
//! second gets a `_<n>` suffix instead of being overwritten.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::appstore::ReportFrequency;
use crate::error::FileError;

/// Numbered names tried before giving up on a clashing file name.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Extensions accepted by [`read_report_file`].
const SUPPORTED_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// Kind of report, used as a file name segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReportKind {
    /// Sales and trends report.
    Sales,
    /// Finance report.
    Finance,
}

impl ReportKind {
    /// File name segment for this kind.
    const fn file_segment(self) -> &'static str {
        match self {
            Self::Sales => "sale",
            Self::Finance => "finance",
        }
    }
}

/// Period segment of a sales report file name.
///
/// Empty when the date is too short for the frequency or missing.
pub(crate) fn period_label(frequency: ReportFrequency, report_date: &str) -> String {
    let date = report_date.trim();
    let length = date.chars().count();
    match frequency {
        ReportFrequency::Monthly if length >= 7 => format!("MONTHLY_{}", date.replace('-', "_")),
        ReportFrequency::Daily if length >= 10 => format!("DAILY_{}", date.replace('-', "_")),
        ReportFrequency::Weekly if length > 0 => format!("WEEKLY_{}", date.replace('-', "_")),
        ReportFrequency::Yearly if length > 0 => {
            format!("YEARLY_{}", date.split('-').next().unwrap_or_default())
        }
        ReportFrequency::Monthly
        | ReportFrequency::Daily
        | ReportFrequency::Weekly
        | ReportFrequency::Yearly => String::new(),
    }
}

/// Period segment of a finance report file name.
pub(crate) fn finance_period_label(report_date: &str) -> String {
    format!("MONTHLY_{}", report_date.trim().replace('-', "_"))
}

/// File name for a report downloaded at `timestamp`.
pub(crate) fn report_file_name(kind: ReportKind, period: &str, timestamp: NaiveDateTime) -> String {
    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    if period.is_empty() {
        format!("AppleData_{}_{stamp}.csv", kind.file_segment())
    } else {
        format!("AppleData_{}_{period}_{stamp}.csv", kind.file_segment())
    }
}

/// Writes `data` to a fresh report file in `dir` and returns its absolute path.
///
/// # Errors
///
/// Returns [`FileError::Io`] if the directory or file cannot be written.
pub(crate) async fn save_report(
    dir: &Path,
    kind: ReportKind,
    period: &str,
    data: &str,
) -> Result<PathBuf, FileError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| io_error(dir, source))?;
    let name = report_file_name(kind, period, Local::now().naive_local());
    let path = create_report_file(dir, &name, data).await?;
    let absolute = tokio::fs::canonicalize(&path)
        .await
        .map_err(|source| io_error(&path, source))?;
    info!(path = %absolute.display(), kind = kind.file_segment(), "report saved");
    Ok(absolute)
}

/// Writes `data` to a new file in `dir`, numbering `name` on clashes.
async fn create_report_file(dir: &Path, name: &str, data: &str) -> Result<PathBuf, FileError> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(numbered_file_name(name, attempt));
        match write_new(&path, data).await {
            Ok(()) => return Ok(path),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
            Err(source) => return Err(io_error(&path, source)),
        }
    }
    Err(io_error(
        &dir.join(name),
        std::io::Error::from(ErrorKind::AlreadyExists),
    ))
}

/// Creates `path` exclusively and writes `data` to it.
async fn write_new(path: &Path, data: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data.as_bytes()).await?;
    file.flush().await
}

/// `name` for attempt 0, otherwise `name` with `_<attempt>` before its extension.
fn numbered_file_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_owned();
    }
    match name.rsplit_once('.') {
        Some((stem, extension)) => format!("{stem}_{attempt}.{extension}"),
        None => format!("{name}_{attempt}"),
    }
}

/// Reads a `.csv` or `.txt` report file.
///
/// # Errors
///
/// - [`FileError::NotFound`] if `path` does not exist.
/// - [`FileError::UnsupportedExtension`] for any other extension.
/// - [`FileError::InvalidEncoding`] if the content is not UTF-8.
/// - [`FileError::Io`] if reading fails.
pub(crate) async fn read_report_file(path: &Path) -> Result<String, FileError> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|source| io_error(path, source))?;
    if !exists {
        return Err(FileError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(FileError::UnsupportedExtension(extension));
    }

    tokio::fs::read_to_string(path).await.map_err(|source| {
        if source.kind() == ErrorKind::InvalidData {
            FileError::InvalidEncoding(path.to_path_buf())
        } else {
            io_error(path, source)
        }
    })
}

/// Writes `content` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`FileError::Io`] if writing fails.
pub(crate) async fn write_text(path: &Path, content: &str) -> Result<(), FileError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| io_error(path, source))
}

/// Sibling paths `<stem>_part1.<ext>` and `<stem>_part2.<ext>`.
pub(crate) fn part_paths(path: &Path) -> (PathBuf, PathBuf) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    (
        path.with_file_name(format!("{stem}_part1{extension}")),
        path.with_file_name(format!("{stem}_part2{extension}")),
    )
}

/// Wraps an I/O error with the path it concerns.
fn io_error(path: &Path, source: std::io::Error) -> FileError {
    FileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;

    use super::{
        ReportKind, finance_period_label, numbered_file_name, part_paths, period_label,
        read_report_file, report_file_name, save_report, write_text,
    };
    use crate::appstore::ReportFrequency;
    use crate::error::FileError;

    #[test]
    fn period_labels_follow_frequency() {
        assert_eq!(period_label(ReportFrequency::Monthly, "2025-01"), "MONTHLY_2025_01");
        assert_eq!(period_label(ReportFrequency::Daily, "2025-01-15"), "DAILY_2025_01_15");
        assert_eq!(period_label(ReportFrequency::Weekly, "2025-01-12"), "WEEKLY_2025_01_12");
        assert_eq!(period_label(ReportFrequency::Yearly, "2024-01-01"), "YEARLY_2024");
    }

    #[test]
    fn short_or_missing_dates_give_no_period() {
        assert_eq!(period_label(ReportFrequency::Daily, "2025-01"), "");
        assert_eq!(period_label(ReportFrequency::Monthly, "2025"), "");
        assert_eq!(period_label(ReportFrequency::Weekly, ""), "");
        assert_eq!(period_label(ReportFrequency::Yearly, "  "), "");
    }

    #[test]
    fn finance_period_is_monthly() {
        assert_eq!(finance_period_label("2024-08"), "MONTHLY_2024_08");
    }

    #[test]
    fn file_names_embed_kind_period_and_timestamp() {
        let timestamp = NaiveDate::from_ymd_opt(2025, 11, 14)
            .and_then(|date| date.and_hms_opt(9, 20, 1))
            .expect("valid timestamp for test");
        assert_eq!(
            report_file_name(ReportKind::Finance, "MONTHLY_2025_10", timestamp),
            "AppleData_finance_MONTHLY_2025_10_20251114_092001.csv"
        );
        assert_eq!(
            report_file_name(ReportKind::Sales, "", timestamp),
            "AppleData_sale_20251114_092001.csv"
        );
    }

    #[test]
    fn part_paths_keep_extension() {
        let (first, second) = part_paths(Path::new("/data/AppleData_finance.csv"));
        assert_eq!(first, Path::new("/data/AppleData_finance_part1.csv"));
        assert_eq!(second, Path::new("/data/AppleData_finance_part2.csv"));

        let (bare, _) = part_paths(Path::new("report"));
        assert_eq!(bare, Path::new("report_part1"));
    }

    #[tokio::test]
    async fn saved_report_reads_back() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let nested = dir.path().join("reports");
        let path = save_report(&nested, ReportKind::Sales, "DAILY_2025_01_15", "A\tB\n1\t2")
            .await
            .expect("should save");
        assert!(path.is_absolute());
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert!(name.starts_with("AppleData_sale_DAILY_2025_01_15_"));
        let content = read_report_file(&path).await.expect("should read");
        assert_eq!(content, "A\tB\n1\t2");
    }

    #[test]
    fn clashing_names_are_numbered() {
        let name = "AppleData_sale_20251114_092001.csv";
        assert_eq!(numbered_file_name(name, 0), name);
        assert_eq!(
            numbered_file_name(name, 2),
            "AppleData_sale_20251114_092001_2.csv"
        );
        assert_eq!(numbered_file_name("report", 1), "report_1");
    }

    #[tokio::test]
    async fn same_second_saves_do_not_overwrite() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let first = save_report(dir.path(), ReportKind::Finance, "MONTHLY_2025_01", "first")
            .await
            .expect("should save");
        let second = save_report(dir.path(), ReportKind::Finance, "MONTHLY_2025_01", "second")
            .await
            .expect("should save");
        assert_ne!(first, second);
        assert_eq!(read_report_file(&first).await.expect("should read"), "first");
        assert_eq!(read_report_file(&second).await.expect("should read"), "second");
    }

    #[tokio::test]
    async fn non_utf8_content_is_invalid_encoding() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("latin1.csv");
        tokio::fs::write(&path, [0x41, 0xff, 0xfe, 0x0a])
            .await
            .expect("should write");
        let err = read_report_file(&path).await.expect_err("should fail");
        assert!(matches!(err, FileError::InvalidEncoding(_)));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = read_report_file(&dir.path().join("absent.csv"))
            .await
            .expect_err("should fail");
        assert!(matches!(err, FileError::NotFound(_)));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("report.unsupported");
        write_text(&path, "test").await.expect("should write");
        let err = read_report_file(&path).await.expect_err("should fail");
        assert!(matches!(err, FileError::UnsupportedExtension(ext) if ext == "unsupported"));
    }

    #[tokio::test]
    async fn extension_check_ignores_case() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("REPORT.TXT");
        write_text(&path, "x").await.expect("should write");
        assert_eq!(read_report_file(&path).await.expect("should read"), "x");
    }
}
