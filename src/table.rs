//! Tab-separated tables recovered from report exports.
//!
//! A [`Table`] owns its header and row values; [`Record`] is a borrowed
//! view pairing one row with the header, in header order.

use serde::{Serialize, Serializer};

use crate::error::SplitError;

/// Field separator used by App Store Connect exports.
pub(crate) const FIELD_SEPARATOR: char = '\t';

/// A header plus zero or more rows of string values.
///
/// Every row holds exactly one value per column. Rows shorter than the
/// header are padded with empty values while parsing; longer rows are
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Table {
    /// Column names in header order.
    columns: Vec<String>,
    /// Row values, each of length `columns.len()`.
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Returns a table with no header and no rows.
    pub(crate) const fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Parses a header line and its data lines.
    ///
    /// `first_data_line` is the 1-based line number of `data[0]` in the
    /// source text, used only for error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::RowArityMismatch`] if a data line has more
    /// fields than the header.
    pub(crate) fn parse(
        header: &str,
        data: &[&str],
        first_data_line: usize,
    ) -> Result<Self, SplitError> {
        let columns: Vec<String> = split_fields(header);
        let mut rows = Vec::with_capacity(data.len());
        for (offset, line) in data.iter().enumerate() {
            let mut values = split_fields(line);
            if values.len() > columns.len() {
                return Err(SplitError::RowArityMismatch {
                    line: first_data_line.saturating_add(offset),
                    expected: columns.len(),
                    found: values.len(),
                });
            }
            values.resize(columns.len(), String::new());
            rows.push(values);
        }
        Ok(Self { columns, rows })
    }

    /// Column names in header order.
    pub(crate) fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of data rows.
    pub(crate) const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no data rows.
    pub(crate) const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column named `name`.
    pub(crate) fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Iterates rows as header-paired records.
    pub(crate) fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Raw row values, one slice per row.
    pub(crate) fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Adds `name` as a new trailing column, or overwrites it if present.
    ///
    /// `values` is consumed in row order; rows beyond its length keep
    /// their previous value (or an empty one for a new column).
    pub(crate) fn set_column(&mut self, name: &str, values: Vec<String>) {
        let index = if let Some(existing) = self.column_index(name) {
            existing
        } else {
            self.columns.push(name.to_owned());
            for row in &mut self.rows {
                row.push(String::new());
            }
            self.columns.len().saturating_sub(1)
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            if let Some(slot) = row.get_mut(index) {
                *slot = value;
            }
        }
    }

    /// Serializes the table back to tab-separated text.
    ///
    /// An empty table (no header) serializes to the empty string.
    pub(crate) fn to_tsv(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }
        let separator = FIELD_SEPARATOR.to_string();
        core::iter::once(&self.columns)
            .chain(self.rows.iter())
            .map(|fields| fields.join(separator.as_str()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One table row paired with its header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Record<'table> {
    /// Header of the owning table.
    columns: &'table [String],
    /// Values of this row.
    values: &'table [String],
}

impl<'table> Record<'table> {
    /// Value of the first column named `column`.
    pub(crate) fn get(&self, column: &str) -> Option<&'table str> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.values.get(index).map(String::as_str)
    }

    /// `(column, value)` pairs in header order.
    pub(crate) fn fields(&self) -> impl Iterator<Item = (&'table str, &'table str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// Serializes as a JSON object keyed by column name.
impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields())
    }
}

/// Splits one line on the field separator.
fn split_fields(line: &str) -> Vec<String> {
    line.split(FIELD_SEPARATOR).map(str::to_owned).collect()
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use super::Table;
    use crate::error::SplitError;

    #[test]
    fn record_has_one_field_per_column_in_header_order() {
        let table = Table::parse("A\tB\tC", &["1\t2\t3"], 2).expect("should parse");
        let record = table.records().next().expect("one record");
        let fields: Vec<(&str, &str)> = record.fields().collect();
        assert_eq!(fields, vec![("A", "1"), ("B", "2"), ("C", "3")]);
    }

    #[test]
    fn short_rows_are_padded() {
        let table = Table::parse("A\tB\tC", &["1"], 2).expect("should parse");
        let record = table.records().next().expect("one record");
        assert_eq!(record.get("A"), Some("1"));
        assert_eq!(record.get("C"), Some(""));
    }

    #[test]
    fn long_rows_are_rejected_with_line_number() {
        let err = Table::parse("A\tB", &["1\t2", "1\t2\t3"], 2).expect_err("should reject");
        assert_eq!(
            err,
            SplitError::RowArityMismatch {
                line: 3,
                expected: 2,
                found: 3,
            }
        );
    }

    #[test]
    fn header_only_table_has_no_rows() {
        let table = Table::parse("A\tB", &[], 2).expect("should parse");
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["A", "B"]);
        assert_eq!(table.to_tsv(), "A\tB");
    }

    #[test]
    fn empty_table_serializes_to_empty_string() {
        assert_eq!(Table::empty().to_tsv(), "");
    }

    #[test]
    fn set_column_appends_then_overwrites() {
        let mut table = Table::parse("A", &["x", "y"], 2).expect("should parse");
        table.set_column("hash", vec!["h1".to_owned(), "h2".to_owned()]);
        assert_eq!(table.to_tsv(), "A\thash\nx\th1\ny\th2");
        table.set_column("hash", vec!["h3".to_owned(), "h4".to_owned()]);
        assert_eq!(table.to_tsv(), "A\thash\nx\th3\ny\th4");
    }

    #[test]
    fn records_serialize_as_objects() {
        let table = Table::parse("H1\tH2", &["a\tb", "c"], 2).expect("should parse");
        let records: Vec<_> = table.records().collect();
        let json = serde_json::to_value(&records).expect("should serialize");
        assert_eq!(
            json,
            serde_json::json!([
                {"H1": "a", "H2": "b"},
                {"H1": "c", "H2": ""},
            ])
        );
    }
}
