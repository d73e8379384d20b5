//! PostgreSQL loading and read-only querying.
//!
//! Connections are opened per call against a database chosen by the
//! caller; the DSN supplies host, port and credentials.

use core::fmt;
use core::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Row};
use tracing::{info, instrument, warn};

use crate::error::DatabaseError;
use crate::table::Table;

/// Database used to issue `CREATE DATABASE`.
const MAINTENANCE_DATABASE: &str = "postgres";

/// Row cap for read-only queries.
const MAX_ROWS: usize = 500;

/// What to do when the target table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum IfExists {
    /// Insert into the existing table.
    #[default]
    Append,
    /// Drop and recreate the table.
    Replace,
    /// Refuse to load.
    Fail,
}

impl FromStr for IfExists {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "replace" => Ok(Self::Replace),
            "fail" => Ok(Self::Fail),
            _ => Err(format!(
                "unknown if_exists '{value}', expected append, replace or fail"
            )),
        }
    }
}

/// Entry point to the configured PostgreSQL server.
#[derive(Clone)]
pub(crate) struct Database {
    /// Parsed DSN, if one was configured.
    options: Option<PgConnectOptions>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("configured", &self.options.is_some())
            .finish()
    }
}

impl Database {
    /// Parses `dsn` once; `None` leaves the database unconfigured.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Sqlx`] if the DSN does not parse.
    pub(crate) fn new(dsn: Option<&str>) -> Result<Self, DatabaseError> {
        let options = dsn.map(PgConnectOptions::from_str).transpose()?;
        Ok(Self { options })
    }

    /// Opens a connection, optionally switching to `dbname`.
    async fn connect(&self, dbname: Option<&str>) -> Result<PgConnection, DatabaseError> {
        let base = self.options.as_ref().ok_or(DatabaseError::MissingDsn)?;
        let options = match dbname {
            Some(name) => base.clone().database(name),
            None => base.clone(),
        };
        Ok(PgConnection::connect_with(&options).await?)
    }

    /// Creates `dbname` unless it already exists.
    async fn ensure_database(&self, dbname: &str) -> Result<(), DatabaseError> {
        let mut admin = self.connect(Some(MAINTENANCE_DATABASE)).await?;
        let existing: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
                .bind(dbname)
                .fetch_optional(&mut admin)
                .await?;
        if existing.is_none() {
            let statement = format!("CREATE DATABASE {}", quote_ident(dbname));
            let _created = sqlx::query(&statement).execute(&mut admin).await?;
            info!(dbname, "created database");
        }
        admin.close().await?;
        Ok(())
    }

    /// Writes every row of `table` to `public.<table_name>` in `dbname`.
    ///
    /// The database is created if missing. All columns are `TEXT`; empty
    /// values are stored as `NULL`. Rows are inserted in one transaction.
    ///
    /// # Errors
    ///
    /// See [`DatabaseError`].
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub(crate) async fn load_table(
        &self,
        dbname: &str,
        table_name: &str,
        table: &Table,
        if_exists: IfExists,
    ) -> Result<usize, DatabaseError> {
        let _dbname = validate_identifier(dbname)?;
        let _table_name = validate_identifier(table_name)?;
        if table.columns().is_empty() {
            return Err(DatabaseError::NoColumns);
        }
        if table.is_empty() {
            warn!(table_name, "table has no rows, only its schema will be created");
        }

        self.ensure_database(dbname).await?;
        let mut conn = self.connect(Some(dbname)).await?;
        let mut tx = conn.begin().await?;

        let qualified = format!("public.{}", quote_ident(table_name));
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1::text) IS NOT NULL")
            .bind(&qualified)
            .fetch_one(&mut *tx)
            .await?;
        if existing_table_action(if_exists, exists, table_name)? == TableAction::DropAndCreate {
            let _dropped = sqlx::query(&format!("DROP TABLE {qualified}"))
                .execute(&mut *tx)
                .await?;
            info!(table_name, "dropped existing table");
        }

        let _created = sqlx::query(&create_table_statement(&qualified, table.columns()))
            .execute(&mut *tx)
            .await?;

        let insert = insert_statement(&qualified, table.columns());
        for row in table.rows() {
            let mut query = sqlx::query(&insert);
            for value in row {
                query = query.bind(nullable(value));
            }
            let _inserted = query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        conn.close().await?;
        info!(dbname, table_name, rows = table.len(), "table loaded");
        Ok(table.len())
    }

    /// Runs a `SELECT`/`WITH` query and returns its rows as a JSON array.
    ///
    /// At most 500 rows are returned; a notice is appended when the cap is
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NotReadOnly`] for any other statement.
    #[instrument(skip(self))]
    pub(crate) async fn read_query(
        &self,
        dbname: Option<&str>,
        sql: &str,
    ) -> Result<String, DatabaseError> {
        if let Some(name) = dbname {
            let _dbname = validate_identifier(name)?;
        }
        let statement = sql.trim().trim_end_matches(';');
        if !is_read_only(statement) {
            return Err(DatabaseError::NotReadOnly);
        }

        let mut conn = self.connect(dbname).await?;
        let wrapped = format!("SELECT row_to_json(q) AS r FROM ({statement}) q LIMIT {MAX_ROWS}");
        let rows = sqlx::query(&wrapped).fetch_all(&mut conn).await?;
        conn.close().await?;

        let values = rows
            .iter()
            .map(|row| row.try_get::<serde_json::Value, _>("r"))
            .collect::<Result<Vec<_>, _>>()?;
        let count = values.len();
        let json = serde_json::to_string_pretty(&serde_json::Value::Array(values))
            .unwrap_or_else(|_err| "[]".to_owned());
        Ok(if count == MAX_ROWS {
            format!("{json}\n\nResults truncated to {MAX_ROWS} rows.")
        } else {
            json
        })
    }
}

/// How `load_table` treats the target table before inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableAction {
    /// Create the table if missing, keep existing rows.
    CreateIfMissing,
    /// Drop the existing table, then create it.
    DropAndCreate,
}

/// Decides what to do with the target table given whether it exists.
fn existing_table_action(
    if_exists: IfExists,
    exists: bool,
    table_name: &str,
) -> Result<TableAction, DatabaseError> {
    match if_exists {
        IfExists::Fail if exists => Err(DatabaseError::TableExists(table_name.to_owned())),
        IfExists::Replace if exists => Ok(TableAction::DropAndCreate),
        IfExists::Append | IfExists::Replace | IfExists::Fail => Ok(TableAction::CreateIfMissing),
    }
}

/// Value bound for one field; empty text becomes `NULL`.
fn nullable(value: &str) -> Option<&str> {
    Some(value).filter(|text| !text.is_empty())
}

/// Accepts names made of ASCII letters, digits and `_`.
fn validate_identifier(name: &str) -> Result<&str, DatabaseError> {
    if !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_owned()))
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `true` for statements starting with `SELECT` or `WITH`.
fn is_read_only(sql: &str) -> bool {
    let normalized = sql.trim_start().to_ascii_uppercase();
    normalized.starts_with("SELECT") || normalized.starts_with("WITH")
}

/// `CREATE TABLE IF NOT EXISTS` with one `TEXT` column per header name.
fn create_table_statement(qualified: &str, columns: &[String]) -> String {
    let definitions = columns
        .iter()
        .map(|column| format!("{} TEXT", quote_ident(column)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {qualified} ({definitions})")
}

/// Parameterised `INSERT` for one row.
fn insert_statement(qualified: &str, columns: &[String]) -> String {
    let names = columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|position| format!("${position}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {qualified} ({names}) VALUES ({placeholders})")
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use super::{
        Database, IfExists, TableAction, create_table_statement, existing_table_action,
        insert_statement, is_read_only, nullable, quote_ident, validate_identifier,
    };
    use crate::error::DatabaseError;
    use crate::table::Table;

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|column| (*column).to_owned()).collect()
    }

    #[test]
    fn identifiers_are_restricted() {
        assert!(validate_identifier("apple_sales_2025").is_ok());
        assert!(matches!(
            validate_identifier("sales; DROP TABLE x"),
            Err(DatabaseError::InvalidIdentifier(_))
        ));
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn quoting_escapes_embedded_quotes() {
        assert_eq!(quote_ident("Country Of Sale"), "\"Country Of Sale\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn only_select_and_with_are_read_only() {
        assert!(is_read_only("select * from apple_sales"));
        assert!(is_read_only("  WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(!is_read_only("DELETE FROM apple_sales"));
        assert!(!is_read_only("COMMENT ON TABLE x IS 'y'"));
    }

    #[test]
    fn statements_quote_every_column() {
        let columns = names(&["Start Date", "Units"]);
        assert_eq!(
            create_table_statement("public.\"sales\"", &columns),
            "CREATE TABLE IF NOT EXISTS public.\"sales\" (\"Start Date\" TEXT, \"Units\" TEXT)"
        );
        assert_eq!(
            insert_statement("public.\"sales\"", &columns),
            "INSERT INTO public.\"sales\" (\"Start Date\", \"Units\") VALUES ($1, $2)"
        );
    }

    #[test]
    fn empty_values_bind_as_null() {
        assert_eq!(nullable(""), None);
        assert_eq!(nullable("0"), Some("0"));
        assert_eq!(nullable(" "), Some(" "));
    }

    #[test]
    fn existing_table_honours_if_exists() {
        assert_eq!(
            existing_table_action(IfExists::Replace, true, "sales").expect("should plan"),
            TableAction::DropAndCreate
        );
        assert_eq!(
            existing_table_action(IfExists::Append, true, "sales").expect("should plan"),
            TableAction::CreateIfMissing
        );
        assert!(matches!(
            existing_table_action(IfExists::Fail, true, "sales"),
            Err(DatabaseError::TableExists(name)) if name == "sales"
        ));
    }

    #[test]
    fn missing_table_is_always_created() {
        for if_exists in [IfExists::Append, IfExists::Replace, IfExists::Fail] {
            assert_eq!(
                existing_table_action(if_exists, false, "sales").expect("should plan"),
                TableAction::CreateIfMissing
            );
        }
    }

    #[test]
    fn if_exists_parses() {
        assert_eq!("Replace".parse::<IfExists>(), Ok(IfExists::Replace));
        assert_eq!("append".parse::<IfExists>(), Ok(IfExists::Append));
        assert_eq!("FAIL".parse::<IfExists>(), Ok(IfExists::Fail));
        assert!("merge".parse::<IfExists>().is_err());
    }

    #[test]
    fn malformed_dsn_is_rejected() {
        assert!(Database::new(Some("definitely not a dsn")).is_err());
    }

    #[tokio::test]
    async fn unconfigured_database_reports_missing_dsn() {
        let database = Database::new(None).expect("no DSN is valid");
        let table = Table::parse("a", &["1"], 2).expect("should parse");
        let load_err = database
            .load_table("test_db", "apple_sales", &table, IfExists::Append)
            .await
            .expect_err("should fail");
        assert!(matches!(load_err, DatabaseError::MissingDsn));

        let query_err = database
            .read_query(None, "SELECT 1")
            .await
            .expect_err("should fail");
        assert!(matches!(query_err, DatabaseError::MissingDsn));
    }

    #[tokio::test]
    async fn writes_are_refused_before_connecting() {
        let database = Database::new(None).expect("no DSN is valid");
        let err = database
            .read_query(Some("test_db"), "DROP TABLE apple_sales;")
            .await
            .expect_err("should fail");
        assert!(matches!(err, DatabaseError::NotReadOnly));
    }

    #[tokio::test]
    async fn header_less_table_is_refused() {
        let database = Database::new(None).expect("no DSN is valid");
        let err = database
            .load_table("test_db", "apple_sales", &Table::empty(), IfExists::Append)
            .await
            .expect_err("should fail");
        assert!(matches!(err, DatabaseError::NoColumns));
    }
}
