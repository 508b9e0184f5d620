//! SQLite-backed storage for imported sheets and validation queries.
//!
//! The store wraps a single `rusqlite` connection. Imported sheets become
//! ordinary tables, checks run as ordinary SQL, and results come back as
//! [`QueryOutput`] rows of [`Value`] cells ready for the comparison engine.

use std::fmt;
use std::path::PathBuf;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use thiserror::Error;

/// Store placement: a throwaway in-memory database (the default) or a
/// scratch file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMode {
    Memory,
    Disk(PathBuf),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot create table '{table}' without columns")]
    EmptyTable { table: String },
}

/// A single cell value moving between SQLite and the comparison engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Column affinity assigned to an imported sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Real,
    Text,
}

impl Affinity {
    pub fn sql_type(self) -> &'static str {
        match self {
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Text => "TEXT",
        }
    }
}

/// Rows returned by a query, with their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The single cell of a one-row, one-column result, if that is the shape.
    pub fn scalar(&self) -> Option<&Value> {
        if self.rows.len() == 1 && self.rows[0].len() == 1 {
            Some(&self.rows[0][0])
        } else {
            None
        }
    }

    /// Canonical string form of the whole row sequence: `[]` when empty,
    /// otherwise `[(a, b), (c, d)]`. The generic comparison rule and the
    /// report's Actual Result column both use this rendering, so a reported
    /// actual value can be pasted straight back in as an expected value.
    pub fn render_rows(&self) -> String {
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                format!("({})", cells.join(", "))
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }
}

/// Result of a single SQL statement: rows for queries, an affected-row count
/// for everything else.
#[derive(Debug)]
pub enum SqlOutcome {
    Rows(QueryOutput),
    Statement { rows_affected: usize },
}

/// Quote an identifier for direct inclusion in SQL text.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The embedded relational store. One connection per session.
pub struct SqlStore {
    conn: Connection,
    mode: StoreMode,
}

impl SqlStore {
    //////////////////////////////////////////////////////////////
    ///  Public API
    //////////////////////////////////////////////////////////////

    /// Open a store. Disk mode removes any stale scratch file first so that
    /// every session starts from an empty database.
    pub fn open(mode: StoreMode) -> Result<Self, StoreError> {
        let conn = match &mode {
            StoreMode::Memory => Connection::open_in_memory()?,
            StoreMode::Disk(path) => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
                Connection::open(path)?
            }
        };
        Ok(SqlStore { conn, mode })
    }

    pub fn mode(&self) -> &StoreMode {
        &self.mode
    }

    /// Execute one SQL statement. Statements that return columns collect all
    /// of their rows; everything else (DDL and DML) executes and reports the
    /// affected row count.
    pub fn run_sql(&self, sql: &str) -> Result<SqlOutcome, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            let rows_affected = stmt.execute([])?;
            return Ok(SqlOutcome::Statement { rows_affected });
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();
        let mut rows = Vec::new();
        let mut raw = stmt.query([])?;
        while let Some(row) = raw.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                cells.push(Value::from(row.get_ref(idx)?));
            }
            rows.push(cells);
        }
        Ok(SqlOutcome::Rows(QueryOutput { columns, rows }))
    }

    /// Run a statement and collect whatever rows it produces. A statement
    /// that returns no columns executes and yields an empty output, which is
    /// how checks written as INSERT/UPDATE/DELETE present to the comparison
    /// engine.
    pub fn query(&self, sql: &str) -> Result<QueryOutput, StoreError> {
        match self.run_sql(sql)? {
            SqlOutcome::Rows(output) => Ok(output),
            SqlOutcome::Statement { .. } => Ok(QueryOutput::default()),
        }
    }

    /// Names of all user tables, alphabetically.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let output =
            self.query("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        Ok(output
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(|name| name.to_string())
            .collect())
    }

    /// The first `limit` rows of a table.
    pub fn preview(&self, table: &str, limit: usize) -> Result<QueryOutput, StoreError> {
        let sql = format!("SELECT * FROM {} LIMIT {}", quote_ident(table), limit);
        self.query(&sql)
    }

    pub fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
        Ok(())
    }

    /// Create `table` with the given columns, replacing any previous table of
    /// the same name.
    pub fn create_table(
        &self,
        table: &str,
        columns: &[String],
        affinities: &[Affinity],
    ) -> Result<(), StoreError> {
        if columns.is_empty() {
            return Err(StoreError::EmptyTable {
                table: table.to_string(),
            });
        }
        self.drop_table(table)?;
        let column_defs: Vec<String> = columns
            .iter()
            .zip(affinities.iter())
            .map(|(name, affinity)| format!("{} {}", quote_ident(name), affinity.sql_type()))
            .collect();
        let sql = format!(
            "CREATE TABLE {} ({})",
            quote_ident(table),
            column_defs.join(", ")
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    /// Insert rows inside a single transaction with one prepared statement.
    pub fn insert_rows(&mut self, table: &str, rows: &[Vec<Value>]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; rows[0].len()].join(", ");
        let sql = format!(
            "INSERT INTO {} VALUES ({})",
            quote_ident(table),
            placeholders
        );
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_people() -> SqlStore {
        let mut store = SqlStore::open(StoreMode::Memory).unwrap();
        store
            .create_table(
                "data.people",
                &[
                    "id".to_string(),
                    "name".to_string(),
                    "score".to_string(),
                ],
                &[Affinity::Integer, Affinity::Text, Affinity::Real],
            )
            .unwrap();
        store
            .insert_rows(
                "data.people",
                &[
                    vec![
                        Value::Integer(1),
                        Value::Text("alice".to_string()),
                        Value::Real(91.5),
                    ],
                    vec![
                        Value::Integer(2),
                        Value::Text("bob".to_string()),
                        Value::Null,
                    ],
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_create_insert_and_query_roundtrip() {
        let store = store_with_people();
        let output = store
            .query("SELECT id, name FROM \"data.people\" ORDER BY id")
            .unwrap();

        assert_eq!(output.columns, vec!["id", "name"]);
        assert_eq!(output.row_count(), 2);
        assert_eq!(
            output.rows[0],
            vec![Value::Integer(1), Value::Text("alice".to_string())]
        );
    }

    #[test]
    fn test_query_on_dml_yields_empty_output() {
        let store = store_with_people();
        let output = store
            .query("UPDATE \"data.people\" SET name = 'carol' WHERE id = 2")
            .unwrap();

        assert!(output.is_empty(), "DML should present as zero rows");
        assert!(output.columns.is_empty());

        let check = store
            .query("SELECT name FROM \"data.people\" WHERE id = 2")
            .unwrap();
        assert_eq!(check.rows[0][0], Value::Text("carol".to_string()));
    }

    #[test]
    fn test_run_sql_reports_affected_rows_for_statements() {
        let store = store_with_people();
        match store.run_sql("DELETE FROM \"data.people\"").unwrap() {
            SqlOutcome::Statement { rows_affected } => assert_eq!(rows_affected, 2),
            SqlOutcome::Rows(_) => panic!("DELETE should not produce rows"),
        }
    }

    #[test]
    fn test_table_names_sorted() {
        let store = store_with_people();
        store
            .create_table("aaa", &["x".to_string()], &[Affinity::Text])
            .unwrap();
        assert_eq!(store.table_names().unwrap(), vec!["aaa", "data.people"]);
    }

    #[test]
    fn test_preview_respects_limit() {
        let store = store_with_people();
        let output = store.preview("data.people", 1).unwrap();
        assert_eq!(output.row_count(), 1);
        assert_eq!(output.columns, vec!["id", "name", "score"]);
    }

    #[test]
    fn test_drop_table_removes_it() {
        let store = store_with_people();
        store.drop_table("data.people").unwrap();
        assert!(store.table_names().unwrap().is_empty());
        // Dropping again is a no-op
        store.drop_table("data.people").unwrap();
    }

    #[test]
    fn test_create_table_replaces_previous_contents() {
        let mut store = store_with_people();
        store
            .create_table("data.people", &["only".to_string()], &[Affinity::Text])
            .unwrap();
        store
            .insert_rows(
                "data.people",
                &[vec![Value::Text("fresh".to_string())]],
            )
            .unwrap();

        let output = store.query("SELECT * FROM \"data.people\"").unwrap();
        assert_eq!(output.columns, vec!["only"]);
        assert_eq!(output.row_count(), 1);
    }

    #[test]
    fn test_create_table_without_columns_is_an_error() {
        let store = SqlStore::open(StoreMode::Memory).unwrap();
        let result = store.create_table("empty", &[], &[]);
        assert!(matches!(result, Err(StoreError::EmptyTable { .. })));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Real(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn test_render_rows_shapes() {
        let empty = QueryOutput::default();
        assert_eq!(empty.render_rows(), "[]");

        let output = QueryOutput {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![
                vec![Value::Integer(1), Value::Text("x".to_string())],
                vec![Value::Null, Value::Real(0.5)],
            ],
        };
        assert_eq!(output.render_rows(), "[(1, x), (NULL, 0.5)]");
    }

    #[test]
    fn test_scalar_only_for_one_by_one() {
        let one = QueryOutput {
            columns: vec!["n".to_string()],
            rows: vec![vec![Value::Integer(5)]],
        };
        assert_eq!(one.scalar(), Some(&Value::Integer(5)));

        let wide = QueryOutput {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![Value::Integer(1), Value::Integer(2)]],
        };
        assert_eq!(wide.scalar(), None);
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_disk_mode_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.db");

        {
            let store = SqlStore::open(StoreMode::Disk(path.clone())).unwrap();
            store
                .create_table("left_over", &["x".to_string()], &[Affinity::Text])
                .unwrap();
            assert_eq!(store.mode(), &StoreMode::Disk(path.clone()));
        }

        let store = SqlStore::open(StoreMode::Disk(path)).unwrap();
        assert!(
            store.table_names().unwrap().is_empty(),
            "reopening must replace the scratch file"
        );
    }
}
