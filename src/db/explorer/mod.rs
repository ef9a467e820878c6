//! Schema and data exploration.
//!
//! Each dialect answers the same six questions: which tables exist, what rows,
//! columns, indexes and constraints a table has, and "run this statement".
//! Results come back as [`TabularResult`] with every cell rendered as text, so
//! callers can print them without knowing which database produced them.
//!
//! # Architecture
//!
//! Catalog SQL lives in a `queries` submodule per dialect. Table names are
//! interpolated, never bound: identifiers are quoted with the dialect's quote
//! character and catalog filters use escaped string literals.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlExplorer;
pub use postgres::PostgresExplorer;
pub use sqlite::SqliteExplorer;

use crate::error::{DbError, DbResult};
use crate::models::{Dialect, Table, TabularResult};
use std::future::Future;
use std::time::Duration;

/// Default time allowed for a single explorer query (seconds).
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Settings shared by every explorer.
#[derive(Debug, Clone)]
pub struct ExplorerOptions {
    pub query_timeout: Duration,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

/// Uniform exploration interface over one open connection.
///
/// `table` arguments may be schema-qualified (`schema.table`) where the
/// dialect has schemas.
pub trait Explorer: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Database (MySQL, PostgreSQL) or file (SQLite) this explorer reads.
    fn database(&self) -> &str;

    fn get_tables(&self) -> impl Future<Output = DbResult<Vec<Table>>> + Send;

    /// Every row of the table, unfiltered and unpaged.
    fn get_rows(&self, table: &str) -> impl Future<Output = DbResult<TabularResult>> + Send;

    /// Column metadata. Fails when the table does not exist.
    fn get_columns(&self, table: &str) -> impl Future<Output = DbResult<TabularResult>> + Send;

    fn get_indexes(&self, table: &str) -> impl Future<Output = DbResult<TabularResult>> + Send;

    fn get_constraints(&self, table: &str)
    -> impl Future<Output = DbResult<TabularResult>> + Send;

    /// Run an arbitrary statement, discarding any result rows.
    fn execute(&self, statement: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Explorer for whichever dialect a DSN classified as.
#[derive(Debug, Clone)]
pub enum AnyExplorer {
    MySql(MySqlExplorer),
    Postgres(PostgresExplorer),
    Sqlite(SqliteExplorer),
}

impl Explorer for AnyExplorer {
    fn dialect(&self) -> Dialect {
        impl_explorer_dispatch!(self, e => e.dialect())
    }

    fn database(&self) -> &str {
        impl_explorer_dispatch!(self, e => e.database())
    }

    async fn get_tables(&self) -> DbResult<Vec<Table>> {
        impl_explorer_dispatch!(self, e => e.get_tables().await)
    }

    async fn get_rows(&self, table: &str) -> DbResult<TabularResult> {
        impl_explorer_dispatch!(self, e => e.get_rows(table).await)
    }

    async fn get_columns(&self, table: &str) -> DbResult<TabularResult> {
        impl_explorer_dispatch!(self, e => e.get_columns(table).await)
    }

    async fn get_indexes(&self, table: &str) -> DbResult<TabularResult> {
        impl_explorer_dispatch!(self, e => e.get_indexes(table).await)
    }

    async fn get_constraints(&self, table: &str) -> DbResult<TabularResult> {
        impl_explorer_dispatch!(self, e => e.get_constraints(table).await)
    }

    async fn execute(&self, statement: &str) -> DbResult<()> {
        impl_explorer_dispatch!(self, e => e.execute(statement).await)
    }
}

/// Reject an empty table argument before any SQL is built.
fn require_table(table: &str) -> DbResult<()> {
    if table.trim().is_empty() {
        return Err(DbError::validation("table"));
    }
    Ok(())
}

/// Catalogs answer an unknown table with zero rows, not an error.
fn require_columns(result: TabularResult, table: &str) -> DbResult<TabularResult> {
    if result.is_empty() {
        return Err(DbError::query(
            format!("get columns of {table}"),
            format!("table '{table}' not found"),
            None,
        ));
    }
    Ok(result)
}

/// Split `schema.table`; an unqualified name has no schema.
fn split_qualified(table: &str) -> (Option<&str>, &str) {
    match table.split_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (None, table),
    }
}

/// Build tables from a two-column (name, schema) catalog result.
fn tables_from_result(result: &TabularResult, default_schema: &str) -> Vec<Table> {
    let name_idx = result.column_index("table_name").unwrap_or(0);
    let schema_idx = result.column_index("table_schema");
    result
        .rows
        .iter()
        .filter_map(|row| {
            let name = row.get(name_idx)?;
            let schema = schema_idx
                .and_then(|i| row.get(i))
                .map(String::as_str)
                .unwrap_or(default_schema);
            Some(Table::new(name.as_str(), schema))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("public.users"), (Some("public"), "users"));
        assert_eq!(split_qualified("users"), (None, "users"));
    }

    #[test]
    fn test_require_columns_rejects_empty() {
        let empty = TabularResult::new(vec!["cid".into(), "name".into()]);
        let err = require_columns(empty, "ghost").unwrap_err();
        assert_eq!(
            err.to_string(),
            "get columns of ghost: table 'ghost' not found"
        );
    }

    #[test]
    fn test_require_table() {
        assert!(require_table("users").is_ok());
        assert!(matches!(
            require_table("  ").unwrap_err(),
            DbError::Validation { field: "table" }
        ));
    }

    #[test]
    fn test_tables_from_result() {
        let mut result = TabularResult::new(vec!["table_name".into(), "table_schema".into()]);
        result.push_row(vec!["users".into(), "public".into()]);
        result.push_row(vec!["orders".into(), "sales".into()]);
        let tables = tables_from_result(&result, "ignored");
        assert_eq!(
            tables,
            vec![Table::new("users", "public"), Table::new("orders", "sales")]
        );

        let mut names_only = TabularResult::new(vec!["table_name".into()]);
        names_only.push_row(vec!["notes".into()]);
        assert_eq!(
            tables_from_result(&names_only, "main"),
            vec![Table::new("notes", "main")]
        );
    }
}
