//! SQLite explorer, backed by `sqlite_master` and the pragma table functions.

use super::{Explorer, ExplorerOptions, require_columns, require_table, tables_from_result};
use crate::db::dialect::{quote_literal, quote_name};
use crate::db::types::NULL_CELL;
use crate::error::DbResult;
use crate::models::{Dialect, SQLITE_SCHEMA, Table, TabularResult};
use crate::db::deadline::sqlite as deadline;
use sqlx::{Sqlite, SqlitePool};

mod queries {
    pub const LIST_TABLES: &str = "SELECT name AS table_name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name";

    pub const TABLE_INFO: &str = "SELECT * FROM pragma_table_info({table})";

    pub const INDEX_LIST: &str = "SELECT * FROM pragma_index_list({table})";

    pub const FOREIGN_KEY_LIST: &str = "SELECT * FROM pragma_foreign_key_list({table})";
}

/// Columns of the merged constraints result.
pub const CONSTRAINT_COLUMNS: [&str; 6] = [
    "constraint_type",
    "column",
    "referenced_table",
    "referenced_column",
    "on_update",
    "on_delete",
];

impl_fetch_tabular!(Sqlite, deadline);

#[derive(Debug, Clone)]
pub struct SqliteExplorer {
    pool: SqlitePool,
    path: String,
    options: ExplorerOptions,
}

impl SqliteExplorer {
    pub fn new(pool: SqlitePool, path: impl Into<String>, options: ExplorerOptions) -> Self {
        Self {
            pool,
            path: path.into(),
            options,
        }
    }

    async fn pragma(&self, template: &str, table: &str, context: &str) -> DbResult<TabularResult> {
        require_table(table)?;
        let sql = template.replace("{table}", &quote_literal(table));
        fetch_tabular(&self.pool, &sql, context, self.options.query_timeout).await
    }
}

impl Explorer for SqliteExplorer {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn database(&self) -> &str {
        &self.path
    }

    async fn get_tables(&self) -> DbResult<Vec<Table>> {
        let result = fetch_tabular(
            &self.pool,
            queries::LIST_TABLES,
            "get tables",
            self.options.query_timeout,
        )
        .await?;
        Ok(tables_from_result(&result, SQLITE_SCHEMA))
    }

    async fn get_rows(&self, table: &str) -> DbResult<TabularResult> {
        require_table(table)?;
        // SQLite has no schemas to qualify with; a dot is part of the name.
        let sql = format!("SELECT * FROM {}", quote_name(table, '"'));
        let context = format!("get rows of {table}");
        fetch_tabular(&self.pool, &sql, &context, self.options.query_timeout).await
    }

    async fn get_columns(&self, table: &str) -> DbResult<TabularResult> {
        let context = format!("get columns of {table}");
        let result = self.pragma(queries::TABLE_INFO, table, &context).await?;
        require_columns(result, table)
    }

    async fn get_indexes(&self, table: &str) -> DbResult<TabularResult> {
        let context = format!("get indexes of {table}");
        self.pragma(queries::INDEX_LIST, table, &context).await
    }

    /// Foreign keys followed by primary key columns, in one uniform shape.
    async fn get_constraints(&self, table: &str) -> DbResult<TabularResult> {
        let context = format!("get constraints of {table}");
        let foreign_keys = self
            .pragma(queries::FOREIGN_KEY_LIST, table, &context)
            .await?;
        let table_info = self.pragma(queries::TABLE_INFO, table, &context).await?;
        Ok(merge_constraints(&foreign_keys, &table_info))
    }

    async fn execute(&self, statement: &str) -> DbResult<()> {
        execute_statement(&self.pool, statement, self.options.query_timeout).await
    }
}

fn merge_constraints(foreign_keys: &TabularResult, table_info: &TabularResult) -> TabularResult {
    let mut merged = TabularResult::new(CONSTRAINT_COLUMNS.iter().map(|c| c.to_string()).collect());

    let cell = |result: &TabularResult, row: &[String], column: &str| -> String {
        result
            .column_index(column)
            .and_then(|i| row.get(i))
            .cloned()
            .unwrap_or_else(|| NULL_CELL.to_string())
    };

    for row in &foreign_keys.rows {
        merged.push_row(vec![
            "FOREIGN KEY".to_string(),
            cell(foreign_keys, row, "from"),
            cell(foreign_keys, row, "table"),
            cell(foreign_keys, row, "to"),
            cell(foreign_keys, row, "on_update"),
            cell(foreign_keys, row, "on_delete"),
        ]);
    }

    for row in &table_info.rows {
        let pk_position = cell(table_info, row, "pk").parse::<i64>().unwrap_or(0);
        if pk_position > 0 {
            merged.push_row(vec![
                "PRIMARY KEY".to_string(),
                cell(table_info, row, "name"),
                NULL_CELL.to_string(),
                NULL_CELL.to_string(),
                NULL_CELL.to_string(),
                NULL_CELL.to_string(),
            ]);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::{Duration, Instant};

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn result(columns: &[&str], rows: &[&[&str]]) -> TabularResult {
        let mut r = TabularResult::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            r.push_row(row.iter().map(|c| c.to_string()).collect());
        }
        r
    }

    #[test]
    fn test_merge_constraints_uniform_shape() {
        let fks = result(
            &["id", "seq", "table", "from", "to", "on_update", "on_delete", "match"],
            &[&["0", "0", "users", "user_id", "id", "NO ACTION", "CASCADE", "NONE"]],
        );
        let info = result(
            &["cid", "name", "type", "notnull", "dflt_value", "pk"],
            &[
                &["0", "id", "INTEGER", "0", "NULL", "1"],
                &["1", "user_id", "INTEGER", "0", "NULL", "0"],
            ],
        );

        let merged = merge_constraints(&fks, &info);
        assert_eq!(merged.columns, CONSTRAINT_COLUMNS);
        assert!(merged.is_rectangular());
        assert_eq!(
            merged.rows,
            vec![
                vec!["FOREIGN KEY", "user_id", "users", "id", "NO ACTION", "CASCADE"],
                vec!["PRIMARY KEY", "id", "NULL", "NULL", "NULL", "NULL"],
            ]
        );
    }

    #[test]
    fn test_merge_constraints_without_keys() {
        let fks = TabularResult::default();
        let info = result(
            &["cid", "name", "type", "notnull", "dflt_value", "pk"],
            &[&["0", "body", "TEXT", "0", "NULL", "0"]],
        );
        let merged = merge_constraints(&fks, &info);
        assert!(merged.is_empty());
        assert_eq!(merged.columns.len(), 6);
    }

    #[tokio::test]
    async fn test_empty_result_describe_failure_is_an_error() {
        let pool = memory_pool().await;
        // The CREATE succeeds when run, so describing the same text afterwards fails.
        let err = fetch_tabular(
            &pool,
            "CREATE TABLE t (x INTEGER); SELECT * FROM t",
            "load t",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::Query { ref context, .. } if context == "load t"));
    }

    #[tokio::test]
    async fn test_empty_result_keeps_described_columns() {
        let pool = memory_pool().await;
        execute_statement(&pool, "CREATE TABLE t (x INTEGER, y TEXT)", Duration::from_secs(5))
            .await
            .unwrap();
        let result = fetch_tabular(&pool, "SELECT * FROM t", "load t", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["x", "y"]);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_interrupts_statement_and_frees_connection() {
        let pool = memory_pool().await;
        let started = Instant::now();
        let err = execute_statement(
            &pool,
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 500000000) \
             SELECT count(*) FROM c",
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::Timeout { .. }));

        let result = fetch_tabular(&pool, "SELECT 1 AS one", "follow-up", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.rows, vec![vec!["1"]]);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
