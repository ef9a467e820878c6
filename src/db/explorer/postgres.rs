//! PostgreSQL explorer, backed by `pg_catalog` and `information_schema`.

use super::{
    Explorer, ExplorerOptions, require_columns, require_table, split_qualified,
    tables_from_result,
};
use crate::db::dialect::{quote_identifier, quote_literal};
use crate::error::DbResult;
use crate::models::{Dialect, Table, TabularResult};
use crate::db::deadline::postgres as deadline;
use sqlx::{PgPool, Postgres};

mod queries {
    pub const LIST_TABLES: &str = "SELECT tablename AS table_name, schemaname AS table_schema \
         FROM pg_catalog.pg_tables \
         WHERE schemaname NOT IN ('pg_catalog', 'information_schema') \
         ORDER BY schemaname, tablename";

    pub const LIST_COLUMNS: &str = "SELECT * FROM information_schema.columns \
         WHERE table_name = {table}{schema_filter} \
         ORDER BY table_schema, ordinal_position";

    pub const LIST_INDEXES: &str = "SELECT * FROM pg_indexes \
         WHERE tablename = {table}{schema_filter} \
         ORDER BY schemaname, indexname";

    pub const LIST_CONSTRAINTS: &str = "SELECT conname, \
         pg_catalog.pg_get_constraintdef(r.oid, true) AS condef \
         FROM pg_catalog.pg_constraint r \
         WHERE r.conrelid = {regclass}::regclass \
         ORDER BY conname";
}

impl_fetch_tabular!(Postgres, deadline);

#[derive(Debug, Clone)]
pub struct PostgresExplorer {
    pool: PgPool,
    database: String,
    options: ExplorerOptions,
}

impl PostgresExplorer {
    pub fn new(pool: PgPool, database: impl Into<String>, options: ExplorerOptions) -> Self {
        Self {
            pool,
            database: database.into(),
            options,
        }
    }

    /// Fill `{table}` and `{schema_filter}`; unqualified names match every schema.
    fn catalog_sql(template: &str, table: &str, schema_column: &str) -> String {
        let (schema, name) = split_qualified(table);
        let schema_filter = schema
            .map(|s| format!(" AND {schema_column} = {}", quote_literal(s)))
            .unwrap_or_default();
        template
            .replace("{table}", &quote_literal(name))
            .replace("{schema_filter}", &schema_filter)
    }

    async fn fetch(&self, sql: &str, context: &str) -> DbResult<TabularResult> {
        fetch_tabular(&self.pool, sql, context, self.options.query_timeout).await
    }
}

impl Explorer for PostgresExplorer {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn get_tables(&self) -> DbResult<Vec<Table>> {
        let result = self.fetch(queries::LIST_TABLES, "get tables").await?;
        Ok(tables_from_result(&result, "public"))
    }

    async fn get_rows(&self, table: &str) -> DbResult<TabularResult> {
        require_table(table)?;
        let sql = format!("SELECT * FROM {}", quote_identifier(table, '"'));
        self.fetch(&sql, &format!("get rows of {table}")).await
    }

    async fn get_columns(&self, table: &str) -> DbResult<TabularResult> {
        require_table(table)?;
        let sql = Self::catalog_sql(queries::LIST_COLUMNS, table, "table_schema");
        let result = self.fetch(&sql, &format!("get columns of {table}")).await?;
        require_columns(result, table)
    }

    async fn get_indexes(&self, table: &str) -> DbResult<TabularResult> {
        require_table(table)?;
        let sql = Self::catalog_sql(queries::LIST_INDEXES, table, "schemaname");
        self.fetch(&sql, &format!("get indexes of {table}")).await
    }

    async fn get_constraints(&self, table: &str) -> DbResult<TabularResult> {
        require_table(table)?;
        let regclass = quote_literal(&quote_identifier(table, '"'));
        let sql = queries::LIST_CONSTRAINTS.replace("{regclass}", &regclass);
        self.fetch(&sql, &format!("get constraints of {table}")).await
    }

    async fn execute(&self, statement: &str) -> DbResult<()> {
        execute_statement(&self.pool, statement, self.options.query_timeout).await
    }
}
