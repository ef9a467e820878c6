//! MySQL explorer, backed by `INFORMATION_SCHEMA`.

use super::{
    Explorer, ExplorerOptions, require_columns, require_table, split_qualified,
    tables_from_result,
};
use crate::db::dialect::{quote_identifier, quote_mysql_literal};
use crate::error::DbResult;
use crate::models::{Dialect, Table, TabularResult};
use crate::db::deadline::mysql as deadline;
use sqlx::{MySql, MySqlPool};

mod queries {
    pub const LIST_TABLES: &str = "SELECT TABLE_NAME AS table_name, TABLE_SCHEMA AS table_schema \
         FROM INFORMATION_SCHEMA.TABLES \
         WHERE TABLE_SCHEMA = {schema} AND TABLE_TYPE = 'BASE TABLE' \
         ORDER BY TABLE_NAME";

    pub const LIST_COLUMNS: &str = "SELECT * FROM INFORMATION_SCHEMA.COLUMNS \
         WHERE TABLE_SCHEMA = {schema} AND TABLE_NAME = {table} \
         ORDER BY ORDINAL_POSITION";

    pub const LIST_INDEXES: &str = "SELECT * FROM INFORMATION_SCHEMA.STATISTICS \
         WHERE TABLE_SCHEMA = {schema} AND TABLE_NAME = {table} \
         ORDER BY INDEX_NAME, SEQ_IN_INDEX";

    pub const LIST_CONSTRAINTS: &str = "SELECT * FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS \
         WHERE TABLE_SCHEMA = {schema} AND TABLE_NAME = {table} \
         ORDER BY CONSTRAINT_NAME";

    /// Used when the DSN names no database.
    pub const CURRENT_SCHEMA: &str = "DATABASE()";
}

impl_fetch_tabular!(MySql, deadline);

#[derive(Debug, Clone)]
pub struct MySqlExplorer {
    pool: MySqlPool,
    schema: String,
    options: ExplorerOptions,
}

impl MySqlExplorer {
    /// `schema` is the database named in the DSN, possibly empty.
    pub fn new(pool: MySqlPool, schema: impl Into<String>, options: ExplorerOptions) -> Self {
        Self {
            pool,
            schema: schema.into(),
            options,
        }
    }

    /// Catalog filters for a possibly qualified table name.
    fn filters(&self, table: &str) -> (String, String) {
        let (schema, name) = split_qualified(table);
        let schema = match schema {
            Some(s) => quote_mysql_literal(s),
            None => self.schema_literal(),
        };
        (schema, quote_mysql_literal(name))
    }

    fn schema_literal(&self) -> String {
        if self.schema.is_empty() {
            queries::CURRENT_SCHEMA.to_string()
        } else {
            quote_mysql_literal(&self.schema)
        }
    }

    async fn catalog(&self, template: &str, table: &str, context: String) -> DbResult<TabularResult> {
        require_table(table)?;
        let (schema, name) = self.filters(table);
        let sql = template
            .replace("{schema}", &schema)
            .replace("{table}", &name);
        fetch_tabular(&self.pool, &sql, &context, self.options.query_timeout).await
    }
}

impl Explorer for MySqlExplorer {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn database(&self) -> &str {
        &self.schema
    }

    async fn get_tables(&self) -> DbResult<Vec<Table>> {
        let sql = queries::LIST_TABLES.replace("{schema}", &self.schema_literal());
        let result = fetch_tabular(&self.pool, &sql, "get tables", self.options.query_timeout).await?;
        Ok(tables_from_result(&result, &self.schema))
    }

    async fn get_rows(&self, table: &str) -> DbResult<TabularResult> {
        require_table(table)?;
        let sql = format!("SELECT * FROM {}", quote_identifier(table, '`'));
        let context = format!("get rows of {table}");
        fetch_tabular(&self.pool, &sql, &context, self.options.query_timeout).await
    }

    async fn get_columns(&self, table: &str) -> DbResult<TabularResult> {
        let result = self
            .catalog(queries::LIST_COLUMNS, table, format!("get columns of {table}"))
            .await?;
        require_columns(result, table)
    }

    async fn get_indexes(&self, table: &str) -> DbResult<TabularResult> {
        self.catalog(queries::LIST_INDEXES, table, format!("get indexes of {table}"))
            .await
    }

    async fn get_constraints(&self, table: &str) -> DbResult<TabularResult> {
        self.catalog(
            queries::LIST_CONSTRAINTS,
            table,
            format!("get constraints of {table}"),
        )
        .await
    }

    async fn execute(&self, statement: &str) -> DbResult<()> {
        execute_statement(&self.pool, statement, self.options.query_timeout).await
    }
}
