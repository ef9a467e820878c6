//! Explorer construction from a name and a bare DSN.

use crate::db::dialect::{
    MySqlDsn, classify, normalize_postgres_dsn, postgres_database_name, strip_scheme,
};
use crate::db::explorer::{
    AnyExplorer, Explorer, ExplorerOptions, MySqlExplorer, PostgresExplorer, SqliteExplorer,
};
use crate::db::pool::{ConnectionPool, ConnectionStore, DbPool, PooledConnection};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionTarget, Dialect, mask_dsn};
use std::sync::Arc;
use tracing::{debug, info};

/// Validate, classify and normalize a connection request.
///
/// The returned target carries the DSN in the form the pool is keyed by:
/// PostgreSQL gets `sslmode`, MySQL loses its scheme, SQLite is untouched.
pub fn resolve_target(name: &str, dsn: &str) -> DbResult<ConnectionTarget> {
    if name.is_empty() {
        return Err(DbError::validation("name"));
    }
    if dsn.is_empty() {
        return Err(DbError::validation("dsn"));
    }

    let dialect = classify(dsn)?;
    let normalized = match dialect {
        Dialect::Postgres => normalize_postgres_dsn(dsn),
        Dialect::MySql => strip_scheme(dsn.trim()).to_string(),
        Dialect::Sqlite => dsn.to_string(),
    };
    Ok(ConnectionTarget::new(name, normalized, dialect))
}

/// Builds explorers over handles from a shared [`ConnectionPool`].
#[derive(Debug)]
pub struct ExplorerFactory<S> {
    pool: Arc<ConnectionPool<S>>,
    options: ExplorerOptions,
}

impl<S: ConnectionStore> ExplorerFactory<S> {
    pub fn new(pool: Arc<ConnectionPool<S>>, options: ExplorerOptions) -> Self {
        Self { pool, options }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool<S>> {
        &self.pool
    }

    /// Classify `dsn`, fetch (or open) its pooled handle and wrap it in the
    /// matching explorer.
    pub async fn create(&self, name: &str, dsn: &str) -> DbResult<AnyExplorer> {
        let target = resolve_target(name, dsn)?;
        let dialect = target.dialect();
        debug!(name, dialect = %dialect, dsn = %mask_dsn(target.dsn()), "Creating explorer");

        // Parse before connecting so a malformed DSN never reaches the driver.
        let database = match dialect {
            Dialect::MySql => MySqlDsn::parse(target.dsn())?.database,
            Dialect::Postgres => postgres_database_name(target.dsn()),
            Dialect::Sqlite => target.dsn().to_string(),
        };

        let conn = self
            .pool
            .get(target.name(), dialect.driver_name(), target.dsn())
            .await?;

        let explorer = self.wrap(&conn, dialect, database)?;
        info!(name, dialect = %dialect, database = %explorer.database(), "Explorer ready");
        Ok(explorer)
    }

    fn wrap(
        &self,
        conn: &PooledConnection,
        dialect: Dialect,
        database: String,
    ) -> DbResult<AnyExplorer> {
        let options = self.options.clone();
        match conn.handle() {
            DbPool::MySql(p) if dialect == Dialect::MySql => Ok(AnyExplorer::MySql(
                MySqlExplorer::new(p.clone(), database, options),
            )),
            DbPool::Postgres(p) if dialect == Dialect::Postgres => Ok(AnyExplorer::Postgres(
                PostgresExplorer::new(p.clone(), database, options),
            )),
            DbPool::Sqlite(p) if dialect == Dialect::Sqlite => Ok(AnyExplorer::Sqlite(
                SqliteExplorer::new(p.clone(), database, options),
            )),
            other => Err(DbError::connection(
                dialect,
                format!(
                    "DSN is already open as {}",
                    other.dialect().display_name()
                ),
                "Close the pool before reusing this DSN with another driver",
            )),
        }
    }
}
