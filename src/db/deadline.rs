//! Statement deadlines enforced by the database itself.
//!
//! Dropping a query future on the client only stops waiting for it; the
//! statement keeps running and keeps its connection busy. Each dialect arms a
//! server-side limit on the checked-out connection before the statement runs,
//! disarms it afterwards, and decides what happens to a connection whose
//! statement outlived the caller.

use std::time::Duration;

/// Whole milliseconds, never zero (zero disables the server-side limit).
fn limit_millis(limit: Duration) -> u128 {
    limit.as_millis().max(1)
}

pub mod sqlite {
    use sqlx::Sqlite;
    use sqlx::pool::PoolConnection;
    use std::time::{Duration, Instant};
    use tracing::debug;

    /// VM instructions between deadline checks.
    const PROGRESS_OPS: i32 = 1000;

    /// Interrupt the running statement once `limit` has elapsed.
    pub async fn arm(conn: &mut PoolConnection<Sqlite>, limit: Duration) -> Result<(), sqlx::Error> {
        let deadline = Instant::now() + limit;
        conn.lock_handle()
            .await?
            .set_progress_handler(PROGRESS_OPS, move || Instant::now() < deadline);
        Ok(())
    }

    pub async fn disarm(conn: &mut PoolConnection<Sqlite>) -> Result<(), sqlx::Error> {
        conn.lock_handle().await?.remove_progress_handler();
        Ok(())
    }

    /// The progress handler has already stopped the statement; wait for the
    /// worker to settle and hand the connection back to the pool.
    pub async fn abandon(mut conn: PoolConnection<Sqlite>) {
        if let Err(e) = disarm(&mut conn).await {
            debug!(error = %e, "Dropping connection that could not be disarmed");
            drop(conn.detach());
        }
    }
}

pub mod postgres {
    use super::limit_millis;
    use sqlx::pool::PoolConnection;
    use sqlx::{Executor, Postgres};
    use std::time::Duration;
    use tracing::debug;

    pub async fn arm(conn: &mut PoolConnection<Postgres>, limit: Duration) -> Result<(), sqlx::Error> {
        let sql = format!("SET statement_timeout = {}", limit_millis(limit));
        (&mut **conn).execute(sql.as_str()).await?;
        Ok(())
    }

    pub async fn disarm(conn: &mut PoolConnection<Postgres>) -> Result<(), sqlx::Error> {
        (&mut **conn).execute("RESET statement_timeout").await?;
        Ok(())
    }

    /// The connection may still be mid-protocol; take it out of the pool.
    pub async fn abandon(conn: PoolConnection<Postgres>) {
        debug!("Discarding connection after statement timeout");
        drop(conn.detach());
    }
}

pub mod mysql {
    use super::limit_millis;
    use sqlx::pool::PoolConnection;
    use sqlx::{Executor, MySql};
    use std::time::Duration;
    use tracing::debug;

    /// Bounds SELECT statements only; MariaDB has no such variable and
    /// rejects the SET, which the caller logs and ignores.
    pub async fn arm(conn: &mut PoolConnection<MySql>, limit: Duration) -> Result<(), sqlx::Error> {
        let sql = format!("SET SESSION max_execution_time = {}", limit_millis(limit));
        (&mut **conn).execute(sql.as_str()).await?;
        Ok(())
    }

    pub async fn disarm(conn: &mut PoolConnection<MySql>) -> Result<(), sqlx::Error> {
        (&mut **conn)
            .execute("SET SESSION max_execution_time = DEFAULT")
            .await?;
        Ok(())
    }

    /// The connection may still be mid-protocol; take it out of the pool.
    pub async fn abandon(conn: PoolConnection<MySql>) {
        debug!("Discarding connection after statement timeout");
        drop(conn.detach());
    }
}
