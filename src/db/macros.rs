//! Dialect dispatch macros for reducing code duplication.
//!
//! The pool handle and the explorer are both closed enums over the three
//! dialects; these macros expand the repetitive match arms at compile time.

/// Macro for generating match arms over `DbPool` variants.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(pool, {
///     MySql(p) => p.close().await,
///     Postgres(p) => p.close().await,
///     Sqlite(p) => p.close().await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($pool:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $pool {
            $(
                $crate::db::pool::DbPool::$variant($p) => $body,
            )+
        }
    };
}

/// Forward a call to whichever explorer an `AnyExplorer` holds.
#[macro_export]
macro_rules! impl_explorer_dispatch {
    ($explorer:expr, $e:ident => $body:expr) => {
        match $explorer {
            $crate::db::explorer::AnyExplorer::MySql($e) => $body,
            $crate::db::explorer::AnyExplorer::Postgres($e) => $body,
            $crate::db::explorer::AnyExplorer::Sqlite($e) => $body,
        }
    };
}

/// Generate a dialect's `fetch_tabular` and `execute_statement` for its
/// database type and `deadline` hooks.
///
/// Both run on one checked-out connection with a server-side deadline armed,
/// and the whole call is bounded by `query_timeout`. A statement that fails
/// after the deadline has passed is reported as a timeout. A result with no
/// rows gets its columns by describing the statement.
#[macro_export]
macro_rules! impl_fetch_tabular {
    ($db:ty, $deadline:ident) => {
        async fn checkout(
            pool: &::sqlx::Pool<$db>,
            context: &str,
            query_timeout: ::std::time::Duration,
            deadline: ::tokio::time::Instant,
        ) -> $crate::error::DbResult<::sqlx::pool::PoolConnection<$db>> {
            let mut conn = match ::tokio::time::timeout_at(deadline, pool.acquire()).await {
                Ok(acquired) => acquired.map_err(|e| $crate::error::DbError::from_sqlx(context, e))?,
                Err(_) => {
                    return Err($crate::error::DbError::timeout(
                        context,
                        query_timeout.as_millis() as u64,
                    ));
                }
            };
            let remaining = deadline.saturating_duration_since(::tokio::time::Instant::now());
            if let Err(e) = $deadline::arm(&mut conn, remaining).await {
                ::tracing::debug!(context, error = %e, "Statement deadline not armed");
            }
            Ok(conn)
        }

        async fn settle<T>(
            mut conn: ::sqlx::pool::PoolConnection<$db>,
            outcome: ::std::result::Result<
                ::std::result::Result<T, ::sqlx::Error>,
                ::tokio::time::error::Elapsed,
            >,
            context: &str,
            query_timeout: ::std::time::Duration,
            deadline: ::tokio::time::Instant,
        ) -> $crate::error::DbResult<T> {
            let timed_out = || {
                $crate::error::DbError::timeout(context, query_timeout.as_millis() as u64)
            };
            match outcome {
                Ok(result) => {
                    if let Err(e) = $deadline::disarm(&mut conn).await {
                        ::tracing::debug!(context, error = %e, "Statement deadline not disarmed");
                    }
                    match result {
                        Ok(value) => Ok(value),
                        Err(_) if ::tokio::time::Instant::now() >= deadline => Err(timed_out()),
                        Err(e) => Err($crate::error::DbError::from_sqlx(context, e)),
                    }
                }
                Err(_) => {
                    ::tracing::warn!(context, "Statement timed out");
                    $deadline::abandon(conn).await;
                    Err(timed_out())
                }
            }
        }

        pub(crate) async fn fetch_tabular(
            pool: &::sqlx::Pool<$db>,
            sql: &str,
            context: &str,
            query_timeout: ::std::time::Duration,
        ) -> $crate::error::DbResult<$crate::models::TabularResult> {
            use ::sqlx::Executor as _;

            ::tracing::debug!(context, sql, "Running query");
            let deadline = ::tokio::time::Instant::now() + query_timeout;
            let mut conn = checkout(pool, context, query_timeout, deadline).await?;

            let outcome = ::tokio::time::timeout_at(deadline, async {
                let rows = (&mut *conn).fetch_all(sql).await?;
                let columns = match rows.first() {
                    Some(first) => $crate::db::types::RowToStrings::column_names(first),
                    None => (&mut *conn)
                        .describe(sql)
                        .await?
                        .columns()
                        .iter()
                        .map(|c| ::sqlx::Column::name(c).to_string())
                        .collect(),
                };
                Ok::<_, ::sqlx::Error>($crate::db::types::rows_to_tabular(columns, &rows, context))
            })
            .await;

            settle(conn, outcome, context, query_timeout, deadline).await
        }

        pub(crate) async fn execute_statement(
            pool: &::sqlx::Pool<$db>,
            statement: &str,
            query_timeout: ::std::time::Duration,
        ) -> $crate::error::DbResult<()> {
            use ::sqlx::Executor as _;

            const CONTEXT: &str = "execute command";
            let deadline = ::tokio::time::Instant::now() + query_timeout;
            let mut conn = checkout(pool, CONTEXT, query_timeout, deadline).await?;

            let outcome = ::tokio::time::timeout_at(deadline, async {
                let done = (&mut *conn).execute(statement).await?;
                ::tracing::debug!(rows_affected = done.rows_affected(), "Statement executed");
                Ok::<_, ::sqlx::Error>(())
            })
            .await;

            settle(conn, outcome, CONTEXT, query_timeout, deadline).await
        }
    };
}

pub use impl_db_dispatch;
pub use impl_explorer_dispatch;
pub use impl_fetch_tabular;
