//! End-to-end tests against temporary SQLite files.
//!
//! Everything goes through the public path: registry -> pool -> factory -> explorer.

use sqlscope::db::types::NULL_CELL;
use sqlscope::db::{ConnectionPool, Explorer, ExplorerFactory, ExplorerOptions, PoolOptions};
use sqlscope::error::DbError;
use sqlscope::models::{Dialect, SQLITE_SCHEMA, Table};
use sqlscope::registry::ConnectionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SCHEMA: &str = r#"
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        nickname TEXT,
        avatar BLOB
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        total REAL
    );
    CREATE INDEX idx_orders_user ON orders(user_id);
    INSERT INTO users (id, name, nickname, avatar) VALUES
        (1, 'Alice', NULL, X'FF00'),
        (2, '張三', 'zs', X'6869');
    INSERT INTO orders (id, user_id, total) VALUES (10, 1, 9.5);
"#;

struct Harness {
    // Keeps the temp dir alive for the test's duration.
    _dir: TempDir,
    dsn: String,
    registry: Arc<ConnectionRegistry>,
    pool: Arc<ConnectionPool<ConnectionRegistry>>,
    factory: ExplorerFactory<ConnectionRegistry>,
}

async fn harness_with(options: ExplorerOptions) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let dsn = dir.path().join("app.db").to_string_lossy().into_owned();
    let registry = Arc::new(
        ConnectionRegistry::open(dir.path().join("config"))
            .await
            .unwrap(),
    );
    let pool = Arc::new(ConnectionPool::new(
        Arc::clone(&registry),
        PoolOptions::default(),
    ));
    let factory = ExplorerFactory::new(Arc::clone(&pool), options);
    Harness {
        _dir: dir,
        dsn,
        registry,
        pool,
        factory,
    }
}

async fn seeded() -> Harness {
    let h = harness_with(ExplorerOptions::default()).await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();
    explorer.execute(SCHEMA).await.unwrap();
    h
}

#[tokio::test]
async fn test_create_classifies_sqlite() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();
    assert_eq!(explorer.dialect(), Dialect::Sqlite);
    assert_eq!(explorer.database(), h.dsn);
}

#[tokio::test]
async fn test_get_tables_lists_user_tables() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let tables = explorer.get_tables().await.unwrap();
    assert_eq!(
        tables,
        vec![
            Table::new("orders", SQLITE_SCHEMA),
            Table::new("users", SQLITE_SCHEMA)
        ]
    );
}

#[tokio::test]
async fn test_get_rows_renders_every_cell_as_text() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let result = explorer.get_rows("users").await.unwrap();
    assert_eq!(result.columns, vec!["id", "name", "nickname", "avatar"]);
    assert!(result.is_rectangular());
    assert_eq!(result.row_count(), 2);

    let alice = result
        .rows
        .iter()
        .find(|r| r[1] == "Alice")
        .expect("Alice row");
    assert_eq!(alice[0], "1");
    assert_eq!(alice[2], NULL_CELL);
    // Not valid UTF-8, so base64.
    assert_eq!(alice[3], "/wA=");

    let zhang = result.rows.iter().find(|r| r[0] == "2").expect("row 2");
    assert_eq!(zhang[1], "張三");
    assert_eq!(zhang[3], "hi");
}

#[tokio::test]
async fn test_get_rows_of_empty_table_keeps_columns() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();
    explorer
        .execute("CREATE TABLE empty_things (a INTEGER, b TEXT)")
        .await
        .unwrap();

    let result = explorer.get_rows("empty_things").await.unwrap();
    assert!(result.is_empty());
    assert_eq!(result.columns, vec!["a", "b"]);
}

#[tokio::test]
async fn test_get_rows_quotes_awkward_names() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();
    explorer
        .execute(r#"CREATE TABLE "odd ""name"" here" (v TEXT); INSERT INTO "odd ""name"" here" VALUES ('ok');"#)
        .await
        .unwrap();

    let result = explorer.get_rows(r#"odd "name" here"#).await.unwrap();
    assert_eq!(result.rows, vec![vec!["ok"]]);

    let columns = explorer.get_columns(r#"odd "name" here"#).await.unwrap();
    assert_eq!(columns.row_count(), 1);
}

#[tokio::test]
async fn test_dotted_table_name_is_one_identifier() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();
    explorer
        .execute(r#"CREATE TABLE "a.b" (v TEXT); INSERT INTO "a.b" VALUES ('dotted');"#)
        .await
        .unwrap();

    let result = explorer.get_rows("a.b").await.unwrap();
    assert_eq!(result.rows, vec![vec!["dotted"]]);
    assert_eq!(explorer.get_columns("a.b").await.unwrap().row_count(), 1);
}

#[tokio::test]
async fn test_get_rows_missing_table_fails() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let err = explorer.get_rows("ghost").await.unwrap_err();
    assert!(matches!(err, DbError::Query { .. }));
    assert!(err.to_string().starts_with("get rows of ghost:"));
}

#[tokio::test]
async fn test_get_columns_reports_table_info() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let result = explorer.get_columns("users").await.unwrap();
    let name_idx = result.column_index("name").unwrap();
    let pk_idx = result.column_index("pk").unwrap();
    let names: Vec<_> = result.rows.iter().map(|r| r[name_idx].as_str()).collect();
    assert_eq!(names, vec!["id", "name", "nickname", "avatar"]);
    assert_eq!(result.rows[0][pk_idx], "1");
}

#[tokio::test]
async fn test_get_columns_missing_table_is_an_error() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let err = explorer.get_columns("ghost").await.unwrap_err();
    assert!(matches!(err, DbError::Query { .. }));
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_get_indexes_lists_created_index() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let result = explorer.get_indexes("orders").await.unwrap();
    let name_idx = result.column_index("name").unwrap();
    assert!(
        result
            .rows
            .iter()
            .any(|r| r[name_idx] == "idx_orders_user")
    );
}

#[tokio::test]
async fn test_get_constraints_merges_foreign_and_primary_keys() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let result = explorer.get_constraints("orders").await.unwrap();
    assert_eq!(
        result.columns,
        vec![
            "constraint_type",
            "column",
            "referenced_table",
            "referenced_column",
            "on_update",
            "on_delete"
        ]
    );
    assert!(result.is_rectangular());
    assert_eq!(
        result.rows,
        vec![
            vec!["FOREIGN KEY", "user_id", "users", "id", "NO ACTION", "CASCADE"],
            vec!["PRIMARY KEY", "id", "NULL", "NULL", "NULL", "NULL"],
        ]
    );
}

#[tokio::test]
async fn test_execute_surfaces_driver_errors() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    let err = explorer.execute("INSERT INTO nowhere VALUES (1)").await.unwrap_err();
    assert!(matches!(err, DbError::Query { .. }));
    assert!(err.to_string().starts_with("execute command:"));
}

#[tokio::test]
async fn test_execute_changes_are_visible() {
    let h = seeded().await;
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();

    explorer.execute("DELETE FROM orders").await.unwrap();
    assert!(explorer.get_rows("orders").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_same_dsn_shares_one_handle_and_last_name_wins() {
    let h = harness_with(ExplorerOptions::default()).await;

    h.factory.create("a", &h.dsn).await.unwrap();
    h.factory.create("b", &h.dsn).await.unwrap();

    assert_eq!(h.pool.len().await, 1);
    let connections = h.registry.get_connections().await;
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].name, "b");
    assert_eq!(connections[0].dsn, h.dsn);
}

#[tokio::test]
async fn test_create_rejects_empty_inputs_without_side_effects() {
    let h = harness_with(ExplorerOptions::default()).await;

    assert!(matches!(
        h.factory.create("", &h.dsn).await.unwrap_err(),
        DbError::Validation { field: "name" }
    ));
    assert!(matches!(
        h.factory.create("x", "").await.unwrap_err(),
        DbError::Validation { field: "dsn" }
    ));
    assert!(h.pool.is_empty().await);
    assert!(h.registry.get_connections().await.is_empty());
}

#[tokio::test]
async fn test_close_then_reopen() {
    let h = seeded().await;
    h.pool.close().await.unwrap();
    assert!(h.pool.is_empty().await);

    // A fresh handle is opened after close, with the data still on disk.
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();
    assert_eq!(explorer.get_rows("users").await.unwrap().row_count(), 2);
}

#[tokio::test]
async fn test_query_timeout_is_enforced() {
    let h = harness_with(ExplorerOptions {
        query_timeout: Duration::from_millis(50),
    })
    .await;
    let explorer = h.factory.create("slow", &h.dsn).await.unwrap();

    let err = explorer
        .execute(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 200000000) \
             SELECT count(*) FROM c",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Timeout { .. }));
}

#[tokio::test]
async fn test_timed_out_statement_does_not_block_the_shared_handle() {
    let h = seeded().await;
    let impatient = ExplorerFactory::new(
        Arc::clone(&h.pool),
        ExplorerOptions {
            query_timeout: Duration::from_millis(50),
        },
    );
    let slow = impatient.create("local", &h.dsn).await.unwrap();

    let err = slow
        .execute(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 500000000) \
             SELECT count(*) FROM c",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Timeout { .. }));

    let started = std::time::Instant::now();
    let explorer = h.factory.create("local", &h.dsn).await.unwrap();
    let tables = explorer.get_tables().await.unwrap();
    assert_eq!(tables.len(), 2);
    assert!(started.elapsed() < Duration::from_secs(5));
}
