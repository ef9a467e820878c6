//! sqlscope library
//!
//! Connection pooling and schema exploration for MySQL, PostgreSQL and SQLite
//! behind one dialect-neutral interface. A bare DSN is classified, opened once
//! per process, remembered in a small on-disk registry and wrapped in an
//! [`Explorer`](db::Explorer) whose results are all plain text.

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod models;
pub mod registry;

pub use config::Config;
pub use db::{AnyExplorer, ConnectionPool, Explorer, ExplorerFactory};
pub use error::{DbError, DbResult};
pub use registry::ConnectionRegistry;
