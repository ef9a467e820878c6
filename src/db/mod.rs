//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - DSN classification and normalization
//! - Connection pooling keyed by DSN
//! - Schema and data exploration per dialect
//! - Text normalization of result cells
//! - Server-side statement deadlines per dialect
//! - Dialect dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod deadline;
pub mod dialect;
pub mod explorer;
pub mod factory;
pub mod pool;
pub mod types;

pub use dialect::{MySqlAddress, MySqlDsn, classify};
pub use explorer::{AnyExplorer, Explorer, ExplorerOptions};
pub use factory::{ExplorerFactory, resolve_target};
pub use pool::{ConnectionPool, ConnectionStore, DbPool, PoolOptions, PooledConnection};
