//! Data models for sqlscope.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionTarget, Dialect, PersistedConnection, mask_dsn};
pub use schema::{SQLITE_SCHEMA, Table, TabularResult};
