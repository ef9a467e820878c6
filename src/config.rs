//! Configuration handling for sqlscope.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::db::explorer::{DEFAULT_QUERY_TIMEOUT_SECS, ExplorerOptions};
use crate::db::pool::{DEFAULT_CONNECT_TIMEOUT_SECS, PoolOptions};
use crate::format::OutputFormat;
use crate::registry::ConnectionRegistry;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sqlscope",
    about = "Explore MySQL, PostgreSQL and SQLite databases from the terminal",
    version,
    author
)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding connections.json (default: <config dir>/sqlscope)
    #[arg(long, global = true, value_name = "DIR", env = "SQLSCOPE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Query timeout in seconds
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "SQLSCOPE_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "SQLSCOPE_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Maximum connections per pool (default: 5, or 1 for SQLite)
    #[arg(long, global = true, env = "SQLSCOPE_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,

    /// Ping cached connections before reuse and reopen dead ones
    #[arg(long, global = true, env = "SQLSCOPE_PING_ON_REUSE")]
    pub ping_on_reuse: bool,

    /// Output format
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value = "table",
        env = "SQLSCOPE_FORMAT"
    )]
    pub format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL, env = "SQLSCOPE_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, global = true, env = "SQLSCOPE_JSON_LOGS")]
    pub json_logs: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH", env = "SQLSCOPE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List recently used connections, newest first
    Recent,
    /// List tables
    Tables(TargetArgs),
    /// Print every row of a table
    Rows(TableArgs),
    /// Describe a table's columns
    Columns(TableArgs),
    /// List a table's indexes
    Indexes(TableArgs),
    /// List a table's constraints
    Constraints(TableArgs),
    /// Run a statement and discard its result rows
    Exec {
        #[command(flatten)]
        target: TargetArgs,
        /// SQL statement to run
        statement: String,
    },
    /// Forget recent connections
    Forget {
        /// Connection name as listed by `recent`, or the full unmasked DSN
        connection: String,
    },
}

/// Which database to talk to.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Connection name; with no --dsn, reuses the most recent DSN saved under it
    #[arg(short, long)]
    pub name: String,

    /// postgres://..., user:pass@tcp(host:port)/db, or path/to/file.db
    #[arg(short, long, env = "SQLSCOPE_DSN")]
    pub dsn: Option<String>,
}

impl TargetArgs {
    /// Resolve to `(name, dsn)`, looking the DSN up by name when not given.
    pub async fn resolve(&self, registry: &ConnectionRegistry) -> Option<(String, String)> {
        match &self.dsn {
            Some(dsn) => Some((self.name.clone(), dsn.clone())),
            None => registry
                .find_by_name(&self.name)
                .await
                .map(|c| (c.name, c.dsn)),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Table name, optionally schema-qualified
    pub table: String,
}

impl Config {
    /// Registry directory: the flag, else the platform default.
    pub fn registry_dir(&self) -> Option<PathBuf> {
        self.config_dir.clone().or_else(ConnectionRegistry::default_dir)
    }

    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            connect_timeout: self.connect_timeout_duration(),
            ping_on_reuse: self.ping_on_reuse,
        }
    }

    pub fn explorer_options(&self) -> ExplorerOptions {
        ExplorerOptions {
            query_timeout: self.query_timeout_duration(),
        }
    }
}
