//! sqlscope - Main entry point.
//!
//! Runs one exploration command against a MySQL, PostgreSQL or SQLite database
//! and prints the result to stdout. Logs go to stderr or `--log-file`.

use clap::Parser;
use sqlscope::config::{Command, Config, TargetArgs};
use sqlscope::db::{ConnectionPool, Explorer, ExplorerFactory};
use sqlscope::error::{DbError, DbResult};
use sqlscope::format::{format_connections, format_result, format_tables};
use sqlscope::registry::ConnectionRegistry;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (writer, ansi) = match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json().with_writer(writer)).init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .init();
    }
    Ok(())
}

type Factory = ExplorerFactory<ConnectionRegistry>;

async fn explorer_for(
    target: &TargetArgs,
    registry: &ConnectionRegistry,
    factory: &Factory,
) -> DbResult<sqlscope::AnyExplorer> {
    let (name, dsn) = target
        .resolve(registry)
        .await
        .ok_or(DbError::validation("dsn"))?;
    factory.create(&name, &dsn).await
}

/// Run the selected command and return what to print.
async fn run(config: &Config, registry: &ConnectionRegistry, factory: &Factory) -> DbResult<String> {
    let format = config.format;
    match &config.command {
        Command::Recent => Ok(format_connections(
            &registry.get_connections().await,
            format,
        )),
        Command::Forget { connection } => match registry.forget(connection).await? {
            0 => Ok("No such connection\n".to_string()),
            1 => Ok("Forgot 1 connection\n".to_string()),
            n => Ok(format!("Forgot {n} connections\n")),
        },
        Command::Tables(target) => {
            let explorer = explorer_for(target, registry, factory).await?;
            Ok(format_tables(&explorer.get_tables().await?, format))
        }
        Command::Rows(args) => {
            let explorer = explorer_for(&args.target, registry, factory).await?;
            Ok(format_result(&explorer.get_rows(&args.table).await?, format))
        }
        Command::Columns(args) => {
            let explorer = explorer_for(&args.target, registry, factory).await?;
            Ok(format_result(&explorer.get_columns(&args.table).await?, format))
        }
        Command::Indexes(args) => {
            let explorer = explorer_for(&args.target, registry, factory).await?;
            Ok(format_result(&explorer.get_indexes(&args.table).await?, format))
        }
        Command::Constraints(args) => {
            let explorer = explorer_for(&args.target, registry, factory).await?;
            Ok(format_result(
                &explorer.get_constraints(&args.table).await?,
                format,
            ))
        }
        Command::Exec { target, statement } => {
            let explorer = explorer_for(target, registry, factory).await?;
            explorer.execute(statement).await?;
            Ok("OK\n".to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting sqlscope");

    let dir = config
        .registry_dir()
        .ok_or("could not determine a config directory; pass --config-dir")?;
    let registry = Arc::new(ConnectionRegistry::open(&dir).await?);
    let pool = Arc::new(ConnectionPool::new(
        Arc::clone(&registry),
        config.pool_options(),
    ));
    let factory = ExplorerFactory::new(Arc::clone(&pool), config.explorer_options());

    let result = run(&config, &registry, &factory).await;

    if let Err(e) = pool.close().await {
        error!(error = %e, "Failed to close connections");
    }

    match result {
        Ok(output) => {
            print!("{output}");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Command failed");
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {suggestion}");
            }
            Err(e.into())
        }
    }
}
