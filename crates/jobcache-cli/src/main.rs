//! jobcache - command-line host for the AI Job Chommie offline worker.
//!
//! The binary plays the part of the platform: it raises the worker's
//! lifecycle, sync and push events, routes REST calls through the worker
//! so they benefit from the cache and the offline queue, and can run as a
//! long-lived event loop fed JSON lines on stdin.

mod commands;
mod context;
mod notifier;
mod output;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "jobcache")]
#[command(about = "Offline cache, background sync and API client for AI Job Chommie")]
#[command(version)]
struct Cli {
    /// App origin, e.g. https://jobs.example.co.za (default: config or JOBCACHE_ORIGIN)
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Print raw JSON instead of formatted output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Log file name prefix inside `{cache_dir}/logs`
const LOG_FILE_PREFIX: &str = "jobcache.log";

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). Output goes to stderr
/// and, when a log directory is available, to a daily-rolling file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) if std::fs::create_dir_all(dir).is_ok() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let ctx = AppContext::load(cli.origin, cli.json)?;

    let _guard = init_tracing(Some(&ctx.log_dir()));
    info!(origin = %ctx.config.origin, "jobcache starting");
    debug!(cache_dir = %ctx.cache_dir.display(), "Using cache directory");

    commands::run(&ctx, cli.command).await
}
