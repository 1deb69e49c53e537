mod cli;
mod commands;
mod format;
mod prompt;
mod view;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Context;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_LOG_FILE: &str = "usergate.log";

fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// RUST_LOG wins over -v. With `log_file`, output goes there instead of
/// stderr; keep the returned guard alive until exit so it gets flushed.
fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| DEFAULT_LOG_FILE.into());

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let matches = cli::new().get_matches();
    let verbosity = matches.get_count("verbosity");
    let log_file = matches.get_one::<std::path::PathBuf>("log-file");

    let _log_guard = match init_tracing(verbosity, log_file.map(|p| p.as_path())) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), "usergate starting");
    view::exit_on_interrupt();

    match run(&matches).await {
        Ok(code) => code,
        Err(e) => match view::action_for(&e) {
            Some(action) => {
                info!(error = %e, "Request refused after entering view");
                view::exit_code(view::perform(action))
            }
            None => {
                error!(error = %e, "Command failed");
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(matches: &clap::ArgMatches) -> Result<ExitCode> {
    let ctx = Context::new(matches)?;
    commands::dispatch(&ctx, matches).await
}
