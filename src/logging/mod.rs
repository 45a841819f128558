pub mod timer;

pub use timer::Timer;

use anyhow::{Context, Result};
use std::path::Path;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Set up logging based on verbosity level.
///
/// When `log_file` is given, output goes to that file instead of stdout and
/// the returned guard must be held until the process exits so buffered
/// lines are flushed.
pub fn setup_logger(verbosity: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // RUST_LOG, when set, takes precedence over -v
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(get_log_level(verbosity)).into())
        .from_env_lossy();

    match log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false) // No colors in log file
                .with_writer(non_blocking)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
            Ok(None)
        }
    }
}

/// Get the appropriate log level based on verbosity
pub fn get_log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Handles signals like CTRL+C (and SIGTERM on unix) for graceful termination.
///
/// The returned token is cancelled once a signal arrives; the collection
/// loop observes it between and during cycles.
pub fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_termination().await;
        info!("Termination signal received, stopping");
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = signal::ctrl_c().await;
}
