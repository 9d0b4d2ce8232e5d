// Tracing setup for the quaestor binaries

use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// HTTP crates pulled in by the webhook sink.
const QUIET_CRATES: [&str; 4] = ["hyper=warn", "reqwest=warn", "rustls=warn", "h2=warn"];

fn level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// `RUST_LOG` when set, otherwise the verbosity level with the HTTP stack quietened.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        QUIET_CRATES
            .into_iter()
            .filter_map(|d| d.parse().ok())
            .fold(EnvFilter::new(level(verbose).to_string()), |f, d| f.add_directive(d))
    })
}

/// Directory and file name of the JSON log, from `LOG_DIR` and `LOG_FILE`.
pub fn log_target() -> (PathBuf, String) {
    let dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let file = std::env::var("LOG_FILE").unwrap_or_else(|_| "quaestor.log".to_string());
    (PathBuf::from(dir), file)
}

/// Console plus JSON file logging for long training runs.
///
/// The returned guard flushes the file writer on drop; hold it until exit.
pub fn setup_logging(verbose: bool) -> anyhow::Result<WorkerGuard> {
    let (log_dir, log_file) = log_target();
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, &log_file));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stdout);
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::info!(verbose, log = ?log_dir.join(&log_file), "Logging initialized");
    Ok(guard)
}

/// Console-only logging for short commands. Leaves an existing subscriber in place.
pub fn setup_minimal_logging(verbose: bool) -> anyhow::Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("Console logging initialized");
    }
    Ok(())
}
