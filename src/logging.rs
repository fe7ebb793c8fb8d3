//! Diagnostics sink for the `log` macros used throughout the crate.
//!
//! The terminal belongs to the child shell while the relay runs, so
//! diagnostics only ever go to a file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `debug` or
/// `termin8::relay=trace`.
pub const LOG_ENV: &str = "TERMIN8_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

/// Filter from `TERMIN8_LOG`, else `level`, else `info`.
pub fn log_filter(level: Option<&str>) -> EnvFilter {
    let directive = std::env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| level.map(str::to_string))
        .unwrap_or_else(|| "info".to_string());

    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Send `log` records to `path` (appending). The fmt subscriber also
/// installs the `log` bridge, so `log::info!` and friends land here.
pub fn init(path: &Path, level: Option<&str>) -> Result<(), LoggingError> {
    // Create log directory if needed
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    log::info!("termin8 {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}
