//! File-backed tracing setup. The terminal belongs to the UI, so log
//! output never goes to stdout or stderr.

use crate::error::{Result, ShortlistError};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `SHORTLIST_LOG=debug`
pub const LOG_ENV: &str = "SHORTLIST_LOG";

const DEFAULT_FILTER: &str = "info";

/// Default log location (~/.local/share/shortlist/shortlist.log on Linux)
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("shortlist").join("shortlist.log"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Installs the global subscriber writing to `log_file` (or the default
/// location). Returns the path being written.
pub fn init(log_file: Option<&Path>) -> Result<PathBuf> {
    let path = match log_file {
        Some(path) => path.to_path_buf(),
        None => default_log_path().ok_or_else(|| {
            ShortlistError::ConfigError("Could not determine log directory".to_string())
        })?,
    };
    let file = open_log_file(&path)?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| ShortlistError::ConfigError(format!("Failed to start logging: {}", e)))?;

    Ok(path)
}
