//! Log lines for input reading
//!
//! Reads of extracted tables are logged the same way wherever they happen, so
//! a run log shows which inputs were used and how much each contributed.

use std::path::Path;
use std::time::Duration;

/// Log the start of reading an input table
pub fn log_read_start(purpose: &str, path: &Path) {
    log::info!("Reading parquet data for {purpose}: {}", path.display());
}

/// Log a finished read
///
/// # Arguments
/// * `path` - File or directory that was read
/// * `files` - Number of Parquet files read
/// * `rows` - Total rows across all files
/// * `elapsed` - Time spent reading
pub fn log_read_complete(path: &Path, files: usize, rows: usize, elapsed: Duration) {
    log::info!(
        "Read {rows} rows from {files} file(s) in {} ({elapsed:?})",
        path.display()
    );
}

/// Warn that an input location held no Parquet files
pub fn log_empty_input(purpose: &str, path: &Path) {
    log::warn!("No parquet files found for {purpose}: {}", path.display());
}
