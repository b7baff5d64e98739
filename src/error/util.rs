//! Utility functions for error handling
//!
//! Helpers used by the file loader to fail early with a useful message.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

/// Check if a directory exists and is readable, with rich error information
pub fn validate_directory(path: &Path, purpose: &str) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("Directory not found: {} (needed for: {purpose})", path.display());
    }

    if !path.is_dir() {
        bail!(
            "Path is not a directory: {} (expected a directory for: {purpose})",
            path.display()
        );
    }

    match fs::read_dir(path) {
        Ok(_) => Ok(()),
        Err(e) => {
            let context = match e.kind() {
                io::ErrorKind::PermissionDenied => {
                    "Permission denied - check directory permissions".to_string()
                }
                _ => format!("Failed to access directory for: {purpose}"),
            };
            Err(e).with_context(|| format!("{context}: {}", path.display()))
        }
    }
}

/// Resolve the Parquet files an input path refers to
///
/// A file path is returned as-is; a directory yields its `.parquet` entries
/// in name order so runs are reproducible.
pub fn parquet_files(path: &Path, purpose: &str) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    validate_directory(path, purpose)?;

    let mut files = Vec::new();
    for entry in
        fs::read_dir(path).with_context(|| format!("Failed to read directory: {}", path.display()))?
    {
        let entry = entry
            .with_context(|| format!("Failed to read directory entry in {}", path.display()))?;
        let file = entry.path();
        if file.is_file() && file.extension().is_some_and(|ext| ext == "parquet") {
            files.push(file);
        }
    }
    files.sort();

    Ok(files)
}
