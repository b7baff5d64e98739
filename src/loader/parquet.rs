//! Parquet file operations
//!
//! Reading extracted tables into Arrow record batches, and writing typed rows
//! back out through `serde_arrow`.

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, anyhow};
use arrow::record_batch::RecordBatch;
use arrow_schema::FieldRef;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;
use serde::Serialize;
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::error::util::parquet_files;
use crate::utils::logging::{log_empty_input, log_read_complete, log_read_start};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Batch size from `PARQUET_BATCH_SIZE`, falling back to the default
#[must_use]
pub fn batch_size() -> usize {
    std::env::var("PARQUET_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Read a Parquet file into Arrow record batches
pub fn read_parquet(path: &Path) -> anyhow::Result<Vec<RecordBatch>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Failed to read parquet file {}", path.display()))?
        .with_batch_size(batch_size())
        .build()
        .with_context(|| format!("Failed to build parquet reader for {}", path.display()))?;

    reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to decode record batches from {}", path.display()))
}

/// Read a Parquet file, or every Parquet file of a directory in parallel
pub fn read_parquet_dir(path: &Path, purpose: &str) -> anyhow::Result<Vec<RecordBatch>> {
    let start = Instant::now();
    log_read_start(purpose, path);

    let files = parquet_files(path, purpose)?;
    if files.is_empty() {
        log_empty_input(purpose, path);
        return Ok(Vec::new());
    }

    let per_file: Vec<anyhow::Result<Vec<RecordBatch>>> =
        files.par_iter().map(|file| read_parquet(file)).collect();

    let mut batches = Vec::new();
    for (file, result) in files.iter().zip(per_file) {
        batches.extend(
            result.with_context(|| format!("Error processing file {}", file.display()))?,
        );
    }

    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_read_complete(path, files.len(), rows, start.elapsed());
    Ok(batches)
}

/// Write serializable rows to a Parquet file
///
/// The Arrow schema is traced from the rows themselves; an empty slice
/// cannot be traced and is rejected.
pub fn write_parquet<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    if rows.is_empty() {
        return Err(anyhow!(
            "Refusing to write empty table to {}",
            path.display()
        ));
    }

    let fields = Vec::<FieldRef>::from_samples(rows, TracingOptions::default().allow_null_fields(true))
        .map_err(|e| anyhow!("Schema generation error: {e}"))?;
    let batch = serde_arrow::to_record_batch(&fields, &rows)
        .map_err(|e| anyhow!("Serialization error: {e}"))?;

    let file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("Failed to create parquet writer for {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("Failed to finalize {}", path.display()))?;

    Ok(())
}
