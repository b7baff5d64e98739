//! Column extraction for Arrow record batches
//!
//! Extracts whole columns as typed vectors. Columns are located by a list of
//! accepted names and converted with Arrow's cast kernel when the stored type
//! differs, so an extract may carry timestamps as strings or ids as Int32.

use anyhow::{Context, anyhow};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::compute::cast;
use arrow::record_batch::RecordBatch;
use arrow_schema::{DataType, TimeUnit};
use chrono::NaiveDateTime;

/// Find the first column whose name (case-insensitive) is in `names`
#[must_use]
pub fn find_column<'a>(batch: &'a RecordBatch, names: &[&str]) -> Option<(&'a ArrayRef, String)> {
    let schema = batch.schema();
    names.iter().find_map(|name| {
        schema
            .fields()
            .iter()
            .position(|field| field.name().eq_ignore_ascii_case(name))
            .map(|idx| (batch.column(idx), schema.field(idx).name().clone()))
    })
}

/// Whether the batch has any of the named columns
#[must_use]
pub fn has_column(batch: &RecordBatch, names: &[&str]) -> bool {
    find_column(batch, names).is_some()
}

/// Get a column converted to `expected_type`
///
/// Returns `Ok(None)` when the column is absent and not required.
pub fn get_column(
    batch: &RecordBatch,
    names: &[&str],
    expected_type: &DataType,
    required: bool,
) -> anyhow::Result<Option<ArrayRef>> {
    let Some((column, name)) = find_column(batch, names) else {
        if required {
            return Err(anyhow!("Column not found: expected one of {names:?}"));
        }
        return Ok(None);
    };

    if column.data_type() == expected_type {
        return Ok(Some(column.clone()));
    }

    let converted = cast(column, expected_type).with_context(|| {
        format!(
            "Failed to convert column '{name}' from {:?} to {expected_type:?}",
            column.data_type()
        )
    })?;
    Ok(Some(converted))
}

fn required_column(
    batch: &RecordBatch,
    names: &[&str],
    expected_type: &DataType,
) -> anyhow::Result<ArrayRef> {
    get_column(batch, names, expected_type, true)?
        .ok_or_else(|| anyhow!("Column not found: expected one of {names:?}"))
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, names: &[&str]) -> anyhow::Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("Column {names:?} has unexpected array type"))
}

/// Extract an integer column
pub fn extract_i64(batch: &RecordBatch, names: &[&str]) -> anyhow::Result<Vec<Option<i64>>> {
    let array = required_column(batch, names, &DataType::Int64)?;
    let values = downcast::<Int64Array>(&array, names)?;
    Ok(values.iter().collect())
}

/// Extract a floating point column
pub fn extract_f64(batch: &RecordBatch, names: &[&str]) -> anyhow::Result<Vec<Option<f64>>> {
    let array = required_column(batch, names, &DataType::Float64)?;
    let values = downcast::<Float64Array>(&array, names)?;
    Ok(values.iter().collect())
}

/// Extract a string column; empty strings are treated as null
pub fn extract_string(batch: &RecordBatch, names: &[&str]) -> anyhow::Result<Vec<Option<String>>> {
    let array = required_column(batch, names, &DataType::Utf8)?;
    let values = downcast::<StringArray>(&array, names)?;
    Ok(values
        .iter()
        .map(|value| value.filter(|v| !v.is_empty()).map(str::to_string))
        .collect())
}

/// Extract a timestamp column as naive date-times
///
/// Accepts Arrow timestamps of any unit, dates, and strings in
/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS` form.
pub fn extract_timestamp(
    batch: &RecordBatch,
    names: &[&str],
    required: bool,
) -> anyhow::Result<Option<Vec<Option<NaiveDateTime>>>> {
    let Some(array) = get_column(
        batch,
        names,
        &DataType::Timestamp(TimeUnit::Microsecond, None),
        required,
    )?
    else {
        return Ok(None);
    };
    let values = downcast::<TimestampMicrosecondArray>(&array, names)?;
    Ok(Some(
        (0..values.len())
            .map(|row| {
                if values.is_null(row) {
                    None
                } else {
                    values.value_as_datetime(row)
                }
            })
            .collect(),
    ))
}
