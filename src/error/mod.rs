//! Error handling for acidosis episode detection.
//!
//! The detection core returns [`DetectionError`]. Failures that concern a
//! single subject (an unknown analyte, unsorted input, a non-finite value)
//! exclude that subject from the run; a malformed administration interval only
//! rejects the offending record. File loading and the binary work with
//! `anyhow::Result` and attach context instead.

pub mod util;

use chrono::NaiveDateTime;

/// Errors raised by the detection core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectionError {
    /// Observation tagged with an analyte outside {LACTATE, PH}
    #[error("Unknown analyte tag: '{tag}'")]
    UnknownAnalyte { tag: String },

    /// Observations for one subject/analyte are not in ascending time order
    #[error("Unsorted input for subject {subject_id} ({analyte}): observation {index} precedes its predecessor")]
    UnsortedInput {
        subject_id: i64,
        analyte: String,
        index: usize,
    },

    /// Administration record whose end lies before its start
    #[error("Malformed interval for subject {subject_id} ({drug}): end {end} before start {start}")]
    MalformedInterval {
        subject_id: i64,
        drug: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Observation value that cannot be classified
    #[error("Invalid value for subject {subject_id}: {value}")]
    InvalidValue { subject_id: i64, value: f64 },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DetectionError {
    /// Create an unknown analyte error
    pub fn unknown_analyte(tag: impl Into<String>) -> Self {
        Self::UnknownAnalyte { tag: tag.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the error only invalidates a single record rather than the subject
    #[must_use]
    pub const fn is_record_local(&self) -> bool {
        matches!(self, Self::MalformedInterval { .. })
    }
}

/// Result type for detection operations
pub type Result<T> = std::result::Result<T, DetectionError>;
