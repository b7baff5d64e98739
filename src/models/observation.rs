//! Laboratory observation model
//!
//! This module contains the Observation model, a single lab measurement
//! tagged with the analyte it measures.

use crate::error::{DetectionError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Measured lab quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Analyte {
    /// Lactate concentration (mmol/L)
    Lactate,
    /// Blood pH
    Ph,
}

impl Analyte {
    /// All supported analytes, in reporting order
    pub const ALL: [Self; 2] = [Self::Lactate, Self::Ph];

    /// Canonical tag for this analyte
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lactate => "LACTATE",
            Self::Ph => "PH",
        }
    }
}

impl FromStr for Analyte {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LACTATE" => Ok(Self::Lactate),
            "PH" => Ok(Self::Ph),
            _ => Err(DetectionError::unknown_analyte(s)),
        }
    }
}

impl fmt::Display for Analyte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single lab measurement for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Subject the measurement belongs to
    pub subject_id: i64,
    /// Measured analyte
    pub analyte: Analyte,
    /// Measured value
    pub value: f64,
    /// Chart time of the measurement
    pub timestamp: NaiveDateTime,
}

impl Observation {
    /// Create a new observation
    #[must_use]
    pub const fn new(
        subject_id: i64,
        analyte: Analyte,
        value: f64,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            subject_id,
            analyte,
            value,
            timestamp,
        }
    }

    /// Create an observation from an untyped analyte tag
    pub fn from_tag(
        subject_id: i64,
        tag: &str,
        value: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Self> {
        Ok(Self::new(subject_id, tag.parse()?, value, timestamp))
    }
}
