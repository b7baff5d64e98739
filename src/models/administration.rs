//! Drug administration model

use crate::error::{DetectionError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A drug administration interval for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrationRecord {
    /// Subject the drug was given to
    pub subject_id: i64,
    /// Medication name as recorded
    pub drug_name: String,
    /// Start of the administration
    pub start_time: NaiveDateTime,
    /// End of the administration (equal to the start for a single dose)
    pub end_time: NaiveDateTime,
}

impl AdministrationRecord {
    /// Create a new administration interval
    #[must_use]
    pub fn new(
        subject_id: i64,
        drug_name: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Self {
        Self {
            subject_id,
            drug_name: drug_name.into(),
            start_time,
            end_time,
        }
    }

    /// Create a point administration from a single scheduled time
    #[must_use]
    pub fn at(subject_id: i64, drug_name: impl Into<String>, time: NaiveDateTime) -> Self {
        Self::new(subject_id, drug_name, time, time)
    }

    /// Check the `start_time <= end_time` invariant
    pub fn validate(&self) -> Result<()> {
        if self.end_time < self.start_time {
            return Err(DetectionError::MalformedInterval {
                subject_id: self.subject_id,
                drug: self.drug_name.clone(),
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }

    /// Inclusive interval overlap with `[start, end]`
    #[must_use]
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_time <= end && self.end_time >= start
    }
}
