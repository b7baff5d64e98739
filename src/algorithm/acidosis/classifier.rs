//! Threshold classification of lab observations

use crate::config::DetectionConfig;
use crate::error::{DetectionError, Result};
use crate::models::{Analyte, Observation};

/// Labels observations as abnormal or normal per analyte
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdClassifier {
    /// Lactate is abnormal above this value
    pub lactate_threshold: f64,
    /// pH is abnormal below this value
    pub ph_threshold: f64,
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl ThresholdClassifier {
    /// Create a classifier from the run configuration
    #[must_use]
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            lactate_threshold: config.lactate_threshold,
            ph_threshold: config.ph_threshold,
        }
    }

    /// Whether a value for the given analyte is abnormal
    ///
    /// Both rules use strict inequalities: a lactate of exactly the threshold
    /// and a pH of exactly the threshold are normal.
    #[must_use]
    pub fn is_abnormal_value(&self, analyte: Analyte, value: f64) -> bool {
        match analyte {
            Analyte::Lactate => value > self.lactate_threshold,
            Analyte::Ph => value < self.ph_threshold,
        }
    }

    /// Whether an observation is abnormal
    #[must_use]
    pub fn is_abnormal(&self, observation: &Observation) -> bool {
        self.is_abnormal_value(observation.analyte, observation.value)
    }

    /// Classify an observation, rejecting values that cannot be compared
    pub fn classify(&self, observation: &Observation) -> Result<bool> {
        if !observation.value.is_finite() {
            return Err(DetectionError::InvalidValue {
                subject_id: observation.subject_id,
                value: observation.value,
            });
        }
        Ok(self.is_abnormal(observation))
    }

    /// Classify an untyped (tag, value) pair
    pub fn classify_tag(&self, tag: &str, value: f64) -> Result<bool> {
        let analyte: Analyte = tag.parse()?;
        Ok(self.is_abnormal_value(analyte, value))
    }
}
