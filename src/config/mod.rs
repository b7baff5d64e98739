//! Configuration for acidosis episode detection.

use crate::error::{DetectionError, Result};
use anyhow::Context;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Default vasoactive medications, lower-cased
pub const DEFAULT_VASOACTIVE_DRUGS: [&str; 14] = [
    "dopamine",
    "milrinone",
    "vasopressin",
    "nitroglycerin",
    "nitroprusside",
    "epinephrine",
    "norepinephrine",
    "levophed",
    "dobutamine",
    "hydralazine",
    "labetalol",
    "methylene blue",
    "terlipressin",
    "angiotensin ii",
];

/// Default ICD-10 code for lactic acidosis
pub const DEFAULT_DIAGNOSIS_CODE: &str = "E872";

/// How configured diagnosis codes are compared with recorded ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeMatch {
    /// Recorded code starts with a configured code ("E8720" matches "E872")
    #[default]
    Prefix,
    /// Recorded code equals a configured code
    Exact,
}

/// What the episode builder does with observations out of time order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Fail with an unsorted-input error; the subject is skipped
    #[default]
    Reject,
    /// Sort the observations by timestamp before building episodes
    Sort,
}

/// Configuration for a detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Lactate is abnormal when the value exceeds this (mmol/L)
    pub lactate_threshold: f64,
    /// pH is abnormal when the value is below this
    pub ph_threshold: f64,
    /// Episodes qualify when they last strictly longer than this
    pub min_episode_duration_minutes: i64,
    /// Medications counted as vasoactive therapy
    #[serde(alias = "vasoactive_drug_set")]
    pub vasoactive_drugs: BTreeSet<String>,
    /// Diagnosis codes associated with lactic acidosis
    #[serde(alias = "diagnosis_code_set")]
    pub diagnosis_codes: BTreeSet<String>,
    /// Matching policy for diagnosis codes
    pub code_match: CodeMatch,
    /// Handling of unsorted observation sequences
    pub ordering: OrderingPolicy,
    /// Cross-reference only subjects with a treated qualifying episode
    pub require_therapy: bool,
    /// Process subjects in parallel
    pub parallel: bool,
    /// Show a progress bar while processing subjects
    pub show_progress: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            lactate_threshold: 4.0,
            ph_threshold: 7.35,
            min_episode_duration_minutes: 120,
            vasoactive_drugs: DEFAULT_VASOACTIVE_DRUGS
                .iter()
                .map(|drug| (*drug).to_string())
                .collect(),
            diagnosis_codes: BTreeSet::from([DEFAULT_DIAGNOSIS_CODE.to_string()]),
            code_match: CodeMatch::Prefix,
            ordering: OrderingPolicy::Reject,
            require_therapy: false,
            parallel: true,
            show_progress: false,
        }
    }
}

impl DetectionConfig {
    /// Create a new configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the lactate threshold
    #[must_use]
    pub fn with_lactate_threshold(mut self, threshold: f64) -> Self {
        self.lactate_threshold = threshold;
        self
    }

    /// Set the pH threshold
    #[must_use]
    pub fn with_ph_threshold(mut self, threshold: f64) -> Self {
        self.ph_threshold = threshold;
        self
    }

    /// Set the minimum episode duration in minutes
    #[must_use]
    pub fn with_min_duration_minutes(mut self, minutes: i64) -> Self {
        self.min_episode_duration_minutes = minutes;
        self
    }

    /// Replace the vasoactive drug set
    #[must_use]
    pub fn with_vasoactive_drugs<I, S>(mut self, drugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.vasoactive_drugs = drugs
            .into_iter()
            .map(|drug| drug.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Replace the diagnosis code set and its matching policy
    #[must_use]
    pub fn with_diagnosis_codes<I, S>(mut self, codes: I, code_match: CodeMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.diagnosis_codes = codes
            .into_iter()
            .map(|code| code.as_ref().to_string())
            .collect();
        self.code_match = code_match;
        self
    }

    /// Set the ordering policy
    #[must_use]
    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    /// Restrict the diagnosis cross-reference to treated subjects
    #[must_use]
    pub fn with_require_therapy(mut self, require_therapy: bool) -> Self {
        self.require_therapy = require_therapy;
        self
    }

    /// Enable or disable parallel processing
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable the progress bar
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Minimum episode duration as a time delta
    ///
    /// Saturates at [`TimeDelta::MAX`] for settings beyond chrono's range;
    /// `validate` rejects those.
    #[must_use]
    pub fn min_episode_duration(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.min_episode_duration_minutes).unwrap_or(TimeDelta::MAX)
    }

    /// Check the configuration for values the detection core cannot use
    pub fn validate(&self) -> Result<()> {
        if !self.lactate_threshold.is_finite() {
            return Err(DetectionError::config(format!(
                "lactate_threshold must be finite, got {}",
                self.lactate_threshold
            )));
        }
        if !self.ph_threshold.is_finite() {
            return Err(DetectionError::config(format!(
                "ph_threshold must be finite, got {}",
                self.ph_threshold
            )));
        }
        if self.min_episode_duration_minutes < 0 {
            return Err(DetectionError::config(format!(
                "min_episode_duration_minutes must not be negative, got {}",
                self.min_episode_duration_minutes
            )));
        }
        if TimeDelta::try_minutes(self.min_episode_duration_minutes).is_none() {
            return Err(DetectionError::config(format!(
                "min_episode_duration_minutes is out of range, got {}",
                self.min_episode_duration_minutes
            )));
        }
        if self.diagnosis_codes.iter().all(|code| code.trim().is_empty()) {
            return Err(DetectionError::config(
                "diagnosis_codes must contain at least one code",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for DetectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Detection Configuration:")?;
        writeln!(f, "  Lactate Threshold: > {}", self.lactate_threshold)?;
        writeln!(f, "  pH Threshold: < {}", self.ph_threshold)?;
        writeln!(
            f,
            "  Minimum Episode Duration: > {} min",
            self.min_episode_duration_minutes
        )?;
        writeln!(
            f,
            "  Vasoactive Drugs: {}",
            self.vasoactive_drugs
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(
            f,
            "  Diagnosis Codes: {} ({:?} match)",
            self.diagnosis_codes
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            self.code_match
        )?;
        writeln!(f, "  Ordering Policy: {:?}", self.ordering)?;
        writeln!(f, "  Require Therapy: {}", self.require_therapy)?;
        Ok(())
    }
}
