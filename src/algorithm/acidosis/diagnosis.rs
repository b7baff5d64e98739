//! Diagnosis cross-reference
//!
//! Checks subjects with qualifying episodes against recorded ICD codes. The
//! matching policy is explicit: either a recorded code must start with a
//! configured code (so "E8720" matches "E872") or equal it.

use serde::{Deserialize, Serialize};

use crate::config::{CodeMatch, DetectionConfig};
use crate::models::DiagnosisIndex;
use crate::models::diagnosis::normalize_code;

/// Matches recorded codes against the configured lactic acidosis codes
#[derive(Debug, Clone)]
pub struct DiagnosisMatcher {
    codes: Vec<String>,
    code_match: CodeMatch,
}

impl Default for DiagnosisMatcher {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl DiagnosisMatcher {
    /// Create a matcher from the run configuration
    #[must_use]
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.diagnosis_codes.iter(), config.code_match)
    }

    /// Create a matcher for explicit codes and policy
    pub fn new<I, S>(codes: I, code_match: CodeMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|code| normalize_code(code.as_ref()))
                .filter(|code| !code.is_empty())
                .collect(),
            code_match,
        }
    }

    /// Whether a single recorded code matches
    #[must_use]
    pub fn matches(&self, recorded: &str) -> bool {
        let recorded = normalize_code(recorded);
        self.codes.iter().any(|code| match self.code_match {
            CodeMatch::Prefix => recorded.starts_with(code.as_str()),
            CodeMatch::Exact => recorded == *code,
        })
    }

    /// Whether any of a subject's codes matches
    pub fn has_diagnosis<'a>(&self, codes: impl IntoIterator<Item = &'a str>) -> bool {
        codes.into_iter().any(|code| self.matches(code))
    }

    /// Cross-reference a set of subjects against the diagnosis index
    ///
    /// Subjects are reported in ascending id order; duplicates are collapsed.
    #[must_use]
    pub fn cross_reference(
        &self,
        subjects: impl IntoIterator<Item = i64>,
        index: &DiagnosisIndex,
    ) -> CrossReference {
        let mut subject_ids: Vec<i64> = subjects.into_iter().collect();
        subject_ids.sort_unstable();
        subject_ids.dedup();

        let subjects = subject_ids
            .into_iter()
            .map(|subject_id| SubjectDiagnosis {
                subject_id,
                has_diagnosis: self.has_diagnosis(index.codes(subject_id)),
            })
            .collect();

        CrossReference { subjects }
    }
}

/// Diagnosis flag for one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDiagnosis {
    /// Subject identifier
    pub subject_id: i64,
    /// Whether a lactic acidosis code was recorded
    pub has_diagnosis: bool,
}

/// Result of cross-referencing subjects against diagnosis codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Per-subject flags, ascending by subject id
    pub subjects: Vec<SubjectDiagnosis>,
}

impl CrossReference {
    /// Number of subjects cross-referenced
    #[must_use]
    pub fn subjects_with_episodes(&self) -> usize {
        self.subjects.len()
    }

    /// Number of subjects with a matching diagnosis
    #[must_use]
    pub fn subjects_with_diagnosis(&self) -> usize {
        self.subjects
            .iter()
            .filter(|subject| subject.has_diagnosis)
            .count()
    }

    /// Share of subjects with a matching diagnosis
    ///
    /// `None` when no subject was cross-referenced.
    #[must_use]
    pub fn proportion(&self) -> Option<f64> {
        let total = self.subjects_with_episodes();
        if total == 0 {
            return None;
        }
        Some(self.subjects_with_diagnosis() as f64 / total as f64)
    }

    /// Diagnosis flag for a subject, if it was cross-referenced
    #[must_use]
    pub fn has_diagnosis(&self, subject_id: i64) -> Option<bool> {
        self.subjects
            .binary_search_by_key(&subject_id, |subject| subject.subject_id)
            .ok()
            .map(|position| self.subjects[position].has_diagnosis)
    }
}
