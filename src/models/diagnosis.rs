//! Diagnosis label model
//!
//! This module contains the diagnosis label (a subject and one ICD code) and an
//! index of codes per subject that the cross-referencer joins against.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// A recorded diagnosis code for one subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiagnosisLabel {
    /// Subject the code was recorded for
    pub subject_id: i64,
    /// ICD diagnosis code as recorded
    pub code: String,
}

impl DiagnosisLabel {
    /// Create a new diagnosis label
    #[must_use]
    pub fn new(subject_id: i64, code: impl Into<String>) -> Self {
        Self {
            subject_id,
            code: code.into(),
        }
    }

    /// The code in normalized form, see [`normalize_code`]
    #[must_use]
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }
}

/// Clean and normalize an ICD code: trimmed, upper-cased, without dots
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| *c != '.')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Diagnosis codes indexed by subject
#[derive(Debug, Clone, Default)]
pub struct DiagnosisIndex {
    codes_by_subject: FxHashMap<i64, FxHashSet<String>>,
}

impl DiagnosisIndex {
    /// Create a new empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a list of labels
    #[must_use]
    pub fn from_labels(labels: impl IntoIterator<Item = DiagnosisLabel>) -> Self {
        let mut index = Self::new();
        for label in labels {
            index.add(label);
        }
        index
    }

    /// Add a label to the index; codes are stored normalized
    pub fn add(&mut self, label: DiagnosisLabel) {
        let code = label.normalized_code();
        if code.is_empty() {
            return;
        }
        self.codes_by_subject
            .entry(label.subject_id)
            .or_default()
            .insert(code);
    }

    /// Codes recorded for a subject (empty when the subject has none)
    pub fn codes(&self, subject_id: i64) -> impl Iterator<Item = &str> {
        self.codes_by_subject
            .get(&subject_id)
            .into_iter()
            .flat_map(|codes| codes.iter().map(String::as_str))
    }

    /// Number of subjects with at least one code
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.codes_by_subject.len()
    }

    /// Total number of distinct (subject, code) pairs
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.codes_by_subject.values().map(FxHashSet::len).sum()
    }
}

impl FromIterator<DiagnosisLabel> for DiagnosisIndex {
    fn from_iter<I: IntoIterator<Item = DiagnosisLabel>>(iter: I) -> Self {
        Self::from_labels(iter)
    }
}
