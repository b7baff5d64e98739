//! Cohort statistics and summaries
//!
//! This module aggregates subject outcomes into the counts reported at the
//! end of a run, and renders them as text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SubjectOutcome;
use crate::algorithm::acidosis::CrossReference;
use crate::config::DetectionConfig;
use crate::models::Analyte;

/// Aggregate counts of a cohort run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortStatistics {
    /// Subjects processed (including skipped ones)
    pub subjects_analysed: usize,
    /// Subjects with at least one qualifying episode
    pub subjects_with_episodes: usize,
    /// Subjects with at least one qualifying episode treated with a vasoactive drug
    pub subjects_treated: usize,
    /// Subjects classified without any qualifying episode
    pub subjects_without_episodes: usize,
    /// Subjects excluded because their data could not be classified
    pub subjects_skipped: usize,
    /// Total number of qualifying episodes
    pub qualifying_episodes: usize,
    /// Qualifying episodes per analyte
    pub episodes_by_analyte: BTreeMap<Analyte, usize>,
    /// Qualifying episodes overlapping a vasoactive administration
    pub treated_episodes: usize,
    /// Administration records rejected for a malformed interval
    pub rejected_administrations: usize,
    /// Subjects in the diagnosis cross-reference
    pub subjects_cross_referenced: usize,
    /// Cross-referenced subjects with a lactic acidosis code
    pub subjects_with_diagnosis: usize,
    /// `subjects_with_diagnosis / subjects_cross_referenced`; `None` for an empty cohort
    pub diagnosis_proportion: Option<f64>,
}

impl CohortStatistics {
    /// Calculate statistics from subject outcomes and the cross-reference
    #[must_use]
    pub fn calculate(outcomes: &[SubjectOutcome], cross_reference: &CrossReference) -> Self {
        let mut stats = Self {
            subjects_analysed: outcomes.len(),
            subjects_cross_referenced: cross_reference.subjects_with_episodes(),
            subjects_with_diagnosis: cross_reference.subjects_with_diagnosis(),
            diagnosis_proportion: cross_reference.proportion(),
            ..Self::default()
        };

        for outcome in outcomes {
            stats.rejected_administrations += outcome.rejected_administrations;

            if outcome.is_skipped() {
                stats.subjects_skipped += 1;
                continue;
            }
            if !outcome.is_qualifying() {
                stats.subjects_without_episodes += 1;
                continue;
            }

            stats.subjects_with_episodes += 1;
            if outcome.is_treated() {
                stats.subjects_treated += 1;
            }
            for annotated in outcome.episodes() {
                stats.qualifying_episodes += 1;
                *stats
                    .episodes_by_analyte
                    .entry(annotated.episode.analyte)
                    .or_insert(0) += 1;
                if annotated.treated_during_episode {
                    stats.treated_episodes += 1;
                }
            }
        }

        stats
    }

    /// Diagnosis proportion as a percentage, 0 for an empty cohort
    #[must_use]
    pub fn diagnosis_percentage(&self) -> f64 {
        self.diagnosis_proportion.unwrap_or(0.0) * 100.0
    }
}

/// Generate the text summary of a cohort run
#[must_use]
pub fn generate_summary(stats: &CohortStatistics, config: &DetectionConfig) -> String {
    let mut summary = String::new();
    summary.push_str("Acidosis Episode Summary:\n");
    summary.push_str(&format!("  Subjects Analysed: {}\n", stats.subjects_analysed));
    summary.push_str(&format!(
        "  Subjects with Qualifying Episodes (> {} min): {}\n",
        config.min_episode_duration_minutes, stats.subjects_with_episodes
    ));
    summary.push_str(&format!(
        "  Subjects Treated with Vasoactive Drugs: {}\n",
        stats.subjects_treated
    ));
    summary.push_str(&format!(
        "  Subjects without Qualifying Episodes: {}\n",
        stats.subjects_without_episodes
    ));
    summary.push_str(&format!(
        "  Subjects Skipped (malformed data): {}\n",
        stats.subjects_skipped
    ));

    summary.push_str(&format!(
        "\nQualifying Episodes: {}\n",
        stats.qualifying_episodes
    ));
    for analyte in Analyte::ALL {
        let count = stats.episodes_by_analyte.get(&analyte).copied().unwrap_or(0);
        summary.push_str(&format!("  {analyte}: {count}\n"));
    }
    summary.push_str(&format!(
        "  Treated During Episode: {}\n",
        stats.treated_episodes
    ));
    if stats.rejected_administrations > 0 {
        summary.push_str(&format!(
            "  Rejected Administration Records: {}\n",
            stats.rejected_administrations
        ));
    }

    summary.push_str("\nDiagnosis Cross-Reference:\n");
    summary.push_str(&format!(
        "  Number of subjects identified: {}\n",
        stats.subjects_cross_referenced
    ));
    summary.push_str(&format!(
        "  Number with lactic acidosis diagnosis: {}\n",
        stats.subjects_with_diagnosis
    ));
    match stats.diagnosis_proportion {
        Some(_) => summary.push_str(&format!(
            "  Percentage with diagnosis: {:.2}%\n",
            stats.diagnosis_percentage()
        )),
        None => summary.push_str("  Percentage with diagnosis: undefined (0 subjects)\n"),
    }

    summary
}
