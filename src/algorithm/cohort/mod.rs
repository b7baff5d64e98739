//! Cohort-level detection run
//!
//! This module drives the detection core over every subject of a batch. A
//! subject whose data cannot be classified is reported as skipped with the
//! reason, never silently dropped, and never aborts the other subjects.
//! Subjects are independent, so they are processed in parallel with rayon
//! when the configuration allows it.

pub mod statistics;

use std::borrow::Cow;
use std::time::Instant;

use indicatif::{ParallelProgressIterator, ProgressIterator};
use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::algorithm::acidosis::{
    CrossReference, DiagnosisMatcher, EpisodeBuilder, TherapyCorrelator, partition_valid,
};
use crate::config::DetectionConfig;
use crate::error::Result;
use crate::models::{AnnotatedEpisode, DiagnosisIndex, LabReading, SubjectData};
use crate::utils::logging::{finish_progress_bar, optional_progress_bar};
pub use statistics::{CohortStatistics, generate_summary};

/// Detection status of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubjectStatus {
    /// At least one qualifying episode was found
    Qualifying {
        /// Qualifying episodes annotated with therapy, ordered by start time
        episodes: Vec<AnnotatedEpisode>,
        /// Diagnosis flag; `None` when the subject was outside the
        /// cross-referenced population (untreated while therapy is required)
        has_diagnosis: Option<bool>,
    },
    /// Data was classified but no episode qualified
    NoQualifyingEpisodes,
    /// Data could not be classified
    Skipped {
        /// Error that excluded the subject
        reason: String,
    },
}

/// Outcome of the detection run for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectOutcome {
    /// Subject identifier
    pub subject_id: i64,
    /// Detection status
    #[serde(flatten)]
    pub status: SubjectStatus,
    /// Administration records rejected for a malformed interval
    pub rejected_administrations: usize,
}

impl SubjectOutcome {
    /// Qualifying episodes of the subject (empty unless qualifying)
    #[must_use]
    pub fn episodes(&self) -> &[AnnotatedEpisode] {
        match &self.status {
            SubjectStatus::Qualifying { episodes, .. } => episodes.as_slice(),
            _ => &[],
        }
    }

    /// Whether the subject has at least one qualifying episode
    #[must_use]
    pub fn is_qualifying(&self) -> bool {
        matches!(self.status, SubjectStatus::Qualifying { .. })
    }

    /// Whether any qualifying episode was treated with a vasoactive drug
    #[must_use]
    pub fn is_treated(&self) -> bool {
        self.episodes()
            .iter()
            .any(|episode| episode.treated_during_episode)
    }

    /// Whether the subject was skipped
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, SubjectStatus::Skipped { .. })
    }
}

/// Structured result of a cohort run, consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    /// Configuration the run used
    pub config: DetectionConfig,
    /// Per-subject outcomes, ascending by subject id
    pub subjects: Vec<SubjectOutcome>,
    /// Diagnosis cross-reference of the cohort
    pub cross_reference: CrossReference,
    /// Aggregate counts
    pub statistics: CohortStatistics,
}

impl CohortReport {
    /// Outcome for a subject
    #[must_use]
    pub fn subject(&self, subject_id: i64) -> Option<&SubjectOutcome> {
        self.subjects
            .binary_search_by_key(&subject_id, |outcome| outcome.subject_id)
            .ok()
            .map(|position| &self.subjects[position])
    }

    /// Subjects that were skipped, with their reasons
    pub fn skipped(&self) -> impl Iterator<Item = (i64, &str)> {
        self.subjects.iter().filter_map(|outcome| match &outcome.status {
            SubjectStatus::Skipped { reason } => Some((outcome.subject_id, reason.as_str())),
            _ => None,
        })
    }

    /// Render the text summary
    #[must_use]
    pub fn summary(&self) -> String {
        generate_summary(&self.statistics, &self.config)
    }
}

/// Runs episode detection, therapy correlation and diagnosis cross-reference
#[derive(Debug, Clone)]
pub struct CohortRunner {
    config: DetectionConfig,
    builder: EpisodeBuilder,
    correlator: TherapyCorrelator,
    matcher: DiagnosisMatcher,
}

impl CohortRunner {
    /// Create a runner; the configuration is validated first
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: EpisodeBuilder::from_config(&config),
            correlator: TherapyCorrelator::from_config(&config),
            matcher: DiagnosisMatcher::from_config(&config),
            config,
        })
    }

    /// The configuration of this runner
    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Analyse one subject without the diagnosis step
    #[must_use]
    pub fn analyse_subject(&self, subject: &SubjectData) -> SubjectOutcome {
        let (administrations, rejected) = partition_valid(&subject.administrations);

        let status = match self.qualifying_episodes(subject) {
            Ok(episodes) if episodes.is_empty() => SubjectStatus::NoQualifyingEpisodes,
            Ok(episodes) => SubjectStatus::Qualifying {
                episodes: episodes
                    .into_iter()
                    .map(|episode| self.correlator.annotate(episode, &administrations))
                    .collect(),
                has_diagnosis: None,
            },
            Err(e) => {
                warn!("Skipping subject {}: {e}", subject.subject_id);
                SubjectStatus::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        debug!(
            "Subject {}: {:?} ({} rejected administrations)",
            subject.subject_id,
            status,
            rejected.len()
        );

        SubjectOutcome {
            subject_id: subject.subject_id,
            status,
            rejected_administrations: rejected.len(),
        }
    }

    fn qualifying_episodes(&self, subject: &SubjectData) -> Result<Vec<crate::models::Episode>> {
        let observations = subject.observations()?;
        self.builder
            .qualifying_for_subject(subject.subject_id, &observations)
    }

    /// Run detection over a batch of subjects
    ///
    /// Entries sharing a subject id are merged into one subject first, see
    /// [`merge_duplicate_subjects`].
    #[must_use]
    pub fn run(&self, subjects: &[SubjectData], diagnoses: &DiagnosisIndex) -> CohortReport {
        let start = Instant::now();
        let merged = merge_duplicate_subjects(subjects);
        let subjects: &[SubjectData] = &merged;
        info!(
            "Analysing {} subjects ({})",
            subjects.len(),
            if self.config.parallel {
                format!("parallel, {} threads", rayon::current_num_threads())
            } else {
                "sequential".to_string()
            }
        );

        let pb = optional_progress_bar(
            self.config.show_progress,
            subjects.len() as u64,
            Some("Detecting episodes"),
        );

        let mut outcomes: Vec<SubjectOutcome> = if self.config.parallel {
            subjects
                .par_iter()
                .progress_with(pb.clone())
                .map(|subject| self.analyse_subject(subject))
                .collect()
        } else {
            subjects
                .iter()
                .progress_with(pb.clone())
                .map(|subject| self.analyse_subject(subject))
                .collect()
        };
        outcomes.sort_by_key(|outcome| outcome.subject_id);
        finish_progress_bar(&pb, Some("Episode detection complete"));

        let cohort = outcomes
            .iter()
            .filter(|outcome| {
                outcome.is_qualifying() && (!self.config.require_therapy || outcome.is_treated())
            })
            .map(|outcome| outcome.subject_id);
        let cross_reference = self.matcher.cross_reference(cohort, diagnoses);

        for outcome in &mut outcomes {
            if let SubjectStatus::Qualifying { has_diagnosis, .. } = &mut outcome.status {
                *has_diagnosis = cross_reference.has_diagnosis(outcome.subject_id);
            }
        }

        let statistics = CohortStatistics::calculate(&outcomes, &cross_reference);
        info!(
            "Detection finished in {:?}: {} subjects with qualifying episodes, {} skipped",
            start.elapsed(),
            statistics.subjects_with_episodes,
            statistics.subjects_skipped
        );

        CohortReport {
            config: self.config.clone(),
            subjects: outcomes,
            cross_reference,
            statistics,
        }
    }
}

/// Merge entries that share a subject id
///
/// Readings and administrations of all entries for a subject are combined,
/// and the readings stable-sorted by time, as the loader groups them. Input
/// without duplicates is returned unchanged.
#[must_use]
pub fn merge_duplicate_subjects(subjects: &[SubjectData]) -> Cow<'_, [SubjectData]> {
    let mut merged: FxHashMap<i64, SubjectData> = FxHashMap::default();
    let mut duplicates = 0usize;
    for subject in subjects {
        match merged.get_mut(&subject.subject_id) {
            Some(existing) => {
                duplicates += 1;
                existing.readings.extend(subject.readings.iter().cloned());
                existing
                    .administrations
                    .extend(subject.administrations.iter().cloned());
            }
            None => {
                merged.insert(subject.subject_id, subject.clone());
            }
        }
    }

    if duplicates == 0 {
        return Cow::Borrowed(subjects);
    }
    warn!("Merged {duplicates} duplicate subject entries");

    let mut subjects: Vec<SubjectData> = merged.into_values().collect();
    for subject in &mut subjects {
        subject.readings.sort_by_key(LabReading::timestamp);
    }
    subjects.sort_by_key(|subject| subject.subject_id);
    Cow::Owned(subjects)
}
