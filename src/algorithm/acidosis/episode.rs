//! Episode builder
//!
//! Collapses a subject's time-ordered readings for one analyte into maximal
//! runs of abnormal values. A single normal reading ends a run, so two runs
//! separated by one normal reading are never merged however close they are.
//! Each run spans from its first to its last abnormal reading; a run of one
//! reading has zero duration and therefore never qualifies.

use chrono::TimeDelta;
use itertools::Itertools;
use log::debug;

use super::classifier::ThresholdClassifier;
use crate::config::{DetectionConfig, OrderingPolicy};
use crate::error::{DetectionError, Result};
use crate::models::{Analyte, Episode, Observation};

/// Builds episodes from per-analyte observation sequences
#[derive(Debug, Clone)]
pub struct EpisodeBuilder {
    classifier: ThresholdClassifier,
    min_duration: TimeDelta,
    ordering: OrderingPolicy,
}

impl Default for EpisodeBuilder {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl EpisodeBuilder {
    /// Create a builder from the run configuration
    #[must_use]
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            classifier: ThresholdClassifier::from_config(config),
            min_duration: config.min_episode_duration(),
            ordering: config.ordering,
        }
    }

    /// Minimum duration an episode must exceed to qualify
    #[must_use]
    pub const fn min_duration(&self) -> TimeDelta {
        self.min_duration
    }

    /// Build every episode (qualifying or not) for one analyte
    ///
    /// Observations of other analytes or other subjects in `observations`
    /// are ignored.
    pub fn build(
        &self,
        subject_id: i64,
        analyte: Analyte,
        observations: &[Observation],
    ) -> Result<Vec<Episode>> {
        let series: Vec<&Observation> = observations
            .iter()
            .filter(|observation| {
                observation.subject_id == subject_id && observation.analyte == analyte
            })
            .collect();
        let series = self.ordered(subject_id, analyte, series)?;

        let flags = series
            .iter()
            .map(|observation| self.classifier.classify(observation))
            .collect::<Result<Vec<bool>>>()?;

        let runs = series
            .iter()
            .zip(flags)
            .chunk_by(|(_, abnormal)| *abnormal);

        let mut episodes = Vec::new();
        for (abnormal, run) in &runs {
            if !abnormal {
                continue;
            }
            let run: Vec<_> = run.map(|(observation, _)| *observation).collect();
            if let (Some(first), Some(last)) = (run.first(), run.last()) {
                episodes.push(Episode {
                    subject_id,
                    analyte,
                    start_time: first.timestamp,
                    end_time: last.timestamp,
                    observation_count: run.len(),
                });
            }
        }

        debug!(
            "Subject {subject_id}: {} {analyte} readings formed {} abnormal runs",
            series.len(),
            episodes.len()
        );

        Ok(episodes)
    }

    /// Build the qualifying episodes for one analyte
    pub fn qualifying(
        &self,
        subject_id: i64,
        analyte: Analyte,
        observations: &[Observation],
    ) -> Result<Vec<Episode>> {
        Ok(self
            .build(subject_id, analyte, observations)?
            .into_iter()
            .filter(|episode| episode.qualifies(self.min_duration))
            .collect())
    }

    /// Build the qualifying episodes of every analyte for a subject
    ///
    /// Analytes are processed independently; a lactate episode and a pH
    /// episode overlapping in time stay two episodes. The result is ordered
    /// by start time, then analyte.
    pub fn qualifying_for_subject(
        &self,
        subject_id: i64,
        observations: &[Observation],
    ) -> Result<Vec<Episode>> {
        let mut episodes = Vec::new();
        for analyte in Analyte::ALL {
            episodes.extend(self.qualifying(subject_id, analyte, observations)?);
        }
        episodes.sort_by_key(|episode| (episode.start_time, episode.analyte));
        Ok(episodes)
    }

    /// Apply the ordering policy to a single-analyte series
    fn ordered<'a>(
        &self,
        subject_id: i64,
        analyte: Analyte,
        mut series: Vec<&'a Observation>,
    ) -> Result<Vec<&'a Observation>> {
        let unsorted_at = series
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
            .map(|position| position + 1);

        match (unsorted_at, self.ordering) {
            (None, _) => Ok(series),
            (Some(index), OrderingPolicy::Reject) => Err(DetectionError::UnsortedInput {
                subject_id,
                analyte: analyte.to_string(),
                index,
            }),
            (Some(_), OrderingPolicy::Sort) => {
                series.sort_by_key(|observation| observation.timestamp);
                Ok(series)
            }
        }
    }
}
