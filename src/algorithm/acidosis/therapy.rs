//! Therapy correlation
//!
//! Joins qualifying episodes against a subject's vasoactive drug
//! administrations using inclusive interval overlap.

use log::warn;
use rustc_hash::FxHashSet;

use crate::config::DetectionConfig;
use crate::error::DetectionError;
use crate::models::{AdministrationRecord, AnnotatedEpisode, Episode};

/// Decides whether an episode was treated with a vasoactive drug
#[derive(Debug, Clone)]
pub struct TherapyCorrelator {
    vasoactive_drugs: FxHashSet<String>,
}

impl Default for TherapyCorrelator {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

impl TherapyCorrelator {
    /// Create a correlator from the run configuration
    #[must_use]
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.vasoactive_drugs.iter())
    }

    /// Create a correlator for an explicit drug set
    pub fn new<I, S>(drugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            vasoactive_drugs: drugs
                .into_iter()
                .map(|drug| normalize_drug(drug.as_ref()))
                .collect(),
        }
    }

    /// Whether a medication name belongs to the vasoactive set
    #[must_use]
    pub fn is_vasoactive(&self, drug_name: &str) -> bool {
        self.vasoactive_drugs.contains(&normalize_drug(drug_name))
    }

    /// Records of the episode's subject that are vasoactive and overlap its window
    fn overlapping<'a>(
        &'a self,
        episode: &'a Episode,
        records: &'a [AdministrationRecord],
    ) -> impl Iterator<Item = &'a AdministrationRecord> + 'a {
        records.iter().filter(move |record| {
            record.subject_id == episode.subject_id
                && self.is_vasoactive(&record.drug_name)
                && record.overlaps(episode.start_time, episode.end_time)
        })
    }

    /// Whether a vasoactive administration overlaps the episode window
    ///
    /// Overlap is inclusive at both ends: an administration ending exactly at
    /// the episode start counts.
    #[must_use]
    pub fn treated_during_episode(
        &self,
        episode: &Episode,
        records: &[AdministrationRecord],
    ) -> bool {
        self.overlapping(episode, records).next().is_some()
    }

    /// Distinct vasoactive drugs overlapping the episode, sorted
    #[must_use]
    pub fn treating_drugs(&self, episode: &Episode, records: &[AdministrationRecord]) -> Vec<String> {
        let mut drugs: Vec<String> = self
            .overlapping(episode, records)
            .map(|record| normalize_drug(&record.drug_name))
            .collect();
        drugs.sort_unstable();
        drugs.dedup();
        drugs
    }

    /// Annotate an episode with its therapy flags
    #[must_use]
    pub fn annotate(&self, episode: Episode, records: &[AdministrationRecord]) -> AnnotatedEpisode {
        let treating_drugs = self.treating_drugs(&episode, records);
        AnnotatedEpisode {
            treated_during_episode: !treating_drugs.is_empty(),
            treating_drugs,
            episode,
        }
    }
}

/// Split administration records into valid ones and rejected interval errors
///
/// A malformed record is dropped on its own; the remaining records of the
/// subject are still used.
#[must_use]
pub fn partition_valid(
    records: &[AdministrationRecord],
) -> (Vec<AdministrationRecord>, Vec<DetectionError>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for record in records {
        match record.validate() {
            Ok(()) => valid.push(record.clone()),
            Err(e) => {
                warn!("Rejecting administration record: {e}");
                rejected.push(e);
            }
        }
    }

    (valid, rejected)
}

fn normalize_drug(name: &str) -> String {
    name.trim().to_lowercase()
}
