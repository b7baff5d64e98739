//! Acidosis episode model
//!
//! An episode is a maximal run of abnormal readings for one subject and one
//! analyte. Episodes are built by the episode builder and never mutated
//! afterwards; annotation with therapy information wraps them instead.

use super::observation::Analyte;
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// A contiguous run of abnormal readings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Subject the episode belongs to
    pub subject_id: i64,
    /// Analyte whose readings were abnormal
    pub analyte: Analyte,
    /// Timestamp of the first abnormal reading of the run
    pub start_time: NaiveDateTime,
    /// Timestamp of the last abnormal reading of the run
    pub end_time: NaiveDateTime,
    /// Number of abnormal readings in the run
    pub observation_count: usize,
}

impl Episode {
    /// Time between the first and last abnormal reading
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    /// Duration in whole minutes
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Whether the episode lasts strictly longer than `min_duration`
    #[must_use]
    pub fn qualifies(&self, min_duration: TimeDelta) -> bool {
        self.duration() > min_duration
    }
}

/// Qualifying episode annotated with the therapy given during it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedEpisode {
    /// The detected episode
    #[serde(flatten)]
    pub episode: Episode,
    /// Whether a vasoactive drug overlapped the episode window
    pub treated_during_episode: bool,
    /// Distinct vasoactive drugs overlapping the window, lower-cased
    pub treating_drugs: Vec<String>,
}
