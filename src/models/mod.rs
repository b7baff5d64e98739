//! Domain models for acidosis episode detection
//!
//! These models represent the inputs of one detection run (observations,
//! administrations, diagnosis labels) and its outputs (episodes).

pub mod administration;
pub mod diagnosis;
pub mod episode;
pub mod observation;

pub use administration::AdministrationRecord;
pub use diagnosis::{DiagnosisIndex, DiagnosisLabel};
pub use episode::{AnnotatedEpisode, Episode};
pub use observation::{Analyte, Observation};

/// Observation as delivered by a loader, before its analyte tag is validated
#[derive(Debug, Clone, PartialEq)]
pub enum LabReading {
    /// Reading with a recognized analyte
    Tagged(Observation),
    /// Reading whose analyte tag could not be resolved
    Unrecognized {
        tag: String,
        value: f64,
        timestamp: chrono::NaiveDateTime,
    },
}

impl LabReading {
    /// Chart time of the reading
    #[must_use]
    pub fn timestamp(&self) -> chrono::NaiveDateTime {
        match self {
            Self::Tagged(observation) => observation.timestamp,
            Self::Unrecognized { timestamp, .. } => *timestamp,
        }
    }
}

/// All inputs for one subject, fully materialized
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubjectData {
    /// Subject identifier
    pub subject_id: i64,
    /// Lab readings, ascending by time within each analyte
    pub readings: Vec<LabReading>,
    /// Drug administrations for the subject
    pub administrations: Vec<AdministrationRecord>,
}

impl SubjectData {
    /// Create an empty subject
    #[must_use]
    pub fn new(subject_id: i64) -> Self {
        Self {
            subject_id,
            ..Self::default()
        }
    }

    /// Add a typed observation
    #[must_use]
    pub fn with_observation(mut self, observation: Observation) -> Self {
        self.readings.push(LabReading::Tagged(observation));
        self
    }

    /// Add several typed observations
    #[must_use]
    pub fn with_observations(mut self, observations: impl IntoIterator<Item = Observation>) -> Self {
        self.readings
            .extend(observations.into_iter().map(LabReading::Tagged));
        self
    }

    /// Add an administration record
    #[must_use]
    pub fn with_administration(mut self, record: AdministrationRecord) -> Self {
        self.administrations.push(record);
        self
    }

    /// Resolve every reading into a typed observation
    ///
    /// Fails with the first unrecognized analyte tag.
    pub fn observations(&self) -> crate::error::Result<Vec<Observation>> {
        self.readings
            .iter()
            .map(|reading| match reading {
                LabReading::Tagged(observation) => Ok(observation.clone()),
                LabReading::Unrecognized { tag, .. } => {
                    Err(crate::error::DetectionError::unknown_analyte(tag.clone()))
                }
            })
            .collect()
    }
}
