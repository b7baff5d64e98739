//! Detection of acidosis episodes from laboratory time series.
//!
//! The crate classifies lactate and pH readings against thresholds, groups
//! abnormal readings into episodes, keeps episodes that last long enough,
//! correlates them with vasoactive therapy and cross-references the resulting
//! cohort with recorded lactic acidosis diagnoses.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod utils;

// Core types
pub use config::{CodeMatch, DetectionConfig, OrderingPolicy};
pub use error::{DetectionError, Result};
pub use models::{
    AdministrationRecord, Analyte, AnnotatedEpisode, DiagnosisIndex, DiagnosisLabel, Episode,
    LabReading, Observation, SubjectData,
};

// Detection
pub use algorithm::acidosis::{
    CrossReference, DiagnosisMatcher, EpisodeBuilder, ThresholdClassifier, TherapyCorrelator,
};
pub use algorithm::cohort::{
    CohortReport, CohortRunner, CohortStatistics, SubjectOutcome, SubjectStatus,
};

// Loading
pub use loader::{AnalyteCatalog, LoadedCohort, ObservationLoader, export_episodes};
