//! Acidosis episode detection
//!
//! This module implements the detection core: threshold classification of lab
//! readings, collapsing abnormal readings into duration-qualified episodes,
//! correlating episodes with vasoactive therapy, and cross-referencing the
//! affected subjects against lactic acidosis diagnosis codes.
//!
//! All functions here are pure over their inputs; the cohort runner drives
//! them per subject.

pub mod classifier;
pub mod diagnosis;
pub mod episode;
pub mod therapy;

pub use classifier::ThresholdClassifier;
pub use diagnosis::{CrossReference, DiagnosisMatcher, SubjectDiagnosis};
pub use episode::EpisodeBuilder;
pub use therapy::{TherapyCorrelator, partition_valid};
