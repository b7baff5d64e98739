//! Episode export
//!
//! Flattens qualifying episodes of a cohort report into one row per episode
//! and writes them to Parquet.

use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use super::parquet::write_parquet;
use crate::algorithm::cohort::CohortReport;

/// One exported episode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRow {
    pub subject_id: i64,
    pub analyte: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub observation_count: u64,
    pub treated_during_episode: bool,
    /// Comma-separated, lower-cased drug names
    pub treating_drugs: String,
    pub has_diagnosis: Option<bool>,
}

/// Flatten the qualifying episodes of a report
#[must_use]
pub fn episode_rows(report: &CohortReport) -> Vec<EpisodeRow> {
    let mut rows = Vec::new();
    for outcome in &report.subjects {
        let has_diagnosis = report.cross_reference.has_diagnosis(outcome.subject_id);
        for annotated in outcome.episodes() {
            let episode = &annotated.episode;
            rows.push(EpisodeRow {
                subject_id: episode.subject_id,
                analyte: episode.analyte.to_string(),
                start_time: episode.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                end_time: episode.end_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                duration_minutes: episode.duration_minutes(),
                observation_count: episode.observation_count as u64,
                treated_during_episode: annotated.treated_during_episode,
                treating_drugs: annotated.treating_drugs.join(","),
                has_diagnosis,
            });
        }
    }
    rows
}

/// Write the qualifying episodes of a report to a Parquet file
///
/// Returns the number of rows written. Nothing is written when the report
/// has no qualifying episodes.
pub fn export_episodes(report: &CohortReport, path: &Path) -> anyhow::Result<usize> {
    let rows = episode_rows(report);
    if rows.is_empty() {
        warn!("No qualifying episodes; not writing {}", path.display());
        return Ok(0);
    }
    write_parquet(path, &rows)?;
    info!("Wrote {} episodes to {}", rows.len(), path.display());
    Ok(rows.len())
}
