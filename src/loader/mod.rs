//! Observation loader
//!
//! Loads extracted warehouse tables from Parquet and materializes them per
//! subject for the detection core. The loader owns the input contract: rows
//! with missing required values are dropped (as a `valuenum IS NOT NULL`
//! filter would), and each subject's readings are sorted by chart time before
//! they are handed over.
//!
//! Lab events come in one of two layouts:
//! - tagged: `subject_id`, `analyte`, `value`, `charttime`
//! - item based: `subject_id`, `itemid`, `valuenum`, `charttime`, resolved
//!   through an [`AnalyteCatalog`]; rows with items outside the catalog are
//!   not lab readings of interest and are skipped.

pub mod catalog;
pub mod columns;
pub mod export;
pub mod parquet;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::models::{
    AdministrationRecord, Analyte, DiagnosisIndex, DiagnosisLabel, LabReading, Observation,
    SubjectData,
};
pub use catalog::{AnalyteCatalog, LabItem};
pub use export::{EpisodeRow, episode_rows, export_episodes};
use columns::{extract_f64, extract_i64, extract_string, extract_timestamp, has_column};
use self::parquet::read_parquet_dir;

const SUBJECT_COLUMNS: &[&str] = &["subject_id"];
const TIME_COLUMNS: &[&str] = &["charttime", "timestamp"];
const VALUE_COLUMNS: &[&str] = &["valuenum", "value", "measure_value"];
const ANALYTE_COLUMNS: &[&str] = &["analyte"];
const ITEM_COLUMNS: &[&str] = &["itemid"];
const DRUG_COLUMNS: &[&str] = &["drug_name", "medication"];
const START_COLUMNS: &[&str] = &["start_time", "starttime", "scheduletime"];
const END_COLUMNS: &[&str] = &["end_time", "endtime", "stoptime"];
const CODE_COLUMNS: &[&str] = &["code", "icd_code"];

/// Materialized inputs of one detection run
#[derive(Debug, Clone, Default)]
pub struct LoadedCohort {
    /// Subjects with at least one lab reading, ascending by id
    pub subjects: Vec<SubjectData>,
    /// Diagnosis codes by subject
    pub diagnoses: DiagnosisIndex,
}

/// Loads lab events, administrations and diagnoses from Parquet files
#[derive(Debug, Clone)]
pub struct ObservationLoader {
    lab_events: PathBuf,
    administrations: Option<PathBuf>,
    diagnoses: Option<PathBuf>,
    lab_items: Option<PathBuf>,
    catalog: Option<AnalyteCatalog>,
}

impl ObservationLoader {
    /// Create a loader for a lab events file or directory
    #[must_use]
    pub fn new(lab_events: impl Into<PathBuf>) -> Self {
        Self {
            lab_events: lab_events.into(),
            administrations: None,
            diagnoses: None,
            lab_items: None,
            catalog: None,
        }
    }

    /// Set the administrations file or directory
    #[must_use]
    pub fn with_administrations(mut self, path: impl Into<PathBuf>) -> Self {
        self.administrations = Some(path.into());
        self
    }

    /// Set the diagnoses file or directory
    #[must_use]
    pub fn with_diagnoses(mut self, path: impl Into<PathBuf>) -> Self {
        self.diagnoses = Some(path.into());
        self
    }

    /// Set the lab item dictionary used to resolve item-based lab events
    #[must_use]
    pub fn with_lab_items(mut self, path: impl Into<PathBuf>) -> Self {
        self.lab_items = Some(path.into());
        self
    }

    /// Use an explicit catalog to resolve item-based lab events
    #[must_use]
    pub fn with_catalog(mut self, catalog: AnalyteCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Load every configured table and group the data per subject
    pub fn load(&self) -> anyhow::Result<LoadedCohort> {
        let readings = self.load_readings()?;
        let administrations = self.load_administrations()?;
        let diagnoses = DiagnosisIndex::from_labels(self.load_diagnoses()?);

        let subjects = group_by_subject(readings, administrations);
        info!(
            "Loaded {} subjects, diagnosis codes for {} subjects",
            subjects.len(),
            diagnoses.subject_count()
        );

        Ok(LoadedCohort {
            subjects,
            diagnoses,
        })
    }

    /// Load lab readings
    pub fn load_readings(&self) -> anyhow::Result<Vec<(i64, LabReading)>> {
        let catalog = match (&self.catalog, &self.lab_items) {
            (Some(catalog), _) => Some(catalog.clone()),
            (None, Some(path)) => Some(AnalyteCatalog::load(path)?),
            (None, None) => None,
        };

        let mut readings = Vec::new();
        for batch in read_parquet_dir(&self.lab_events, "loading lab events")? {
            readings.extend(readings_from_batch(&batch, catalog.as_ref())?);
        }
        Ok(readings)
    }

    /// Load drug administrations (empty when no source is configured)
    pub fn load_administrations(&self) -> anyhow::Result<Vec<AdministrationRecord>> {
        let Some(path) = &self.administrations else {
            return Ok(Vec::new());
        };
        load_table(path, "loading drug administrations", administrations_from_batch)
    }

    /// Load diagnosis labels (empty when no source is configured)
    pub fn load_diagnoses(&self) -> anyhow::Result<Vec<DiagnosisLabel>> {
        let Some(path) = &self.diagnoses else {
            return Ok(Vec::new());
        };
        load_table(path, "loading diagnoses", diagnoses_from_batch)
    }
}

fn load_table<T>(
    path: &Path,
    purpose: &str,
    convert: impl Fn(&RecordBatch) -> anyhow::Result<Vec<T>>,
) -> anyhow::Result<Vec<T>> {
    let mut rows = Vec::new();
    for batch in read_parquet_dir(path, purpose)? {
        rows.extend(convert(&batch).with_context(|| format!("Failed while {purpose}"))?);
    }
    Ok(rows)
}

/// Convert a lab events batch into readings
pub fn readings_from_batch(
    batch: &RecordBatch,
    catalog: Option<&AnalyteCatalog>,
) -> anyhow::Result<Vec<(i64, LabReading)>> {
    let subjects = extract_i64(batch, SUBJECT_COLUMNS)?;
    let values = extract_f64(batch, VALUE_COLUMNS)?;
    let times = extract_timestamp(batch, TIME_COLUMNS, true)?
        .ok_or_else(|| anyhow!("Lab events need a chart time column"))?;

    let tags: Vec<Option<Tag>> = if has_column(batch, ANALYTE_COLUMNS) {
        extract_string(batch, ANALYTE_COLUMNS)?
            .into_iter()
            .map(|tag| tag.map(Tag::Text))
            .collect()
    } else if has_column(batch, ITEM_COLUMNS) {
        let catalog = catalog.ok_or_else(|| {
            anyhow!("Lab events are identified by itemid; a lab item catalog is required")
        })?;
        extract_i64(batch, ITEM_COLUMNS)?
            .into_iter()
            .map(|item| item.map(|id| Tag::Item(catalog.resolve(id))))
            .collect()
    } else {
        return Err(anyhow!(
            "Lab events need an 'analyte' or an 'itemid' column"
        ));
    };

    let mut readings = Vec::with_capacity(batch.num_rows());
    let mut incomplete = 0usize;
    let mut other_items = 0usize;

    for (((subject, value), time), tag) in subjects.into_iter().zip(values).zip(times).zip(tags) {
        let (Some(subject_id), Some(value), Some(timestamp), Some(tag)) = (subject, value, time, tag)
        else {
            incomplete += 1;
            continue;
        };

        let reading = match tag {
            Tag::Item(None) => {
                other_items += 1;
                continue;
            }
            Tag::Item(Some(analyte)) => {
                LabReading::Tagged(Observation::new(subject_id, analyte, value, timestamp))
            }
            Tag::Text(text) => match text.parse::<Analyte>() {
                Ok(analyte) => {
                    LabReading::Tagged(Observation::new(subject_id, analyte, value, timestamp))
                }
                Err(_) => LabReading::Unrecognized {
                    tag: text,
                    value,
                    timestamp,
                },
            },
        };
        readings.push((subject_id, reading));
    }

    if incomplete > 0 {
        warn!("Dropped {incomplete} lab rows with missing subject, value, time or analyte");
    }
    if other_items > 0 {
        debug!("Skipped {other_items} lab rows for items outside the catalog");
    }

    Ok(readings)
}

enum Tag {
    Text(String),
    Item(Option<Analyte>),
}

/// Convert an administrations batch into records
///
/// A missing end time makes the record a point administration at its start.
pub fn administrations_from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<AdministrationRecord>> {
    let subjects = extract_i64(batch, SUBJECT_COLUMNS)?;
    let drugs = extract_string(batch, DRUG_COLUMNS)?;
    let starts = extract_timestamp(batch, START_COLUMNS, true)?
        .ok_or_else(|| anyhow!("Administrations need a start time column"))?;
    let ends = extract_timestamp(batch, END_COLUMNS, false)?
        .unwrap_or_else(|| vec![None; batch.num_rows()]);

    let mut records = Vec::with_capacity(batch.num_rows());
    let mut incomplete = 0usize;
    for (((subject, drug), start), end) in subjects.into_iter().zip(drugs).zip(starts).zip(ends) {
        let (Some(subject_id), Some(drug), Some(start)) = (subject, drug, start) else {
            incomplete += 1;
            continue;
        };
        records.push(AdministrationRecord::new(
            subject_id,
            drug,
            start,
            end.unwrap_or(start),
        ));
    }

    if incomplete > 0 {
        warn!("Dropped {incomplete} administration rows with missing subject, drug or time");
    }
    Ok(records)
}

/// Convert a diagnoses batch into labels
pub fn diagnoses_from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<DiagnosisLabel>> {
    let subjects = extract_i64(batch, SUBJECT_COLUMNS)?;
    let codes = extract_string(batch, CODE_COLUMNS)?;
    Ok(subjects
        .into_iter()
        .zip(codes)
        .filter_map(|(subject, code)| Some(DiagnosisLabel::new(subject?, code?)))
        .collect())
}

/// Group readings and administrations per subject
///
/// Only subjects with lab readings are returned, ascending by id. Each
/// subject's readings are sorted by chart time (stable, so equal times keep
/// their file order).
#[must_use]
pub fn group_by_subject(
    readings: Vec<(i64, LabReading)>,
    administrations: Vec<AdministrationRecord>,
) -> Vec<SubjectData> {
    let mut by_subject: FxHashMap<i64, SubjectData> = FxHashMap::default();
    for (subject_id, reading) in readings {
        by_subject
            .entry(subject_id)
            .or_insert_with(|| SubjectData::new(subject_id))
            .readings
            .push(reading);
    }

    let mut unmatched = 0usize;
    for record in administrations {
        match by_subject.get_mut(&record.subject_id) {
            Some(subject) => subject.administrations.push(record),
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        debug!("{unmatched} administration records belong to subjects without lab readings");
    }

    let mut subjects: Vec<SubjectData> = by_subject.into_values().collect();
    for subject in &mut subjects {
        subject.readings.sort_by_key(LabReading::timestamp);
    }
    subjects.sort_by_key(|subject| subject.subject_id);
    subjects
}
