use std::path::PathBuf;

use acidosis_detect::models::{AdministrationRecord, Analyte, Observation};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Reference time all fixtures are offset from
#[must_use]
pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 3, 14)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

/// `t0` plus a number of minutes
#[must_use]
pub fn at(minutes: i64) -> NaiveDateTime {
    t0() + TimeDelta::minutes(minutes)
}

#[must_use]
pub fn lactate(subject_id: i64, value: f64, minutes: i64) -> Observation {
    Observation::new(subject_id, Analyte::Lactate, value, at(minutes))
}

#[must_use]
pub fn ph(subject_id: i64, value: f64, minutes: i64) -> Observation {
    Observation::new(subject_id, Analyte::Ph, value, at(minutes))
}

#[must_use]
pub fn administration(
    subject_id: i64,
    drug: &str,
    start_minutes: i64,
    end_minutes: i64,
) -> AdministrationRecord {
    AdministrationRecord::new(subject_id, drug, at(start_minutes), at(end_minutes))
}

/// Fresh scratch directory for a test
#[must_use]
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "acidosis-detect-{name}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
