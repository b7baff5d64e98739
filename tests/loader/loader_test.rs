#[cfg(test)]
mod tests {
    use crate::utils::{at, scratch_dir};
    use acidosis_detect::algorithm::cohort::CohortRunner;
    use acidosis_detect::config::DetectionConfig;
    use acidosis_detect::loader::parquet::{read_parquet, write_parquet};
    use acidosis_detect::loader::{AnalyteCatalog, ObservationLoader, export_episodes};
    use acidosis_detect::models::{Analyte, LabReading};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TaggedLabRow {
        subject_id: i64,
        analyte: String,
        value: Option<f64>,
        charttime: String,
    }

    #[derive(Serialize)]
    struct ItemLabRow {
        subject_id: i64,
        itemid: i64,
        valuenum: f64,
        charttime: String,
    }

    #[derive(Serialize)]
    struct LabItemRow {
        itemid: i64,
        label: String,
        category: String,
    }

    #[derive(Serialize)]
    struct AdministrationRow {
        subject_id: i64,
        medication: String,
        starttime: String,
        endtime: Option<String>,
    }

    #[derive(Serialize)]
    struct DiagnosisRow {
        subject_id: i64,
        icd_code: String,
    }

    fn time(minutes: i64) -> String {
        at(minutes).format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn tagged(subject_id: i64, analyte: &str, value: Option<f64>, minutes: i64) -> TaggedLabRow {
        TaggedLabRow {
            subject_id,
            analyte: analyte.to_string(),
            value,
            charttime: time(minutes),
        }
    }

    #[test]
    fn test_tagged_layout_round_trip() {
        let dir = scratch_dir("tagged");
        let labs = dir.join("labs.parquet");
        let administrations = dir.join("administrations.parquet");
        let diagnoses = dir.join("diagnoses.parquet");

        // Subject 2 readings are written out of order; the loader sorts them
        write_parquet(
            &labs,
            &[
                tagged(2, "lactate", Some(5.2), 90),
                tagged(2, "LACTATE", Some(5.0), 0),
                tagged(2, "LACTATE", Some(4.9), 150),
                tagged(2, "LACTATE", Some(3.0), 200),
                tagged(1, "PH", Some(7.20), 0),
                tagged(1, "PH", None, 30),
                tagged(1, "PH", Some(7.10), 60),
                tagged(1, "PH", Some(7.40), 130),
                tagged(4, "BICARB", Some(14.0), 0),
            ],
        )
        .unwrap();
        write_parquet(
            &administrations,
            &[
                AdministrationRow {
                    subject_id: 2,
                    medication: "Norepinephrine".to_string(),
                    starttime: time(30),
                    endtime: Some(time(100)),
                },
                AdministrationRow {
                    subject_id: 2,
                    medication: "Vasopressin".to_string(),
                    starttime: time(400),
                    endtime: None,
                },
            ],
        )
        .unwrap();
        write_parquet(
            &diagnoses,
            &[
                DiagnosisRow {
                    subject_id: 2,
                    icd_code: "E872".to_string(),
                },
                DiagnosisRow {
                    subject_id: 2,
                    icd_code: "J18".to_string(),
                },
            ],
        )
        .unwrap();

        let cohort = ObservationLoader::new(&labs)
            .with_administrations(&administrations)
            .with_diagnoses(&diagnoses)
            .load()
            .unwrap();

        let ids: Vec<i64> = cohort.subjects.iter().map(|s| s.subject_id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        // Null value row is dropped
        assert_eq!(cohort.subjects[0].readings.len(), 3);
        assert_eq!(cohort.subjects[1].readings[0].timestamp(), at(0));
        assert_eq!(cohort.subjects[1].administrations.len(), 2);
        assert_eq!(
            cohort.subjects[1].administrations[1].end_time,
            cohort.subjects[1].administrations[1].start_time
        );
        assert!(matches!(
            cohort.subjects[2].readings[0],
            LabReading::Unrecognized { .. }
        ));
        assert_eq!(cohort.diagnoses.label_count(), 2);

        let report = CohortRunner::new(DetectionConfig::default())
            .unwrap()
            .run(&cohort.subjects, &cohort.diagnoses);
        assert!(!report.subject(1).unwrap().is_qualifying());
        assert!(report.subject(2).unwrap().is_treated());
        assert!(report.subject(4).unwrap().is_skipped());
        assert_eq!(report.statistics.diagnosis_proportion, Some(1.0));

        let exported = dir.join("episodes.parquet");
        assert_eq!(export_episodes(&report, &exported).unwrap(), 1);
        let batches = read_parquet(&exported).unwrap();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_item_layout_with_dictionary() {
        let dir = scratch_dir("items");
        let labs = dir.join("labevents.parquet");
        let items = dir.join("d_labitems.parquet");

        let row = |subject_id, itemid, valuenum, minutes| ItemLabRow {
            subject_id,
            itemid,
            valuenum,
            charttime: time(minutes),
        };
        write_parquet(
            &labs,
            &[
                row(7, 50813, 6.0, 0),
                row(7, 50813, 6.1, 180),
                row(7, 50931, 250.0, 60),
                row(7, 50820, 7.3, 10),
            ],
        )
        .unwrap();
        write_parquet(
            &items,
            &[
                LabItemRow {
                    itemid: 50813,
                    label: "Lactate".to_string(),
                    category: "Blood Gas".to_string(),
                },
                LabItemRow {
                    itemid: 50820,
                    label: "pH".to_string(),
                    category: "Blood Gas".to_string(),
                },
                LabItemRow {
                    itemid: 50931,
                    label: "Glucose".to_string(),
                    category: "Chemistry".to_string(),
                },
            ],
        )
        .unwrap();

        let cohort = ObservationLoader::new(&labs)
            .with_lab_items(&items)
            .load()
            .unwrap();
        assert_eq!(cohort.subjects.len(), 1);
        let observations = cohort.subjects[0].observations().unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[1].analyte, Analyte::Ph);

        // Explicit catalog instead of the dictionary
        let cohort = ObservationLoader::new(&labs)
            .with_catalog(AnalyteCatalog::from_item_ids(&[50813], &[]))
            .load()
            .unwrap();
        assert_eq!(cohort.subjects[0].readings.len(), 2);

        // Item ids without any catalog cannot be resolved
        assert!(ObservationLoader::new(&labs).load().is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_directory_of_files() {
        let dir = scratch_dir("directory");
        let labs = dir.join("labs");
        std::fs::create_dir_all(&labs).unwrap();
        write_parquet(&labs.join("part-0.parquet"), &[tagged(1, "LACTATE", Some(5.0), 0)]).unwrap();
        write_parquet(&labs.join("part-1.parquet"), &[tagged(1, "LACTATE", Some(5.0), 150)]).unwrap();

        let cohort = ObservationLoader::new(&labs).load().unwrap();
        assert_eq!(cohort.subjects.len(), 1);
        assert_eq!(cohort.subjects[0].readings.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = scratch_dir("missing");
        assert!(ObservationLoader::new(dir.join("nope.parquet")).load().is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
