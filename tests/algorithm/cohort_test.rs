#[cfg(test)]
mod tests {
    use crate::utils::{administration, at, lactate, ph};
    use acidosis_detect::algorithm::cohort::{CohortRunner, SubjectStatus};
    use acidosis_detect::config::{DetectionConfig, OrderingPolicy};
    use acidosis_detect::models::{
        Analyte, DiagnosisIndex, DiagnosisLabel, LabReading, SubjectData,
    };

    /// S1: short pH episode; S2: treated lactate episode with a diagnosis
    fn scenario() -> (Vec<SubjectData>, DiagnosisIndex) {
        let s1 = SubjectData::new(1).with_observations([ph(1, 7.20, 0), ph(1, 7.10, 60), ph(1, 7.40, 130)]);
        let s2 = SubjectData::new(2)
            .with_observations([
                lactate(2, 5.0, 0),
                lactate(2, 5.2, 90),
                lactate(2, 4.9, 150),
                lactate(2, 3.0, 200),
            ])
            .with_administration(administration(2, "norepinephrine", 30, 100));
        let s3 = SubjectData::new(3).with_observations([lactate(3, 6.0, 0), lactate(3, 6.5, 240)]);

        let diagnoses = DiagnosisIndex::from_labels([
            DiagnosisLabel::new(2, "E872"),
            DiagnosisLabel::new(2, "J18"),
            DiagnosisLabel::new(3, "J18"),
        ]);
        (vec![s1, s2, s3], diagnoses)
    }

    fn runner(config: DetectionConfig) -> CohortRunner {
        CohortRunner::new(config.with_parallel(false)).unwrap()
    }

    #[test]
    fn test_scenario_outcomes() {
        let (subjects, diagnoses) = scenario();
        let report = runner(DetectionConfig::default()).run(&subjects, &diagnoses);

        let s1 = report.subject(1).unwrap();
        assert_eq!(s1.status, SubjectStatus::NoQualifyingEpisodes);

        let s2 = report.subject(2).unwrap();
        assert_eq!(s2.episodes().len(), 1);
        let episode = &s2.episodes()[0];
        assert_eq!(episode.episode.analyte, Analyte::Lactate);
        assert_eq!(episode.episode.start_time, at(0));
        assert_eq!(episode.episode.end_time, at(150));
        assert!(episode.treated_during_episode);
        assert!(matches!(
            s2.status,
            SubjectStatus::Qualifying { has_diagnosis: Some(true), .. }
        ));

        let s3 = report.subject(3).unwrap();
        assert!(!s3.is_treated());
        assert!(matches!(
            s3.status,
            SubjectStatus::Qualifying { has_diagnosis: Some(false), .. }
        ));

        let stats = &report.statistics;
        assert_eq!(stats.subjects_analysed, 3);
        assert_eq!(stats.subjects_with_episodes, 2);
        assert_eq!(stats.subjects_without_episodes, 1);
        assert_eq!(stats.subjects_treated, 1);
        assert_eq!(stats.subjects_with_diagnosis, 1);
        assert_eq!(stats.diagnosis_proportion, Some(0.5));
        assert_eq!(stats.episodes_by_analyte.get(&Analyte::Lactate), Some(&2));
    }

    #[test]
    fn test_skipped_is_distinct_from_zero_episodes() {
        let unsorted = SubjectData::new(10).with_observations([lactate(10, 5.0, 100), lactate(10, 5.0, 0)]);
        let unknown = SubjectData {
            subject_id: 11,
            readings: vec![LabReading::Unrecognized {
                tag: "BICARB".to_string(),
                value: 12.0,
                timestamp: at(0),
            }],
            administrations: Vec::new(),
        };
        let normal = SubjectData::new(12).with_observations([lactate(12, 1.0, 0), lactate(12, 1.1, 300)]);

        let report = runner(DetectionConfig::default())
            .run(&[unsorted, unknown, normal], &DiagnosisIndex::new());

        assert!(report.subject(10).unwrap().is_skipped());
        assert!(report.subject(11).unwrap().is_skipped());
        assert_eq!(
            report.subject(12).unwrap().status,
            SubjectStatus::NoQualifyingEpisodes
        );

        let skipped: Vec<(i64, &str)> = report.skipped().collect();
        assert_eq!(skipped.len(), 2);
        assert!(skipped[1].1.contains("BICARB"));

        assert_eq!(report.statistics.subjects_skipped, 2);
        assert_eq!(report.statistics.subjects_without_episodes, 1);
        assert_eq!(report.statistics.diagnosis_proportion, None);
        assert!(report.summary().contains("undefined (0 subjects)"));
    }

    #[test]
    fn test_sort_policy_recovers_unsorted_subject() {
        let unsorted = SubjectData::new(10).with_observations([lactate(10, 5.0, 200), lactate(10, 5.0, 0)]);
        let config = DetectionConfig::default().with_ordering(OrderingPolicy::Sort);
        let report = runner(config).run(&[unsorted], &DiagnosisIndex::new());
        assert!(report.subject(10).unwrap().is_qualifying());
    }

    #[test]
    fn test_malformed_administration_does_not_skip_subject() {
        let subject = SubjectData::new(5)
            .with_observations([lactate(5, 5.0, 0), lactate(5, 5.0, 180)])
            .with_administration(administration(5, "dopamine", 100, 10))
            .with_administration(administration(5, "vasopressin", 0, 10));

        let report = runner(DetectionConfig::default()).run(&[subject], &DiagnosisIndex::new());
        let outcome = report.subject(5).unwrap();
        assert!(outcome.is_qualifying());
        assert!(outcome.is_treated());
        assert_eq!(outcome.rejected_administrations, 1);
        assert_eq!(outcome.episodes()[0].treating_drugs, vec!["vasopressin".to_string()]);
        assert_eq!(report.statistics.rejected_administrations, 1);
    }

    #[test]
    fn test_require_therapy_restricts_cross_reference() {
        let (subjects, diagnoses) = scenario();
        let config = DetectionConfig::default().with_require_therapy(true);
        let report = runner(config).run(&subjects, &diagnoses);

        assert_eq!(report.cross_reference.subjects_with_episodes(), 1);
        assert_eq!(report.statistics.diagnosis_proportion, Some(1.0));
        assert!(matches!(
            report.subject(3).unwrap().status,
            SubjectStatus::Qualifying { has_diagnosis: None, .. }
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (subjects, diagnoses) = scenario();
        let sequential = runner(DetectionConfig::default()).run(&subjects, &diagnoses);
        let parallel = CohortRunner::new(DetectionConfig::default().with_parallel(true))
            .unwrap()
            .run(&subjects, &diagnoses);
        assert_eq!(sequential.subjects, parallel.subjects);
        assert_eq!(sequential.statistics, parallel.statistics);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DetectionConfig::default().with_lactate_threshold(f64::NAN);
        assert!(CohortRunner::new(config).is_err());

        let config = DetectionConfig::default().with_min_duration_minutes(i64::MAX);
        assert!(CohortRunner::new(config).is_err());
    }

    #[test]
    fn test_duplicate_subject_entries_are_merged() {
        let first = SubjectData::new(8).with_observations([lactate(8, 5.0, 0)]);
        let second = SubjectData::new(8)
            .with_observations([lactate(8, 5.0, 180)])
            .with_administration(administration(8, "dopamine", 10, 20));
        let diagnoses = DiagnosisIndex::from_labels([DiagnosisLabel::new(8, "E872")]);

        let report = runner(DetectionConfig::default()).run(&[second, first], &diagnoses);

        assert_eq!(report.subjects.len(), 1);
        let outcome = report.subject(8).unwrap();
        assert_eq!(outcome.episodes().len(), 1);
        assert_eq!(outcome.episodes()[0].episode.start_time, at(0));
        assert!(outcome.is_treated());

        let stats = &report.statistics;
        assert_eq!(stats.subjects_analysed, 1);
        assert_eq!(stats.subjects_with_episodes, 1);
        assert_eq!(
            stats.subjects_with_episodes,
            report.cross_reference.subjects_with_episodes()
        );
        assert_eq!(stats.diagnosis_proportion, Some(1.0));
    }

    #[test]
    fn test_foreign_readings_do_not_form_episodes() {
        let subject = SubjectData::new(1).with_observations([lactate(1, 5.0, 0), lactate(2, 5.0, 200)]);
        let report = runner(DetectionConfig::default()).run(&[subject], &DiagnosisIndex::new());
        assert_eq!(
            report.subject(1).unwrap().status,
            SubjectStatus::NoQualifyingEpisodes
        );
    }

    #[test]
    fn test_summary_text() {
        let (subjects, diagnoses) = scenario();
        let summary = runner(DetectionConfig::default())
            .run(&subjects, &diagnoses)
            .summary();
        assert!(summary.contains("Number of subjects identified: 2"));
        assert!(summary.contains("Number with lactic acidosis diagnosis: 1"));
        assert!(summary.contains("Percentage with diagnosis: 50.00%"));
    }

    #[test]
    fn test_report_serializes_status_tag() {
        let (subjects, diagnoses) = scenario();
        let report = runner(DetectionConfig::default()).run(&subjects, &diagnoses);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["subjects"][0]["status"], "no_qualifying_episodes");
        assert_eq!(json["subjects"][1]["status"], "qualifying");
        assert_eq!(json["subjects"][1]["episodes"][0]["analyte"], "LACTATE");
    }
}
