#[cfg(test)]
mod tests {
    use acidosis_detect::algorithm::acidosis::DiagnosisMatcher;
    use acidosis_detect::config::{CodeMatch, DetectionConfig};
    use acidosis_detect::models::{DiagnosisIndex, DiagnosisLabel};

    fn index() -> DiagnosisIndex {
        DiagnosisIndex::from_labels([
            DiagnosisLabel::new(2, "E872"),
            DiagnosisLabel::new(2, "J18"),
            DiagnosisLabel::new(3, "J18"),
            DiagnosisLabel::new(4, "e87.20"),
            DiagnosisLabel::new(5, "2762"),
        ])
    }

    #[test]
    fn test_subject_with_code_has_diagnosis() {
        let matcher = DiagnosisMatcher::from_config(&DetectionConfig::default());
        let result = matcher.cross_reference([2, 3], &index());

        assert_eq!(result.has_diagnosis(2), Some(true));
        assert_eq!(result.has_diagnosis(3), Some(false));
        assert_eq!(result.has_diagnosis(4), None);
        assert_eq!(result.subjects_with_episodes(), 2);
        assert_eq!(result.subjects_with_diagnosis(), 1);
        assert_eq!(result.proportion(), Some(0.5));
    }

    #[test]
    fn test_prefix_and_exact_matching() {
        let prefix = DiagnosisMatcher::new(["E872"], CodeMatch::Prefix);
        let exact = DiagnosisMatcher::new(["E872"], CodeMatch::Exact);

        // "e87.20" normalizes to "E8720"
        assert_eq!(prefix.cross_reference([4], &index()).has_diagnosis(4), Some(true));
        assert_eq!(exact.cross_reference([4], &index()).has_diagnosis(4), Some(false));
        assert_eq!(exact.cross_reference([2], &index()).has_diagnosis(2), Some(true));
    }

    #[test]
    fn test_multiple_code_systems() {
        let matcher = DiagnosisMatcher::new(["E872", "2762"], CodeMatch::Exact);
        let result = matcher.cross_reference([2, 3, 5], &index());
        assert_eq!(result.subjects_with_diagnosis(), 2);
    }

    #[test]
    fn test_subject_without_codes() {
        let matcher = DiagnosisMatcher::from_config(&DetectionConfig::default());
        let result = matcher.cross_reference([99], &index());
        assert_eq!(result.has_diagnosis(99), Some(false));
        assert_eq!(result.proportion(), Some(0.0));
    }

    #[test]
    fn test_empty_cohort_proportion_is_undefined() {
        let matcher = DiagnosisMatcher::from_config(&DetectionConfig::default());
        let result = matcher.cross_reference(std::iter::empty(), &index());
        assert_eq!(result.subjects_with_episodes(), 0);
        assert_eq!(result.proportion(), None);
    }

    #[test]
    fn test_duplicates_are_collapsed_and_sorted() {
        let matcher = DiagnosisMatcher::from_config(&DetectionConfig::default());
        let result = matcher.cross_reference([3, 2, 3, 2], &index());
        let ids: Vec<i64> = result.subjects.iter().map(|s| s.subject_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_proportion_is_bounded() {
        let matcher = DiagnosisMatcher::from_config(&DetectionConfig::default());
        for subjects in [vec![2], vec![3], vec![2, 3, 4, 5], vec![2, 4]] {
            let proportion = matcher
                .cross_reference(subjects.clone(), &index())
                .proportion()
                .unwrap();
            assert!((0.0..=1.0).contains(&proportion), "{subjects:?}: {proportion}");
        }
    }
}
