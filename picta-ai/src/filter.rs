//! Confidence filter for recognition candidates
//!
//! Pure and deterministic: keeps candidates at or above the threshold in the order
//! the model ranked them.

use crate::types::{FilteredLabels, RecognitionCandidate};

/// Minimum confidence for a label to be recorded
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.95;

/// Keep candidates with `confidence >= threshold`, preserving order
///
/// Candidates with an empty label or a NaN confidence never pass.
pub fn filter_candidates(
    candidates: &[RecognitionCandidate],
    threshold: f32,
) -> Vec<RecognitionCandidate> {
    candidates
        .iter()
        .filter(|c| !c.label.is_empty() && c.confidence >= threshold)
        .cloned()
        .collect()
}

/// Labels of the candidates that pass [`filter_candidates`]
pub fn filter_labels(candidates: &[RecognitionCandidate], threshold: f32) -> FilteredLabels {
    filter_candidates(candidates, threshold)
        .into_iter()
        .map(|c| c.label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked() -> Vec<RecognitionCandidate> {
        vec![
            RecognitionCandidate::new("cat", 0.97),
            RecognitionCandidate::new("dog", 0.80),
            RecognitionCandidate::new("tree", 0.95),
        ]
    }

    #[test]
    fn test_threshold_inclusive_and_order_preserved() {
        assert_eq!(
            filter_labels(&ranked(), DEFAULT_CONFIDENCE_THRESHOLD),
            vec!["cat".to_string(), "tree".to_string()]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_labels(&[], DEFAULT_CONFIDENCE_THRESHOLD).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let once = filter_candidates(&ranked(), 0.95);
        let twice = filter_candidates(&once, 0.95);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_monotonic_in_threshold() {
        let candidates: Vec<RecognitionCandidate> = (0..=20)
            .map(|i| RecognitionCandidate::new(format!("label{}", i), i as f32 / 20.0))
            .collect();

        let mut previous = usize::MAX;
        for step in 0..=20 {
            let threshold = step as f32 / 20.0;
            let kept = filter_candidates(&candidates, threshold).len();
            assert!(kept <= previous, "raising threshold to {} grew output", threshold);
            previous = kept;
        }
    }

    #[test]
    fn test_ranking_not_resorted() {
        let candidates = vec![
            RecognitionCandidate::new("b", 0.96),
            RecognitionCandidate::new("a", 0.99),
        ];
        assert_eq!(filter_labels(&candidates, 0.95), vec!["b", "a"]);
    }

    #[test]
    fn test_nan_and_empty_labels_dropped() {
        let candidates = vec![
            RecognitionCandidate::new("", 0.99),
            RecognitionCandidate::new("ghost", f32::NAN),
            RecognitionCandidate::new("sky", 1.0),
        ];
        assert_eq!(filter_labels(&candidates, 0.95), vec!["sky"]);
    }
}
