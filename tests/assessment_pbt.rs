//! Property-based tests for the assessment pipeline.
//!
//! - Metrics: mean lies within the timing range, variance is non-negative,
//!   streaks never exceed the number of responses
//! - Category levels stay within 0..=4 and grow with accuracy
//! - Fallback levels are monotone in accuracy
//! - History never holds more than its capacity

use proptest::prelude::*;

use chrono::Utc;
use skills_assessment_backend::assessment::history::{AssessmentHistory, HistoryEntry};
use skills_assessment_backend::assessment::predictor::{fallback_prediction, rule_based_level};
use skills_assessment_backend::assessment::profile::{category_level, MAX_CATEGORY_LEVEL};
use skills_assessment_backend::assessment::types::{CompetencyLevel, GradedResponse};
use skills_assessment_backend::assessment::ResponseMetricsCalculator;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_response() -> impl Strategy<Value = GradedResponse> {
    (
        any::<bool>(),
        prop::sample::select(vec!["basic_digital", "e_commerce", "communication"]),
        (1u32..=6000u32).prop_map(|v| v as f64 / 10.0),
        (0u32..=100u32).prop_map(|v| v as f64 / 100.0),
    )
        .prop_map(|(correct, category, time, confidence)| {
            GradedResponse::new(correct, category, time).with_confidence(confidence)
        })
}

fn arb_responses() -> impl Strategy<Value = Vec<GradedResponse>> {
    prop::collection::vec(arb_response(), 1..60)
}

fn entry(level: CompetencyLevel) -> HistoryEntry {
    HistoryEntry {
        date: Utc::now(),
        responses: Vec::new(),
        competency_level: level,
        ml_confidence: 0.6,
    }
}

proptest! {
    #[test]
    fn prop_metrics_are_bounded(responses in arb_responses()) {
        let metrics = ResponseMetricsCalculator::new().compute(&responses).unwrap();

        let min = responses.iter().map(|r| r.time_spent_seconds).fold(f64::INFINITY, f64::min);
        let max = responses.iter().map(|r| r.time_spent_seconds).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(metrics.avg_response_time >= min - 1e-9);
        prop_assert!(metrics.avg_response_time <= max + 1e-9);
        prop_assert!(metrics.response_time_variance >= 0.0);

        let n = responses.len() as u32;
        prop_assert!(metrics.max_correct_streak <= n);
        prop_assert!(metrics.max_incorrect_streak <= n);
        prop_assert!(metrics.max_correct_streak + metrics.max_incorrect_streak >= 1);
        prop_assert_eq!(metrics.confidence_scores.len(), responses.len());
    }

    #[test]
    fn prop_category_level_is_bounded_and_monotone(total in 1u32..200, a in 0u32..200, b in 0u32..200) {
        let lo = a.min(b).min(total);
        let hi = a.max(b).min(total);
        let lo_level = category_level(lo, total);
        let hi_level = category_level(hi, total);

        prop_assert!(hi_level <= MAX_CATEGORY_LEVEL);
        prop_assert!(lo_level <= hi_level);
        prop_assert_eq!(category_level(0, total), 0);
        prop_assert_eq!(category_level(total, total), MAX_CATEGORY_LEVEL);
    }

    #[test]
    fn prop_fallback_level_is_monotone(a in 0u32..=1000, b in 0u32..=1000) {
        let (lo, hi) = (a.min(b) as f64 / 1000.0, a.max(b) as f64 / 1000.0);
        prop_assert!(rule_based_level(lo) <= rule_based_level(hi));
    }

    #[test]
    fn prop_fallback_prediction_is_normalized(responses in arb_responses()) {
        let prediction = fallback_prediction(&responses);
        prop_assert!(prediction.probabilities.is_normalized(1e-9));
        prop_assert!((prediction.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn prop_history_never_exceeds_capacity(pushes in 0usize..40) {
        let mut history = AssessmentHistory::new();
        for i in 0..pushes {
            let evicted = history.push(entry(CompetencyLevel::ALL[i % 4]));
            prop_assert_eq!(evicted.is_some(), i >= AssessmentHistory::CAPACITY);
        }
        prop_assert_eq!(history.len(), pushes.min(AssessmentHistory::CAPACITY));
        if pushes > 0 {
            let last = history.latest().unwrap().competency_level;
            prop_assert_eq!(last, CompetencyLevel::ALL[(pushes - 1) % 4]);
        }
    }

    #[test]
    fn prop_history_json_keeps_newest(count in 0usize..30) {
        let entries: Vec<HistoryEntry> = (0..count)
            .map(|i| entry(CompetencyLevel::ALL[i % 4]))
            .collect();
        let json = serde_json::to_string(&entries).unwrap();
        let history: AssessmentHistory = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(history.len(), count.min(AssessmentHistory::CAPACITY));
    }
}
