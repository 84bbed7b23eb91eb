//! Timing statistics and correctness streaks for a single assessment attempt.

use thiserror::Error;

use super::types::{GradedResponse, PerformanceMetrics};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error("cannot compute metrics over an empty response set")]
    EmptyResponses,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMetricsCalculator;

impl ResponseMetricsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, responses: &[GradedResponse]) -> Result<PerformanceMetrics, MetricsError> {
        if responses.is_empty() {
            return Err(MetricsError::EmptyResponses);
        }

        let timings: Vec<f64> = responses.iter().map(|r| r.time_spent_seconds).collect();
        let avg_response_time = mean(&timings);
        let response_time_variance = population_variance(&timings, avg_response_time);
        let (max_correct_streak, max_incorrect_streak) = max_streaks(responses);

        Ok(PerformanceMetrics {
            avg_response_time,
            response_time_variance,
            confidence_scores: responses.iter().map(|r| r.confidence).collect(),
            max_correct_streak,
            max_incorrect_streak,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of squared deviations (divides by n, not n - 1).
fn population_variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn max_streaks(responses: &[GradedResponse]) -> (u32, u32) {
    let mut streak_correct = 0_u32;
    let mut streak_incorrect = 0_u32;
    let mut max_correct = 0_u32;
    let mut max_incorrect = 0_u32;

    for response in responses {
        if response.correct {
            streak_correct += 1;
            streak_incorrect = 0;
            max_correct = max_correct.max(streak_correct);
        } else {
            streak_incorrect += 1;
            streak_correct = 0;
            max_incorrect = max_incorrect.max(streak_incorrect);
        }
    }

    (max_correct, max_incorrect)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses(pattern: &[bool]) -> Vec<GradedResponse> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, &correct)| GradedResponse::new(correct, "basic_digital", 10.0 + i as f64))
            .collect()
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = ResponseMetricsCalculator::new().compute(&[]).unwrap_err();
        assert_eq!(err, MetricsError::EmptyResponses);
    }

    #[test]
    fn test_mean_and_population_variance() {
        let input: Vec<GradedResponse> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|&t| GradedResponse::new(true, "communication", t))
            .collect();
        let metrics = ResponseMetricsCalculator::new().compute(&input).unwrap();
        assert!((metrics.avg_response_time - 5.0).abs() < 1e-12);
        // population variance is 4.0; sample variance would be 32/7
        assert!((metrics.response_time_variance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_response_has_zero_variance() {
        let metrics = ResponseMetricsCalculator::new().compute(&responses(&[false])).unwrap();
        assert_eq!(metrics.response_time_variance, 0.0);
        assert_eq!(metrics.max_correct_streak, 0);
        assert_eq!(metrics.max_incorrect_streak, 1);
    }

    #[test]
    fn test_all_correct_streak() {
        let metrics = ResponseMetricsCalculator::new().compute(&responses(&[true; 6])).unwrap();
        assert_eq!(metrics.max_correct_streak, 6);
        assert_eq!(metrics.max_incorrect_streak, 0);
    }

    #[test]
    fn test_all_incorrect_streak() {
        let metrics = ResponseMetricsCalculator::new().compute(&responses(&[false; 4])).unwrap();
        assert_eq!(metrics.max_correct_streak, 0);
        assert_eq!(metrics.max_incorrect_streak, 4);
    }

    #[test]
    fn test_alternating_streaks() {
        let pattern = [true, false, true, false, true, false, true];
        let metrics = ResponseMetricsCalculator::new().compute(&responses(&pattern)).unwrap();
        assert_eq!(metrics.max_correct_streak, 1);
        assert_eq!(metrics.max_incorrect_streak, 1);
    }

    #[test]
    fn test_streaks_track_longest_run() {
        let pattern = [true, true, false, false, false, true, true, true, true, false];
        let metrics = ResponseMetricsCalculator::new().compute(&responses(&pattern)).unwrap();
        assert_eq!(metrics.max_correct_streak, 4);
        assert_eq!(metrics.max_incorrect_streak, 3);
    }

    #[test]
    fn test_confidence_scores_preserve_order() {
        let input = vec![
            GradedResponse::new(true, "communication", 5.0).with_confidence(0.9),
            GradedResponse::new(false, "communication", 5.0).with_confidence(0.2),
        ];
        let metrics = ResponseMetricsCalculator::new().compute(&input).unwrap();
        assert_eq!(metrics.confidence_scores, vec![0.9, 0.2]);
    }
}
