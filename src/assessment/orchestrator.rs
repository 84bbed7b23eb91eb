use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::error::{AssessmentError, ProfileUpdateFailure};
use super::metrics::ResponseMetricsCalculator;
use super::predictor::CompetencyPredictor;
use super::profile::{SkillsProfile, SkillsProfileUpdater};
use super::types::{
    Assessment, AssessmentResults, AssessmentStatus, CompetencyPrediction, GradedResponse,
    ResultOverrides,
};
use crate::db::{AssessmentStore, CompletionWrite, ProfileStore};

/// Runs the `in_progress -> completed` transition of one assessment and
/// folds the outcome into the learner's skills profile.
pub struct AssessmentCompletionOrchestrator {
    assessments: Arc<dyn AssessmentStore>,
    profiles: Arc<dyn ProfileStore>,
    metrics: ResponseMetricsCalculator,
    predictor: CompetencyPredictor,
    updater: SkillsProfileUpdater,
}

impl AssessmentCompletionOrchestrator {
    pub fn new(
        assessments: Arc<dyn AssessmentStore>,
        profiles: Arc<dyn ProfileStore>,
        predictor: CompetencyPredictor,
    ) -> Self {
        Self {
            assessments,
            profiles,
            metrics: ResponseMetricsCalculator::new(),
            predictor,
            updater: SkillsProfileUpdater::new(),
        }
    }

    pub fn assessments(&self) -> &Arc<dyn AssessmentStore> {
        &self.assessments
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub async fn complete(
        &self,
        assessment_id: &str,
        overrides: ResultOverrides,
    ) -> Result<Assessment, AssessmentError> {
        let assessment = self
            .assessments
            .load_assessment(assessment_id)
            .await?
            .ok_or_else(|| AssessmentError::NotFound(assessment_id.to_string()))?;

        if assessment.is_completed() {
            return Err(AssessmentError::AlreadyCompleted(assessment_id.to_string()));
        }

        let responses = apply_confidence_override(
            assessment_id,
            &assessment.responses,
            overrides.confidence.as_deref(),
        );
        let metrics = self
            .metrics
            .compute(&responses)
            .map_err(|e| AssessmentError::from_metrics(assessment_id, e))?;

        let timings: Vec<f64> = responses.iter().map(|r| r.time_spent_seconds).collect();
        let prediction = self
            .predictor
            .predict(&assessment.user_id, &responses, &timings, &metrics.confidence_scores)
            .await;

        let now = Utc::now();
        let results = overrides.results.unwrap_or_else(|| AssessmentResults {
            competency_level: Some(prediction.competency_level),
            ..AssessmentResults::from_responses(&responses)
        });
        let duration_minutes = overrides.duration_minutes.or_else(|| {
            let elapsed = (now - assessment.started_at).num_seconds().max(0) as f64 / 60.0;
            Some((elapsed * 10.0).round() / 10.0)
        });

        let completed = Assessment {
            status: AssessmentStatus::Completed,
            performance_metrics: Some(metrics),
            ml_prediction: Some(prediction.clone()),
            results: Some(results),
            completed_at: Some(now),
            duration_minutes,
            ..assessment
        };

        match self.assessments.complete_if_in_progress(&completed).await? {
            CompletionWrite::Applied => {}
            CompletionWrite::AlreadyCompleted => {
                return Err(AssessmentError::AlreadyCompleted(assessment_id.to_string()));
            }
            CompletionWrite::Missing => {
                return Err(AssessmentError::NotFound(assessment_id.to_string()));
            }
        }

        info!(
            assessment_id,
            learner_id = %completed.user_id,
            level = prediction.competency_level.as_str(),
            method = prediction.method.as_str(),
            "assessment completed"
        );

        if let Err(failure) = self
            .update_profile(&completed.user_id, &prediction, &responses, now)
            .await
        {
            warn!(
                assessment_id,
                learner_id = %completed.user_id,
                reason = %failure,
                "skills profile update failed; assessment completion stands"
            );
        }

        Ok(completed)
    }

    async fn update_profile(
        &self,
        learner_id: &str,
        prediction: &CompetencyPrediction,
        responses: &[GradedResponse],
        now: DateTime<Utc>,
    ) -> Result<(), ProfileUpdateFailure> {
        let profile = match self.profiles.load_profile(learner_id).await? {
            Some(profile) => profile,
            None => {
                info!(learner_id, "seeding skills profile for first assessment");
                SkillsProfile::new(learner_id)
            }
        };

        let updated = self.updater.apply(profile, prediction, responses, now);
        self.profiles.save_profile(&updated).await?;

        info!(learner_id, "updated skills profile with assessment results");
        Ok(())
    }
}

fn apply_confidence_override(
    assessment_id: &str,
    responses: &[GradedResponse],
    confidence: Option<&[f64]>,
) -> Vec<GradedResponse> {
    let Some(confidence) = confidence else {
        return responses.to_vec();
    };
    if confidence.len() != responses.len() {
        warn!(
            assessment_id,
            expected = responses.len(),
            got = confidence.len(),
            "confidence override length mismatch, unmatched responses keep recorded values"
        );
    }

    responses
        .iter()
        .enumerate()
        .map(|(i, response)| match confidence.get(i) {
            Some(&value) if value.is_finite() => response.clone().with_confidence(value),
            _ => response.clone(),
        })
        .collect()
}
