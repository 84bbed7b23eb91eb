#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use skills_assessment_backend::assessment::profile::SkillsProfile;
use skills_assessment_backend::assessment::types::{Assessment, GradedResponse};
use skills_assessment_backend::assessment::{AssessmentCompletionOrchestrator, CompetencyPredictor};
use skills_assessment_backend::db::{
    MemoryAssessmentStore, MemoryProfileStore, ProfileStore, StoreError,
};
use skills_assessment_backend::routes;
use skills_assessment_backend::services::ml_client::{
    CompetencyModel, CompetencyReply, CompetencyRequest, MlServiceError,
};
use skills_assessment_backend::state::AppState;

pub const LEARNER_ID: &str = "learner-42";

/// Model that always fails, forcing the rule-based path.
pub struct UnreachableModel;

#[async_trait]
impl CompetencyModel for UnreachableModel {
    async fn assess_competency(
        &self,
        _request: &CompetencyRequest,
    ) -> Result<CompetencyReply, MlServiceError> {
        Err(MlServiceError::CircuitOpen)
    }
}

/// Profile store whose writes always fail.
pub struct ReadOnlyProfileStore {
    inner: MemoryProfileStore,
}

impl ReadOnlyProfileStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryProfileStore::new(),
        }
    }
}

#[async_trait]
impl ProfileStore for ReadOnlyProfileStore {
    async fn load_profile(&self, learner_id: &str) -> Result<Option<SkillsProfile>, StoreError> {
        Ok(Some(
            self.inner
                .load_profile(learner_id)
                .await?
                .unwrap_or_else(|| SkillsProfile::new(learner_id)),
        ))
    }

    async fn save_profile(&self, _profile: &SkillsProfile) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("profile store is read-only".into()))
    }
}

pub struct Harness {
    pub assessments: Arc<MemoryAssessmentStore>,
    pub profiles: Arc<MemoryProfileStore>,
    pub orchestrator: Arc<AssessmentCompletionOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        let model: Arc<dyn CompetencyModel> = Arc::new(UnreachableModel);
        Self::with_predictor(CompetencyPredictor::new(
            model,
            std::time::Duration::from_secs(1),
        ))
    }

    pub fn with_predictor(predictor: CompetencyPredictor) -> Self {
        let assessments = Arc::new(MemoryAssessmentStore::new());
        let profiles = Arc::new(MemoryProfileStore::new());
        let orchestrator = Arc::new(AssessmentCompletionOrchestrator::new(
            assessments.clone(),
            profiles.clone(),
            predictor,
        ));
        Self {
            assessments,
            profiles,
            orchestrator,
        }
    }

    pub fn app(&self) -> Router {
        routes::router(AppState::new(Arc::clone(&self.orchestrator), None))
    }
}

/// Five correct `basic_digital` answers, then `communication` with two of five right.
pub fn mixed_responses() -> Vec<GradedResponse> {
    let timings = [10.0, 12.0, 9.0, 11.0, 10.0, 30.0, 31.0, 29.0, 30.0, 32.0];
    let correct = [true, true, true, true, true, false, true, false, true, false];

    timings
        .iter()
        .zip(correct)
        .enumerate()
        .map(|(i, (&t, ok))| {
            let category = if i < 5 { "basic_digital" } else { "communication" };
            GradedResponse::new(ok, category, t)
        })
        .collect()
}

pub async fn seed(harness: &Harness, responses: Vec<GradedResponse>) -> Assessment {
    use skills_assessment_backend::db::AssessmentStore;

    let assessment = Assessment::start(LEARNER_ID, responses);
    harness
        .assessments
        .save_assessment(&assessment)
        .await
        .unwrap();
    harness
        .profiles
        .save_profile(&SkillsProfile::new(LEARNER_ID))
        .await
        .unwrap();
    assessment
}
