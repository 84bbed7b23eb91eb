use std::sync::Arc;
use std::time::Instant;

use crate::assessment::{AssessmentCompletionOrchestrator, CompetencyPredictor};
use crate::config::Config;
use crate::db::{
    AssessmentStore, MemoryAssessmentStore, MemoryProfileStore, ProfileStore, SqliteStore,
    StoreError,
};
use crate::services::ml_client::{CompetencyModel, MlServiceClient};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    orchestrator: Arc<AssessmentCompletionOrchestrator>,
    ml_client: Option<Arc<MlServiceClient>>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<AssessmentCompletionOrchestrator>,
        ml_client: Option<Arc<MlServiceClient>>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            orchestrator,
            ml_client,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let (assessments, profiles) = match config.database_url.as_deref() {
            Some(url) => {
                let store = Arc::new(SqliteStore::connect(url).await?);
                tracing::info!("using SQLite assessment and profile stores");
                (
                    Arc::clone(&store) as Arc<dyn AssessmentStore>,
                    store as Arc<dyn ProfileStore>,
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores");
                (
                    Arc::new(MemoryAssessmentStore::new()) as Arc<dyn AssessmentStore>,
                    Arc::new(MemoryProfileStore::new()) as Arc<dyn ProfileStore>,
                )
            }
        };

        let ml_client = Arc::new(MlServiceClient::new(config.ml.clone()));
        let model = Arc::clone(&ml_client) as Arc<dyn CompetencyModel>;
        let predictor = CompetencyPredictor::new(model, config.ml.timeout);
        let orchestrator = Arc::new(AssessmentCompletionOrchestrator::new(
            assessments,
            profiles,
            predictor,
        ));

        Ok(Self::new(orchestrator, Some(ml_client)))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn orchestrator(&self) -> &Arc<AssessmentCompletionOrchestrator> {
        &self.orchestrator
    }

    pub fn ml_client(&self) -> Option<&Arc<MlServiceClient>> {
        self.ml_client.as_ref()
    }
}
