pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::assessment::profile::SkillsProfile;
use crate::assessment::types::Assessment;

pub use memory::{MemoryAssessmentStore, MemoryProfileStore};
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a conditional completion write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionWrite {
    Applied,
    AlreadyCompleted,
    Missing,
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn load_assessment(&self, id: &str) -> Result<Option<Assessment>, StoreError>;

    async fn save_assessment(&self, assessment: &Assessment) -> Result<(), StoreError>;

    /// Writes `completed` only while the stored record is still `in_progress`.
    async fn complete_if_in_progress(
        &self,
        completed: &Assessment,
    ) -> Result<CompletionWrite, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_profile(&self, learner_id: &str) -> Result<Option<SkillsProfile>, StoreError>;

    async fn save_profile(&self, profile: &SkillsProfile) -> Result<(), StoreError>;
}
