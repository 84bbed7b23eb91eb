use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AssessmentStore, CompletionWrite, ProfileStore, StoreError};
use crate::assessment::profile::SkillsProfile;
use crate::assessment::types::{Assessment, AssessmentStatus};

#[derive(Debug, Default)]
pub struct MemoryAssessmentStore {
    records: RwLock<HashMap<String, Assessment>>,
}

impl MemoryAssessmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl AssessmentStore for MemoryAssessmentStore {
    async fn load_assessment(&self, id: &str) -> Result<Option<Assessment>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn save_assessment(&self, assessment: &Assessment) -> Result<(), StoreError> {
        self.records
            .write()
            .insert(assessment.id.clone(), assessment.clone());
        Ok(())
    }

    async fn complete_if_in_progress(
        &self,
        completed: &Assessment,
    ) -> Result<CompletionWrite, StoreError> {
        let mut records = self.records.write();
        let Some(current) = records.get_mut(&completed.id) else {
            return Ok(CompletionWrite::Missing);
        };
        if current.status != AssessmentStatus::InProgress {
            return Ok(CompletionWrite::AlreadyCompleted);
        }
        *current = completed.clone();
        Ok(CompletionWrite::Applied)
    }
}

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, SkillsProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn load_profile(&self, learner_id: &str) -> Result<Option<SkillsProfile>, StoreError> {
        Ok(self.profiles.read().get(learner_id).cloned())
    }

    async fn save_profile(&self, profile: &SkillsProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .insert(profile.learner_id.clone(), profile.clone());
        Ok(())
    }
}
