use thiserror::Error;

use super::metrics::MetricsError;
use crate::db::StoreError;

/// Failures that cross the completion boundary.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("Assessment not found: {0}")]
    NotFound(String),
    #[error("Assessment already completed: {0}")]
    AlreadyCompleted(String),
    #[error("Assessment has no responses: {0}")]
    NoResponses(String),
    #[error("assessment store failed: {0}")]
    Store(#[from] StoreError),
}

impl AssessmentError {
    pub(crate) fn from_metrics(assessment_id: &str, err: MetricsError) -> Self {
        match err {
            MetricsError::EmptyResponses => Self::NoResponses(assessment_id.to_string()),
        }
    }
}

/// Why the best-effort profile update failed. Logged only.
#[derive(Debug, Error)]
pub enum ProfileUpdateFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
}
