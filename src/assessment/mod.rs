//! Adaptive competency assessment pipeline.
//!
//! Completing an assessment computes response metrics, asks the ML service
//! for a competency prediction (falling back to accuracy buckets), persists
//! the completed assessment and then folds the result into the learner's
//! skills profile.

pub mod error;
pub mod history;
pub mod metrics;
pub mod orchestrator;
pub mod predictor;
pub mod profile;
pub mod types;

pub use error::AssessmentError;
pub use metrics::ResponseMetricsCalculator;
pub use orchestrator::AssessmentCompletionOrchestrator;
pub use predictor::CompetencyPredictor;
pub use profile::{SkillsProfile, SkillsProfileUpdater};
