//! Competency prediction backed by the external ML service, with a
//! deterministic accuracy-bucket fallback whenever the service cannot answer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{
    CompetencyLevel, CompetencyPrediction, GradedResponse, LearningStyle, LevelProbabilities,
    PredictionMethod,
};
use crate::services::ml_client::{
    CompetencyModel, CompetencyReply, CompetencyRequest, MlServiceError, ResponseSignal,
};

pub const FALLBACK_CONFIDENCE: f64 = 0.6;
const PROBABILITY_TOLERANCE: f64 = 0.01;
const DEFAULT_PREDICT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lower accuracy bounds, highest level first.
const FALLBACK_THRESHOLDS: [(f64, CompetencyLevel); 3] = [
    (0.9, CompetencyLevel::Expert),
    (0.7, CompetencyLevel::Advanced),
    (0.5, CompetencyLevel::Intermediate),
];

/// Why the ML path could not produce a prediction. Never leaves the predictor.
#[derive(Debug, Error)]
pub enum PredictionUnavailable {
    #[error("no competency model configured")]
    NotConfigured,
    #[error("competency model timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Service(#[from] MlServiceError),
    #[error("competency model reported failure: {0}")]
    Rejected(String),
    #[error("competency model returned unusable data: {0}")]
    InvalidData(String),
}

#[derive(Clone)]
pub struct CompetencyPredictor {
    model: Option<Arc<dyn CompetencyModel>>,
    timeout: Duration,
}

impl CompetencyPredictor {
    pub fn new(model: Arc<dyn CompetencyModel>, timeout: Duration) -> Self {
        Self {
            model: Some(model),
            timeout,
        }
    }

    /// Predictor with no ML capability; every call takes the fallback path.
    pub fn rule_based_only() -> Self {
        Self {
            model: None,
            timeout: DEFAULT_PREDICT_TIMEOUT,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn predict(
        &self,
        learner_id: &str,
        responses: &[GradedResponse],
        timings: &[f64],
        confidences: &[f64],
    ) -> CompetencyPrediction {
        match self.try_model(learner_id, responses, timings, confidences).await {
            Ok(prediction) => prediction,
            Err(reason) => {
                warn!(
                    learner_id,
                    reason = %reason,
                    "ML competency assessment failed, using rule-based fallback"
                );
                fallback_prediction(responses)
            }
        }
    }

    async fn try_model(
        &self,
        learner_id: &str,
        responses: &[GradedResponse],
        timings: &[f64],
        confidences: &[f64],
    ) -> Result<CompetencyPrediction, PredictionUnavailable> {
        let model = self.model.as_ref().ok_or(PredictionUnavailable::NotConfigured)?;

        let request = CompetencyRequest {
            user_id: learner_id.to_string(),
            responses: responses
                .iter()
                .map(|r| ResponseSignal {
                    correct: r.correct,
                    category: r.category.clone(),
                })
                .collect(),
            timings: timings.to_vec(),
            confidence: confidences.to_vec(),
        };

        let reply = tokio::time::timeout(self.timeout, model.assess_competency(&request))
            .await
            .map_err(|_| PredictionUnavailable::Timeout(self.timeout))??;

        prediction_from_reply(reply)
    }
}

fn prediction_from_reply(reply: CompetencyReply) -> Result<CompetencyPrediction, PredictionUnavailable> {
    if !reply.success {
        let reason = reply.error.unwrap_or_else(|| "success flag was false".to_string());
        return Err(PredictionUnavailable::Rejected(reason));
    }

    let data = reply
        .data
        .ok_or_else(|| PredictionUnavailable::InvalidData("missing data".to_string()))?;

    let level = parse_wire_level(&data.competency_level).ok_or_else(|| {
        PredictionUnavailable::InvalidData(format!(
            "unknown competency_level {}",
            data.competency_level
        ))
    })?;

    if !data.confidence.is_finite() {
        return Err(PredictionUnavailable::InvalidData(
            "non-finite confidence".to_string(),
        ));
    }

    let probabilities = match data.probabilities {
        Some(p) => {
            if !p.is_normalized(PROBABILITY_TOLERANCE) {
                warn!(sum = p.sum(), "ML probabilities do not sum to 1");
            }
            p
        }
        None => {
            debug!("ML reply carried no probabilities, using peaked distribution");
            LevelProbabilities::peaked_at(level)
        }
    };

    let learning_style = data.learning_style.as_deref().and_then(|raw| {
        let style = LearningStyle::parse(raw);
        if style.is_none() {
            warn!(learning_style = raw, "ignoring unknown learning style from ML service");
        }
        style
    });

    let method = reply
        .method
        .as_deref()
        .and_then(PredictionMethod::parse)
        .unwrap_or(PredictionMethod::MlModel);

    Ok(CompetencyPrediction {
        competency_level: level,
        confidence: data.confidence.clamp(0.0, 1.0),
        probabilities,
        method,
        learning_style,
        timestamp: Utc::now(),
    })
}

fn parse_wire_level(value: &serde_json::Value) -> Option<CompetencyLevel> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(CompetencyLevel::from_ordinal),
        serde_json::Value::String(s) => CompetencyLevel::parse(s).or_else(|| {
            s.trim()
                .parse::<i64>()
                .ok()
                .and_then(CompetencyLevel::from_ordinal)
        }),
        _ => None,
    }
}

/// Overall accuracy bucketed into a competency level.
pub fn rule_based_level(accuracy: f64) -> CompetencyLevel {
    FALLBACK_THRESHOLDS
        .iter()
        .find(|(min, _)| accuracy >= *min)
        .map(|(_, level)| *level)
        .unwrap_or(CompetencyLevel::Beginner)
}

pub fn fallback_prediction(responses: &[GradedResponse]) -> CompetencyPrediction {
    let correct = responses.iter().filter(|r| r.correct).count();
    let accuracy = if responses.is_empty() {
        0.0
    } else {
        correct as f64 / responses.len() as f64
    };
    let level = rule_based_level(accuracy);

    CompetencyPrediction {
        competency_level: level,
        confidence: FALLBACK_CONFIDENCE,
        probabilities: LevelProbabilities::peaked_at(level),
        method: PredictionMethod::RuleBasedFallback,
        learning_style: None,
        timestamp: Utc::now(),
    }
}
