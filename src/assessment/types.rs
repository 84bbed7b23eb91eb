use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIME_SPENT_SECONDS: f64 = 30.0;
pub const DEFAULT_RESPONSE_CONFIDENCE: f64 = 0.7;

fn default_time_spent() -> f64 {
    DEFAULT_TIME_SPENT_SECONDS
}

fn default_confidence() -> f64 {
    DEFAULT_RESPONSE_CONFIDENCE
}

/// One graded answer inside an assessment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedResponse {
    pub correct: bool,
    pub category: String,
    #[serde(default = "default_time_spent")]
    pub time_spent_seconds: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl GradedResponse {
    pub fn new(correct: bool, category: impl Into<String>, time_spent_seconds: f64) -> Self {
        Self {
            correct,
            category: category.into(),
            time_spent_seconds,
            confidence: DEFAULT_RESPONSE_CONFIDENCE,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub avg_response_time: f64,
    pub response_time_variance: f64,
    pub confidence_scores: Vec<f64>,
    pub max_correct_streak: u32,
    pub max_incorrect_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl CompetencyLevel {
    pub const ALL: [CompetencyLevel; 4] = [
        CompetencyLevel::Beginner,
        CompetencyLevel::Intermediate,
        CompetencyLevel::Advanced,
        CompetencyLevel::Expert,
    ];

    /// Ordinal used on the ML wire format (beginner = 1 .. expert = 4).
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Beginner => 1,
            Self::Intermediate => 2,
            Self::Advanced => 3,
            Self::Expert => 4,
        }
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Beginner),
            2 => Some(Self::Intermediate),
            3 => Some(Self::Advanced),
            4 => Some(Self::Expert),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionMethod {
    #[serde(rename = "ml-model")]
    MlModel,
    #[serde(rename = "rule-based-fallback")]
    RuleBasedFallback,
}

impl PredictionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MlModel => "ml-model",
            Self::RuleBasedFallback => "rule-based-fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ml-model" => Some(Self::MlModel),
            "rule-based-fallback" => Some(Self::RuleBasedFallback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
    Balanced,
}

impl LearningStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "visual" => Some(Self::Visual),
            "auditory" => Some(Self::Auditory),
            "kinesthetic" => Some(Self::Kinesthetic),
            "reading" => Some(Self::Reading),
            "balanced" => Some(Self::Balanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelProbabilities {
    pub beginner: f64,
    pub intermediate: f64,
    pub advanced: f64,
    pub expert: f64,
}

impl LevelProbabilities {
    const PEAK: f64 = 0.7;
    const REST: f64 = 0.1;

    /// Distribution concentrated on `level`, remaining mass spread evenly.
    pub fn peaked_at(level: CompetencyLevel) -> Self {
        let pick = |candidate: CompetencyLevel| {
            if candidate == level {
                Self::PEAK
            } else {
                Self::REST
            }
        };
        Self {
            beginner: pick(CompetencyLevel::Beginner),
            intermediate: pick(CompetencyLevel::Intermediate),
            advanced: pick(CompetencyLevel::Advanced),
            expert: pick(CompetencyLevel::Expert),
        }
    }

    pub fn sum(&self) -> f64 {
        self.beginner + self.intermediate + self.advanced + self.expert
    }

    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.sum() - 1.0).abs() <= tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyPrediction {
    pub competency_level: CompetencyLevel,
    pub confidence: f64,
    pub probabilities: LevelProbabilities,
    pub method: PredictionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<LearningStyle>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    InProgress,
    Completed,
}

impl AssessmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Score summary attached to a completed assessment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResults {
    pub total_questions: u32,
    pub correct_answers: u32,
    pub score: u32,
    pub accuracy: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub category_scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competency_level: Option<CompetencyLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weaknesses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl AssessmentResults {
    /// Summary derived from the raw responses when the caller supplies none.
    pub fn from_responses(responses: &[GradedResponse]) -> Self {
        let total = responses.len() as u32;
        let correct = responses.iter().filter(|r| r.correct).count() as u32;
        let accuracy = if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64 * 100.0
        };

        let mut per_category: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        for response in responses {
            let entry = per_category.entry(response.category.clone()).or_default();
            entry.1 += 1;
            if response.correct {
                entry.0 += 1;
            }
        }
        let category_scores = per_category
            .into_iter()
            .map(|(category, (ok, seen))| (category, (ok as f64 / seen as f64 * 100.0).round()))
            .collect();

        Self {
            total_questions: total,
            correct_answers: correct,
            score: accuracy.round() as u32,
            accuracy: (accuracy * 100.0).round() / 100.0,
            category_scores,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub user_id: String,
    pub status: AssessmentStatus,
    pub responses: Vec<GradedResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<PerformanceMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_prediction: Option<CompetencyPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<AssessmentResults>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
}

impl Assessment {
    pub fn start(user_id: impl Into<String>, responses: Vec<GradedResponse>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            status: AssessmentStatus::InProgress,
            responses,
            performance_metrics: None,
            ml_prediction: None,
            results: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_minutes: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AssessmentStatus::Completed
    }
}

/// Caller-supplied fields merged into the assessment on completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultOverrides {
    /// Per-response self-reported confidence, replacing the recorded values.
    #[serde(default)]
    pub confidence: Option<Vec<f64>>,
    #[serde(default)]
    pub results: Option<AssessmentResults>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}
