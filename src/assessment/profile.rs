use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::{AssessmentHistory, HistoryEntry};
use super::types::{
    CompetencyPrediction, GradedResponse, LearningStyle, LevelProbabilities, PredictionMethod,
};

pub const MAX_CATEGORY_LEVEL: u8 = 4;

/// Categories tracked by the learner-profile schema.
pub const SKILL_CATEGORIES: [&str; 6] = [
    "basic_digital",
    "business_automation",
    "e_commerce",
    "digital_marketing",
    "financial_management",
    "communication",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlCompetencyProfile {
    pub confidence: f64,
    pub probabilities: LevelProbabilities,
    #[serde(rename = "lastMLAssessment")]
    pub last_ml_assessment: DateTime<Utc>,
    pub ml_method: PredictionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStyleProfile {
    pub style: LearningStyle,
    pub confidence: f64,
    pub detected_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsProfile {
    pub learner_id: String,
    pub competency_levels: BTreeMap<String, u8>,
    #[serde(default)]
    pub ml_competency_profile: Option<MlCompetencyProfile>,
    #[serde(default)]
    pub learning_style: Option<LearningStyleProfile>,
    #[serde(default)]
    pub assessment_history: AssessmentHistory,
    #[serde(default)]
    pub assessment_completed: bool,
    #[serde(default)]
    pub last_assessment_date: Option<DateTime<Utc>>,
}

impl SkillsProfile {
    /// Fresh profile with every schema category at level 0.
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            competency_levels: SKILL_CATEGORIES
                .iter()
                .map(|category| (category.to_string(), 0))
                .collect(),
            ml_competency_profile: None,
            learning_style: None,
            assessment_history: AssessmentHistory::new(),
            assessment_completed: false,
            last_assessment_date: None,
        }
    }
}

/// Folds one completed assessment into a learner's skills profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillsProfileUpdater;

impl SkillsProfileUpdater {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(
        &self,
        mut profile: SkillsProfile,
        prediction: &CompetencyPrediction,
        responses: &[GradedResponse],
        now: DateTime<Utc>,
    ) -> SkillsProfile {
        profile.ml_competency_profile = Some(MlCompetencyProfile {
            confidence: prediction.confidence,
            probabilities: prediction.probabilities,
            last_ml_assessment: now,
            ml_method: prediction.method,
        });

        for (category, (correct, total)) in tally_by_category(responses) {
            // Categories outside the profile schema are not tracked.
            if let Some(level) = profile.competency_levels.get_mut(&category) {
                *level = category_level(correct, total);
            }
        }

        if let Some(style) = prediction.learning_style {
            profile.learning_style = Some(LearningStyleProfile {
                style,
                confidence: prediction.confidence,
                detected_date: now,
            });
        }

        profile.assessment_history.push(HistoryEntry {
            date: now,
            responses: responses.to_vec(),
            competency_level: prediction.competency_level,
            ml_confidence: prediction.confidence,
        });

        profile.assessment_completed = true;
        profile.last_assessment_date = Some(now);
        profile
    }
}

fn tally_by_category(responses: &[GradedResponse]) -> BTreeMap<String, (u32, u32)> {
    let mut tally: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for response in responses {
        let entry = tally.entry(response.category.clone()).or_default();
        entry.1 += 1;
        if response.correct {
            entry.0 += 1;
        }
    }
    tally
}

/// `ceil(accuracy * 4)` clamped to `0..=4`.
///
/// Only a category with zero correct answers maps to 0; any non-zero
/// accuracy yields at least 1.
pub fn category_level(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let accuracy = correct as f64 / total as f64;
    let level = (accuracy * MAX_CATEGORY_LEVEL as f64).ceil();
    level.clamp(0.0, MAX_CATEGORY_LEVEL as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::types::CompetencyLevel;
    use chrono::Duration;

    fn prediction(style: Option<LearningStyle>) -> CompetencyPrediction {
        CompetencyPrediction {
            competency_level: CompetencyLevel::Advanced,
            confidence: 0.8,
            probabilities: LevelProbabilities::peaked_at(CompetencyLevel::Advanced),
            method: PredictionMethod::MlModel,
            learning_style: style,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_category_level_formula() {
        assert_eq!(category_level(0, 5), 0);
        assert_eq!(category_level(1, 100), 1);
        assert_eq!(category_level(2, 5), 2);
        assert_eq!(category_level(1, 4), 1);
        assert_eq!(category_level(3, 4), 3);
        assert_eq!(category_level(5, 5), 4);
        assert_eq!(category_level(0, 0), 0);
    }

    #[test]
    fn test_apply_updates_tracked_categories_only() {
        let profile = SkillsProfile::new("learner-1");
        let responses = vec![
            GradedResponse::new(true, "e_commerce", 10.0),
            GradedResponse::new(false, "e_commerce", 10.0),
            GradedResponse::new(true, "astrophysics", 10.0),
        ];
        let updated = SkillsProfileUpdater::new().apply(profile, &prediction(None), &responses, Utc::now());

        assert_eq!(updated.competency_levels["e_commerce"], 2);
        assert!(!updated.competency_levels.contains_key("astrophysics"));
        assert_eq!(updated.competency_levels["communication"], 0);
        assert_eq!(updated.competency_levels.len(), SKILL_CATEGORIES.len());
    }

    #[test]
    fn test_absent_categories_keep_previous_level() {
        let mut profile = SkillsProfile::new("learner-1");
        profile.competency_levels.insert("digital_marketing".into(), 3);
        let responses = vec![GradedResponse::new(false, "communication", 10.0)];
        let updated = SkillsProfileUpdater::new().apply(profile, &prediction(None), &responses, Utc::now());
        assert_eq!(updated.competency_levels["digital_marketing"], 3);
        assert_eq!(updated.competency_levels["communication"], 0);
    }

    #[test]
    fn test_learning_style_overwritten_only_when_present() {
        let now = Utc::now();
        let updater = SkillsProfileUpdater::new();
        let responses = vec![GradedResponse::new(true, "communication", 10.0)];

        let profile = updater.apply(
            SkillsProfile::new("learner-1"),
            &prediction(Some(LearningStyle::Kinesthetic)),
            &responses,
            now,
        );
        let style = profile.learning_style.clone().unwrap();
        assert_eq!(style.style, LearningStyle::Kinesthetic);
        assert_eq!(style.confidence, 0.8);

        let later = now + Duration::minutes(5);
        let profile = updater.apply(profile, &prediction(None), &responses, later);
        let style = profile.learning_style.unwrap();
        assert_eq!(style.style, LearningStyle::Kinesthetic);
        assert_eq!(style.detected_date, now);
    }

    #[test]
    fn test_ml_snapshot_and_flags() {
        let now = Utc::now();
        let responses = vec![GradedResponse::new(true, "communication", 10.0)];
        let profile = SkillsProfileUpdater::new().apply(
            SkillsProfile::new("learner-1"),
            &prediction(None),
            &responses,
            now,
        );
        let snapshot = profile.ml_competency_profile.unwrap();
        assert_eq!(snapshot.ml_method, PredictionMethod::MlModel);
        assert_eq!(snapshot.last_ml_assessment, now);
        assert!(profile.assessment_completed);
        assert_eq!(profile.last_assessment_date, Some(now));
        assert_eq!(profile.assessment_history.len(), 1);
        assert_eq!(
            profile.assessment_history.latest().unwrap().competency_level,
            CompetencyLevel::Advanced
        );
    }

    #[test]
    fn test_history_stays_bounded() {
        let updater = SkillsProfileUpdater::new();
        let responses = vec![GradedResponse::new(true, "communication", 10.0)];
        let mut profile = SkillsProfile::new("learner-1");
        for _ in 0..25 {
            profile = updater.apply(profile, &prediction(None), &responses, Utc::now());
            assert!(profile.assessment_history.len() <= AssessmentHistory::CAPACITY);
        }
        assert_eq!(profile.assessment_history.len(), AssessmentHistory::CAPACITY);
    }

    #[test]
    fn test_profile_serializes_with_schema_names() {
        let profile = SkillsProfileUpdater::new().apply(
            SkillsProfile::new("learner-1"),
            &prediction(None),
            &[GradedResponse::new(true, "communication", 10.0)],
            Utc::now(),
        );
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value["mlCompetencyProfile"]["lastMLAssessment"].is_string());
        assert_eq!(value["mlCompetencyProfile"]["mlMethod"], "ml-model");
        assert_eq!(value["assessmentHistory"].as_array().unwrap().len(), 1);
    }
}
