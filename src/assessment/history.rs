use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{CompetencyLevel, GradedResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub responses: Vec<GradedResponse>,
    pub competency_level: CompetencyLevel,
    pub ml_confidence: f64,
}

/// Most recent assessments of a learner, oldest first.
///
/// Capacity is fixed; pushing into a full history evicts the oldest entry.
/// The bound also holds for deserialized data, which keeps only the newest
/// `CAPACITY` entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<HistoryEntry>", into = "Vec<HistoryEntry>")]
pub struct AssessmentHistory {
    entries: VecDeque<HistoryEntry>,
}

impl AssessmentHistory {
    pub const CAPACITY: usize = 10;

    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(Self::CAPACITY),
        }
    }

    /// Appends `entry`, returning the evicted entry when the history was full.
    pub fn push(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let evicted = if self.entries.len() == Self::CAPACITY {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

impl From<Vec<HistoryEntry>> for AssessmentHistory {
    fn from(mut entries: Vec<HistoryEntry>) -> Self {
        if entries.len() > Self::CAPACITY {
            entries.drain(..entries.len() - Self::CAPACITY);
        }
        Self {
            entries: VecDeque::from(entries),
        }
    }
}

impl From<AssessmentHistory> for Vec<HistoryEntry> {
    fn from(history: AssessmentHistory) -> Self {
        history.entries.into()
    }
}
