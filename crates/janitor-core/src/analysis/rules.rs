use chrono::{DateTime, Duration, Utc};

use crate::config::{AnalysisConfig, MAX_STALE_AFTER_DAYS};
use crate::storage::models::{FileRecord, NewRecommendation, RecommendationKind};

pub const DUPLICATE_CONFIDENCE: f64 = 0.95;
pub const LARGE_FILE_CONFIDENCE: f64 = 0.9;
pub const OLD_FILE_CONFIDENCE: f64 = 0.7;

/// Thresholds for the per-file cleanup rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub large_file_threshold_bytes: i64,
    pub stale_after: Duration,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl RuleSet {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            large_file_threshold_bytes: config.large_file_threshold_bytes,
            stale_after: Duration::days(config.stale_after_days.clamp(0, MAX_STALE_AFTER_DAYS)),
        }
    }

    /// Run every rule against one file. `duplicate_count` is the number of
    /// other files of the owner sharing its name and size.
    pub fn evaluate(
        &self,
        file: &FileRecord,
        duplicate_count: i64,
        now: DateTime<Utc>,
    ) -> Vec<NewRecommendation> {
        [
            self.duplicate(file, duplicate_count),
            self.large_file(file),
            self.stale_file(file, now),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn duplicate(&self, file: &FileRecord, duplicate_count: i64) -> Option<NewRecommendation> {
        (duplicate_count > 0).then(|| {
            recommend(
                file,
                RecommendationKind::Duplicate,
                DUPLICATE_CONFIDENCE,
                format!(
                    "Duplicate file found. Consider removing {} duplicate(s).",
                    duplicate_count
                ),
            )
        })
    }

    pub fn large_file(&self, file: &FileRecord) -> Option<NewRecommendation> {
        let size = file.size_bytes?;
        (size > self.large_file_threshold_bytes).then(|| {
            recommend(
                file,
                RecommendationKind::LargeFile,
                LARGE_FILE_CONFIDENCE,
                "Large file detected. Consider compressing or archiving.".to_string(),
            )
        })
    }

    pub fn stale_file(&self, file: &FileRecord, now: DateTime<Utc>) -> Option<NewRecommendation> {
        (now - file.modified_at > self.stale_after).then(|| {
            recommend(
                file,
                RecommendationKind::OldFile,
                OLD_FILE_CONFIDENCE,
                format!(
                    "File not modified in over {} days. Consider archiving or deleting.",
                    self.stale_after.num_days()
                ),
            )
        })
    }
}

fn recommend(
    file: &FileRecord,
    kind: RecommendationKind,
    confidence: f64,
    rationale: String,
) -> NewRecommendation {
    NewRecommendation {
        owner_id: file.owner_id.clone(),
        file_id: file.id,
        kind,
        confidence,
        estimated_savings_bytes: file.size_bytes.unwrap_or(0).max(0),
        rationale,
    }
}
