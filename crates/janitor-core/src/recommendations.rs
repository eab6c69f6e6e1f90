use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::storage::models::{Recommendation, RecommendationKind};

/// How likely the files in a bundle are still needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn for_kind(kind: RecommendationKind) -> Self {
        match kind {
            RecommendationKind::Duplicate => RiskLevel::Low,
            RecommendationKind::LargeFile => RiskLevel::Medium,
            RecommendationKind::OldFile => RiskLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// All recommendations of one kind, ready for one-click action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupBundle {
    pub kind: RecommendationKind,
    pub file_count: usize,
    pub potential_savings_bytes: i64,
    pub risk_level: RiskLevel,
    pub file_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub bundles: Vec<CleanupBundle>,
    /// Distinct files across all bundles.
    pub total_files: usize,
    pub total_savings_bytes: i64,
}

impl CleanupSummary {
    pub fn bundle(&self, kind: RecommendationKind) -> Option<&CleanupBundle> {
        self.bundles.iter().find(|b| b.kind == kind)
    }
}

/// Group recommendations by kind. Input order does not matter; bundles come
/// out in kind order and only kinds with at least one recommendation appear.
pub fn aggregate(recommendations: &[Recommendation]) -> CleanupSummary {
    let mut by_kind: BTreeMap<RecommendationKind, (BTreeSet<i64>, i64)> = BTreeMap::new();
    let mut all_files = BTreeSet::new();
    let mut total_savings = 0;

    for rec in recommendations {
        let (files, savings) = by_kind.entry(rec.kind).or_default();
        files.insert(rec.file_id);
        *savings += rec.estimated_savings_bytes;
        all_files.insert(rec.file_id);
        total_savings += rec.estimated_savings_bytes;
    }

    let bundles = by_kind
        .into_iter()
        .map(|(kind, (files, savings))| CleanupBundle {
            kind,
            file_count: files.len(),
            potential_savings_bytes: savings,
            risk_level: RiskLevel::for_kind(kind),
            file_ids: files.into_iter().collect(),
        })
        .collect();

    CleanupSummary {
        bundles,
        total_files: all_files.len(),
        total_savings_bytes: total_savings,
    }
}
