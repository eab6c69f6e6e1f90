use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};

use super::rules::RuleSet;
use crate::error::Error;
use crate::storage::models::NewRecommendation;
use crate::storage::Database;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub files_analyzed: usize,
    pub recommendations: usize,
}

/// One analysis pass for an owner.
///
/// Claims up to `batch_size` pending files (they flip to `processing` as a
/// unit), evaluates every rule per file, then replaces the batch's
/// recommendations and marks it `completed` in a single transaction.
/// An error after the claim leaves the batch in `processing`; recover it
/// with [`Database::reset_stuck_processing`].
pub fn analyze_pending(
    db: &Database,
    owner_id: &str,
    rules: &RuleSet,
    batch_size: usize,
    now: DateTime<Utc>,
) -> Result<AnalysisSummary, Error> {
    let start = Instant::now();
    let batch = db.claim_pending_batch(owner_id, batch_size, now)?;
    if batch.is_empty() {
        debug!("No files to analyze for {}", owner_id);
        return Ok(AnalysisSummary::default());
    }

    let mut recommendations: Vec<NewRecommendation> = Vec::new();
    for file in &batch {
        let duplicates = db.count_duplicates(owner_id, &file.name, file.size_bytes, file.id)?;
        recommendations.extend(rules.evaluate(file, duplicates, now));
    }

    let file_ids: Vec<i64> = batch.iter().map(|f| f.id).collect();
    let inserted = db.complete_batch(&file_ids, &recommendations, now)?;

    info!(
        "Analysis completed for {} files, {} recommendations generated in {:.2}s",
        batch.len(),
        inserted,
        start.elapsed().as_secs_f64()
    );
    Ok(AnalysisSummary {
        files_analyzed: batch.len(),
        recommendations: inserted,
    })
}
