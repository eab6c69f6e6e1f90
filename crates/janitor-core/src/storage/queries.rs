use super::models::*;
use super::sqlite::Database;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Result, Row};
use std::collections::HashSet;
use tracing::debug;

const FILE_COLUMNS: &str = "id, owner_id, remote_id, name, mime_type, size_bytes, modified_at, \
     created_at, parent_folders, is_shared, analysis_status, status_changed_at, synced_at";

const RECOMMENDATION_COLUMNS: &str =
    "id, owner_id, file_id, kind, confidence, estimated_savings_bytes, rationale, created_at";

fn file_from_row(row: &Row<'_>) -> Result<FileRecord> {
    let folders_json: String = row.get(8)?;
    let parent_folders: Vec<String> = serde_json::from_str(&folders_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;
    Ok(FileRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        remote_id: row.get(2)?,
        name: row.get(3)?,
        mime_type: row.get(4)?,
        size_bytes: row.get(5)?,
        modified_at: row.get(6)?,
        created_at: row.get(7)?,
        parent_folders,
        is_shared: row.get(9)?,
        analysis_status: row.get(10)?,
        status_changed_at: row.get(11)?,
        synced_at: row.get(12)?,
    })
}

fn recommendation_from_row(row: &Row<'_>) -> Result<Recommendation> {
    Ok(Recommendation {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        file_id: row.get(2)?,
        kind: row.get(3)?,
        confidence: row.get(4)?,
        estimated_savings_bytes: row.get(5)?,
        rationale: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Database {
    // ── Files ────────────────────────────────────────────────────

    /// Insert or fully overwrite files keyed on `(owner_id, remote_id)`.
    /// Every written row is reset to `pending`. All-or-nothing.
    pub fn upsert_files(&self, files: &[NewFileRecord], now: DateTime<Utc>) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO files \
                 (owner_id, remote_id, name, mime_type, size_bytes, modified_at, created_at, \
                  parent_folders, is_shared, analysis_status, status_changed_at, synced_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', ?10, ?10) \
                 ON CONFLICT(owner_id, remote_id) DO UPDATE SET \
                     name = excluded.name, \
                     mime_type = excluded.mime_type, \
                     size_bytes = excluded.size_bytes, \
                     modified_at = excluded.modified_at, \
                     created_at = excluded.created_at, \
                     parent_folders = excluded.parent_folders, \
                     is_shared = excluded.is_shared, \
                     analysis_status = excluded.analysis_status, \
                     status_changed_at = excluded.status_changed_at, \
                     synced_at = excluded.synced_at",
            )?;
            for file in files {
                let folders = serde_json::to_string(&file.parent_folders)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                count += stmt.execute(params![
                    file.owner_id,
                    file.remote_id,
                    file.name,
                    file.mime_type,
                    file.size_bytes,
                    file.modified_at,
                    file.created_at,
                    folders,
                    file.is_shared,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Upserted {} files", count);
        Ok(count)
    }

    pub fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM files WHERE id = ?1", FILE_COLUMNS),
                params![file_id],
                file_from_row,
            )
            .optional()
    }

    pub fn list_files(&self, owner_id: &str) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM files WHERE owner_id = ?1 ORDER BY id",
            FILE_COLUMNS
        ))?;
        let files = stmt
            .query_map(params![owner_id], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Resolve local ids to the owner's records, keeping request order.
    /// Unknown ids, foreign ids and repeats are dropped.
    pub fn get_owned_files(&self, owner_id: &str, file_ids: &[i64]) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM files WHERE id = ?1 AND owner_id = ?2",
            FILE_COLUMNS
        ))?;
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for file_id in file_ids {
            if !seen.insert(*file_id) {
                continue;
            }
            if let Some(file) = stmt
                .query_row(params![file_id, owner_id], file_from_row)
                .optional()?
            {
                files.push(file);
            }
        }
        Ok(files)
    }

    /// Delete a file and its recommendations. Returns false if it was already gone.
    pub fn delete_file(&self, file_id: i64) -> Result<bool> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM file_analysis WHERE file_id = ?1",
            params![file_id],
        )?;
        let removed = tx.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // ── Analysis state machine ───────────────────────────────────

    /// Claim up to `limit` pending files of an owner by moving them to
    /// `processing` in one statement. Only rows this call flipped are returned.
    pub fn claim_pending_batch(
        &self,
        owner_id: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare(&format!(
            "UPDATE files SET analysis_status = 'processing', status_changed_at = ?3 \
             WHERE id IN ( \
                 SELECT id FROM files \
                 WHERE owner_id = ?1 AND analysis_status = 'pending' \
                 ORDER BY id LIMIT ?2) \
             AND analysis_status = 'pending' \
             RETURNING {}",
            FILE_COLUMNS
        ))?;
        let mut files = stmt
            .query_map(params![owner_id, limit as i64, now], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        files.sort_by_key(|f| f.id);
        debug!("Claimed {} pending files for {}", files.len(), owner_id);
        Ok(files)
    }

    /// Number of other files of the owner with the same name and size.
    /// `NULL` sizes only match other `NULL` sizes.
    pub fn count_duplicates(
        &self,
        owner_id: &str,
        name: &str,
        size_bytes: Option<i64>,
        exclude_id: i64,
    ) -> Result<i64> {
        self.connection().query_row(
            "SELECT COUNT(*) FROM files \
             WHERE owner_id = ?1 AND name = ?2 AND size_bytes IS ?3 AND id != ?4",
            params![owner_id, name, size_bytes, exclude_id],
            |row| row.get(0),
        )
    }

    /// Replace the recommendations of a claimed batch and mark it completed.
    /// Files that were re-queued by a sync while in flight stay `pending`.
    pub fn complete_batch(
        &self,
        file_ids: &[i64],
        recommendations: &[NewRecommendation],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut clear_stmt =
                tx.prepare_cached("DELETE FROM file_analysis WHERE file_id = ?1")?;
            for file_id in file_ids {
                clear_stmt.execute(params![file_id])?;
            }

            let mut insert_stmt = tx.prepare_cached(
                "INSERT INTO file_analysis \
                 (owner_id, file_id, kind, confidence, estimated_savings_bytes, rationale, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for rec in recommendations {
                inserted += insert_stmt.execute(params![
                    rec.owner_id,
                    rec.file_id,
                    rec.kind,
                    rec.confidence,
                    rec.estimated_savings_bytes,
                    rec.rationale,
                    now,
                ])?;
            }

            let mut status_stmt = tx.prepare_cached(
                "UPDATE files SET analysis_status = 'completed', status_changed_at = ?2 \
                 WHERE id = ?1 AND analysis_status = 'processing'",
            )?;
            for file_id in file_ids {
                status_stmt.execute(params![file_id, now])?;
            }
        }
        tx.commit()?;
        debug!(
            "Completed batch of {} files with {} recommendations",
            file_ids.len(),
            inserted
        );
        Ok(inserted)
    }

    /// Move `processing` files whose last transition is older than `cutoff`
    /// back to `pending`.
    pub fn reset_stuck_processing(
        &self,
        owner_id: &str,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let reset = self.connection().execute(
            "UPDATE files SET analysis_status = 'pending', status_changed_at = ?3 \
             WHERE owner_id = ?1 AND analysis_status = 'processing' AND status_changed_at < ?2",
            params![owner_id, cutoff, now],
        )?;
        debug!("Reset {} stuck files for {}", reset, owner_id);
        Ok(reset)
    }

    pub fn count_by_status(&self, owner_id: &str, status: AnalysisStatus) -> Result<i64> {
        self.connection().query_row(
            "SELECT COUNT(*) FROM files WHERE owner_id = ?1 AND analysis_status = ?2",
            params![owner_id, status],
            |row| row.get(0),
        )
    }

    // ── Recommendations ──────────────────────────────────────────

    pub fn get_recommendations(&self, owner_id: &str) -> Result<Vec<Recommendation>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM file_analysis WHERE owner_id = ?1 ORDER BY id",
            RECOMMENDATION_COLUMNS
        ))?;
        let recs = stmt
            .query_map(params![owner_id], recommendation_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(recs)
    }

    pub fn get_recommendations_for_file(&self, file_id: i64) -> Result<Vec<Recommendation>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM file_analysis WHERE file_id = ?1 ORDER BY id",
            RECOMMENDATION_COLUMNS
        ))?;
        let recs = stmt
            .query_map(params![file_id], recommendation_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(recs)
    }

    // ── Stats ────────────────────────────────────────────────────

    pub fn storage_stats(&self, owner_id: &str) -> Result<StorageStats> {
        let mut stats = StorageStats::default();

        let mut stmt = self
            .connection()
            .prepare("SELECT mime_type, size_bytes, analysis_status FROM files WHERE owner_id = ?1")?;
        let mut rows = stmt.query(params![owner_id])?;
        while let Some(row) = rows.next()? {
            let mime_type: String = row.get(0)?;
            let size = row.get::<_, Option<i64>>(1)?.unwrap_or(0);
            let status: AnalysisStatus = row.get(2)?;
            stats.total_files += 1;
            stats.total_size_bytes += size;
            stats.breakdown.add(&mime_type, size);
            match status {
                AnalysisStatus::Pending => stats.pending += 1,
                AnalysisStatus::Processing => stats.processing += 1,
                AnalysisStatus::Completed => stats.completed += 1,
            }
        }

        let (count, savings, duplicates): (i64, i64, i64) = self.connection().query_row(
            "SELECT COUNT(*), COALESCE(SUM(estimated_savings_bytes), 0), \
                    COALESCE(SUM(CASE WHEN kind = 'duplicate' THEN 1 ELSE 0 END), 0) \
             FROM file_analysis WHERE owner_id = ?1",
            params![owner_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        stats.recommendation_count = count;
        stats.potential_savings_bytes = savings;
        stats.duplicate_count = duplicates;

        Ok(stats)
    }

    // ── Profiles ─────────────────────────────────────────────────

    pub fn set_access_token(&self, owner_id: &str, token: &str) -> Result<()> {
        let now = Utc::now();
        self.connection().execute(
            "INSERT INTO profiles (owner_id, access_token, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(owner_id) DO UPDATE SET \
                 access_token = excluded.access_token, updated_at = excluded.updated_at",
            params![owner_id, token, now],
        )?;
        Ok(())
    }

    pub fn get_access_token(&self, owner_id: &str) -> Result<Option<String>> {
        self.connection()
            .query_row(
                "SELECT access_token FROM profiles WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )
            .optional()
    }
}
