mod common;

use chrono::{Duration, TimeZone, Utc};
use common::new_record;
use janitor_core::storage::models::*;
use janitor_core::storage::{Database, SCHEMA_VERSION};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn rec(owner: &str, file_id: i64, kind: RecommendationKind, savings: i64) -> NewRecommendation {
    NewRecommendation {
        owner_id: owner.to_string(),
        file_id,
        kind,
        confidence: 0.5,
        estimated_savings_bytes: savings,
        rationale: "test".to_string(),
    }
}

#[test]
fn test_upsert_twice_keeps_identity_and_resets_status() {
    let db = Database::open_in_memory().unwrap();
    let listing = vec![
        new_record("alice", "r1", "a.jpg", Some(100), t0()),
        new_record("alice", "r2", "b.jpg", None, t0()),
    ];

    assert_eq!(db.upsert_files(&listing, t0()).unwrap(), 2);
    let first = db.list_files("alice").unwrap();

    // Simulate a completed analysis, then sync the same listing again.
    let ids: Vec<i64> = first.iter().map(|f| f.id).collect();
    db.claim_pending_batch("alice", 10, t0()).unwrap();
    db.complete_batch(&ids, &[], t0()).unwrap();
    assert_eq!(db.count_by_status("alice", AnalysisStatus::Completed).unwrap(), 2);

    db.upsert_files(&listing, t0() + Duration::hours(1)).unwrap();
    let second = db.list_files("alice").unwrap();

    assert_eq!(second.len(), 2);
    for (before, after) in first.iter().zip(&second) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.remote_id, after.remote_id);
        assert_eq!(before.name, after.name);
        assert_eq!(before.size_bytes, after.size_bytes);
        assert_eq!(before.parent_folders, after.parent_folders);
        assert_eq!(after.analysis_status, AnalysisStatus::Pending);
    }
}

#[test]
fn test_upsert_overwrites_every_column() {
    let db = Database::open_in_memory().unwrap();
    let mut original = new_record("alice", "r1", "draft.txt", Some(10), t0());
    original.parent_folders = vec!["p1".to_string(), "p2".to_string()];
    original.is_shared = true;
    db.upsert_files(&[original], t0()).unwrap();

    let renamed = new_record("alice", "r1", "final.txt", None, t0() + Duration::days(1));
    db.upsert_files(&[renamed], t0()).unwrap();

    let files = db.list_files("alice").unwrap();
    assert_eq!(files.len(), 1);
    let file = &files[0];
    assert_eq!(file.name, "final.txt");
    assert_eq!(file.size_bytes, None);
    assert_eq!(file.parent_folders, vec!["root".to_string()]);
    assert!(!file.is_shared);
    assert_eq!(file.modified_at, t0() + Duration::days(1));
}

#[test]
fn test_same_remote_id_for_different_owners_are_distinct() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(
        &[
            new_record("alice", "shared-id", "a", Some(1), t0()),
            new_record("bob", "shared-id", "a", Some(1), t0()),
        ],
        t0(),
    )
    .unwrap();
    assert_eq!(db.list_files("alice").unwrap().len(), 1);
    assert_eq!(db.list_files("bob").unwrap().len(), 1);
}

#[test]
fn test_claim_respects_limit_and_never_double_claims() {
    let db = Database::open_in_memory().unwrap();
    let listing: Vec<_> = (0..5)
        .map(|i| new_record("alice", &format!("r{}", i), &format!("f{}", i), Some(i), t0()))
        .collect();
    db.upsert_files(&listing, t0()).unwrap();

    let first = db.claim_pending_batch("alice", 3, t0()).unwrap();
    assert_eq!(first.len(), 3);
    assert!(first
        .iter()
        .all(|f| f.analysis_status == AnalysisStatus::Processing));

    let second = db.claim_pending_batch("alice", 3, t0()).unwrap();
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|f| !first.iter().any(|g| g.id == f.id)));

    assert!(db.claim_pending_batch("alice", 3, t0()).unwrap().is_empty());
    assert_eq!(db.count_by_status("alice", AnalysisStatus::Processing).unwrap(), 5);
}

#[test]
fn test_claim_is_scoped_to_owner() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(&[new_record("bob", "r1", "x", Some(1), t0())], t0())
        .unwrap();
    assert!(db.claim_pending_batch("alice", 10, t0()).unwrap().is_empty());
    assert_eq!(db.count_by_status("bob", AnalysisStatus::Pending).unwrap(), 1);
}

#[test]
fn test_count_duplicates_treats_null_as_comparable() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(
        &[
            new_record("alice", "r1", "a.jpg", Some(100), t0()),
            new_record("alice", "r2", "a.jpg", Some(100), t0()),
            new_record("alice", "r3", "a.jpg", Some(200), t0()),
            new_record("alice", "r4", "doc", None, t0()),
            new_record("alice", "r5", "doc", None, t0()),
            new_record("alice", "r6", "doc", Some(5), t0()),
            new_record("bob", "r7", "a.jpg", Some(100), t0()),
        ],
        t0(),
    )
    .unwrap();
    let files = db.list_files("alice").unwrap();
    let id = |remote: &str| files.iter().find(|f| f.remote_id == remote).unwrap().id;

    assert_eq!(db.count_duplicates("alice", "a.jpg", Some(100), id("r1")).unwrap(), 1);
    assert_eq!(db.count_duplicates("alice", "a.jpg", Some(200), id("r3")).unwrap(), 0);
    assert_eq!(db.count_duplicates("alice", "doc", None, id("r4")).unwrap(), 1);
    assert_eq!(db.count_duplicates("alice", "doc", Some(5), id("r6")).unwrap(), 0);
}

#[test]
fn test_complete_batch_replaces_previous_recommendations() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(&[new_record("alice", "r1", "a", Some(10), t0())], t0())
        .unwrap();
    let file_id = db.claim_pending_batch("alice", 10, t0()).unwrap()[0].id;
    db.complete_batch(
        &[file_id],
        &[
            rec("alice", file_id, RecommendationKind::Duplicate, 10),
            rec("alice", file_id, RecommendationKind::OldFile, 10),
        ],
        t0(),
    )
    .unwrap();
    assert_eq!(db.get_recommendations_for_file(file_id).unwrap().len(), 2);

    db.upsert_files(&[new_record("alice", "r1", "a", Some(10), t0())], t0())
        .unwrap();
    db.claim_pending_batch("alice", 10, t0()).unwrap();
    db.complete_batch(
        &[file_id],
        &[rec("alice", file_id, RecommendationKind::OldFile, 10)],
        t0(),
    )
    .unwrap();

    let recs = db.get_recommendations_for_file(file_id).unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].kind, RecommendationKind::OldFile);
}

#[test]
fn test_complete_batch_leaves_requeued_file_pending() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(&[new_record("alice", "r1", "a", Some(10), t0())], t0())
        .unwrap();
    let file_id = db.claim_pending_batch("alice", 10, t0()).unwrap()[0].id;

    // A sync lands while the batch is in flight.
    db.upsert_files(&[new_record("alice", "r1", "a", Some(11), t0())], t0())
        .unwrap();
    db.complete_batch(&[file_id], &[], t0()).unwrap();

    let file = db.get_file(file_id).unwrap().unwrap();
    assert_eq!(file.analysis_status, AnalysisStatus::Pending);
}

#[test]
fn test_delete_file_cascades_recommendations() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(
        &[
            new_record("alice", "r1", "a", Some(10), t0()),
            new_record("alice", "r2", "b", Some(10), t0()),
        ],
        t0(),
    )
    .unwrap();
    let batch = db.claim_pending_batch("alice", 10, t0()).unwrap();
    let ids: Vec<i64> = batch.iter().map(|f| f.id).collect();
    db.complete_batch(
        &ids,
        &[
            rec("alice", ids[0], RecommendationKind::LargeFile, 10),
            rec("alice", ids[1], RecommendationKind::LargeFile, 10),
        ],
        t0(),
    )
    .unwrap();

    assert!(db.delete_file(ids[0]).unwrap());
    assert!(!db.delete_file(ids[0]).unwrap());
    assert!(db.get_file(ids[0]).unwrap().is_none());
    assert!(db.get_recommendations_for_file(ids[0]).unwrap().is_empty());
    assert_eq!(db.get_recommendations("alice").unwrap().len(), 1);
}

#[test]
fn test_get_owned_files_filters_foreign_missing_and_repeated_ids() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(
        &[
            new_record("alice", "r1", "a", Some(1), t0()),
            new_record("alice", "r2", "b", Some(1), t0()),
            new_record("bob", "r3", "c", Some(1), t0()),
        ],
        t0(),
    )
    .unwrap();
    let alice = db.list_files("alice").unwrap();
    let bob = db.list_files("bob").unwrap();

    let resolved = db
        .get_owned_files("alice", &[alice[1].id, 9999, bob[0].id, alice[0].id, alice[1].id])
        .unwrap();
    let names: Vec<_> = resolved.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
}

#[test]
fn test_reset_stuck_processing_only_touches_old_claims() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(
        &[
            new_record("alice", "r1", "a", Some(1), t0()),
            new_record("alice", "r2", "b", Some(1), t0()),
        ],
        t0(),
    )
    .unwrap();
    db.claim_pending_batch("alice", 1, t0()).unwrap();
    db.claim_pending_batch("alice", 1, t0() + Duration::hours(2)).unwrap();

    let reset = db
        .reset_stuck_processing("alice", t0() + Duration::hours(1), t0() + Duration::hours(3))
        .unwrap();
    assert_eq!(reset, 1);
    assert_eq!(db.count_by_status("alice", AnalysisStatus::Pending).unwrap(), 1);
    assert_eq!(db.count_by_status("alice", AnalysisStatus::Processing).unwrap(), 1);
}

#[test]
fn test_storage_stats() {
    let db = Database::open_in_memory().unwrap();
    let mut video = new_record("alice", "r1", "v.mp4", Some(1000), t0());
    video.mime_type = "video/mp4".to_string();
    let mut image = new_record("alice", "r2", "i.png", Some(200), t0());
    image.mime_type = "image/png".to_string();
    let mut folder = new_record("alice", "r3", "Folder", None, t0());
    folder.mime_type = "application/vnd.google-apps.folder".to_string();
    db.upsert_files(&[video, image, folder], t0()).unwrap();

    let batch = db.claim_pending_batch("alice", 1, t0()).unwrap();
    db.complete_batch(
        &[batch[0].id],
        &[
            rec("alice", batch[0].id, RecommendationKind::Duplicate, 1000),
            rec("alice", batch[0].id, RecommendationKind::LargeFile, 1000),
        ],
        t0(),
    )
    .unwrap();

    let stats = db.storage_stats("alice").unwrap();
    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.total_size_bytes, 1200);
    assert_eq!(stats.breakdown.videos, 1000);
    assert_eq!(stats.breakdown.images, 200);
    assert_eq!(stats.breakdown.other, 0);
    assert_eq!(stats.recommendation_count, 2);
    assert_eq!(stats.duplicate_count, 1);
    assert_eq!(stats.potential_savings_bytes, 2000);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.processing, 0);

    assert_eq!(db.storage_stats("nobody").unwrap(), StorageStats::default());
}

#[test]
fn test_profiles_round_trip() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.get_access_token("alice").unwrap(), None);
    db.set_access_token("alice", "t1").unwrap();
    db.set_access_token("alice", "t2").unwrap();
    assert_eq!(db.get_access_token("alice").unwrap().as_deref(), Some("t2"));
}

#[test]
fn test_truncate_all() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_files(&[new_record("alice", "r1", "a", Some(1), t0())], t0())
        .unwrap();
    db.set_access_token("alice", "t").unwrap();
    db.truncate_all().unwrap();
    assert!(db.list_files("alice").unwrap().is_empty());
    assert_eq!(db.get_access_token("alice").unwrap(), None);
}

#[test]
fn test_schema_version_stamped_and_reopen_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("janitor.db");
    let path = path.to_str().unwrap();

    let db = Database::open(path).unwrap();
    assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    db.upsert_files(&[new_record("alice", "r1", "a.txt", Some(1), t0())], t0())
        .unwrap();
    drop(db);

    let db = Database::open(path).unwrap();
    assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    assert_eq!(db.list_files("alice").unwrap().len(), 1);
}

#[test]
fn test_current_schema_version_skips_migration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("janitor.db");
    let path = path.to_str().unwrap();

    let db = Database::open(path).unwrap();
    db.connection().execute_batch("DROP TABLE profiles;").unwrap();
    drop(db);

    // Already at the current version, so the schema script is not replayed.
    let db = Database::open(path).unwrap();
    let profiles: i64 = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'profiles'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(profiles, 0);
}
