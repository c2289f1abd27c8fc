//! End-to-end tests for a backfill pass.
//!
//! These run the reconciler against a SQLite document store and a temporary
//! artifact directory, covering the outcome classes and rerun behavior.

use mindview_backfill::{
    run_backfill, ArtifactStore, BackfillConfig, BackfillError, CandidateFilter,
    MigrationSummary, Reconciler, RecordOutcome, SkipReason, SqliteScanFileStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Artifact directory plus an in-memory store seeded with `documents`.
fn create_test_env(documents: &[Value]) -> (TempDir, SqliteScanFileStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("metadata")).unwrap();

    let store = SqliteScanFileStore::open_in_memory("scan_files").unwrap();
    for document in documents {
        store.insert_document(document).unwrap();
    }
    (temp_dir, store)
}

fn write_artifact(temp_dir: &TempDir, job_id: &str, contents: &str) {
    std::fs::write(
        temp_dir.path().join("metadata").join(format!("{}.json", job_id)),
        contents,
    )
    .unwrap();
}

async fn run_pass(temp_dir: &TempDir, store: &SqliteScanFileStore) -> MigrationSummary {
    Reconciler::new(store, ArtifactStore::new(temp_dir.path().join("metadata")))
        .run(&CandidateFilter::completed())
        .await
        .expect("pass should complete")
}

fn outcome_for<'a>(summary: &'a MigrationSummary, job_id: &str) -> &'a RecordOutcome {
    &summary
        .records
        .iter()
        .find(|r| r.job_id.as_deref() == Some(job_id))
        .unwrap_or_else(|| panic!("no outcome for {job_id}"))
        .outcome
}

fn assert_conserved(summary: &MigrationSummary) {
    assert_eq!(
        summary.migrated + summary.skipped + summary.errors,
        summary.total
    );
    assert_eq!(summary.records.len(), summary.total);
}

#[tokio::test]
async fn test_missing_artifact_leaves_record_unchanged() {
    let original = json!({"job_id": "abc", "status": "completed", "filename": "brain.nii.gz"});
    let (temp_dir, store) = create_test_env(&[original.clone()]);

    let summary = run_pass(&temp_dir, &store).await;

    assert_eq!(
        outcome_for(&summary, "abc"),
        &RecordOutcome::Skipped(SkipReason::MetadataFileNotFound)
    );
    assert_eq!(store.get_document("abc").unwrap(), Some(original));
    assert_conserved(&summary);
}

#[tokio::test]
async fn test_regions_only_artifact_is_normalized_and_migrated() {
    let (temp_dir, store) =
        create_test_env(&[json!({"job_id": "xyz", "status": "completed", "metadata": {}})]);
    write_artifact(&temp_dir, "xyz", r#"{"regions": [1, 2, 3]}"#);

    let summary = run_pass(&temp_dir, &store).await;

    assert_eq!(
        outcome_for(&summary, "xyz"),
        &RecordOutcome::Migrated { regions: 3 }
    );
    let document = store.get_document("xyz").unwrap().unwrap();
    assert_eq!(
        document["metadata"],
        json!({"regions": [1, 2, 3], "has_tumor": false, "total_regions": 3})
    );
    assert_eq!(document["status"], json!("completed"));
}

#[tokio::test]
async fn test_empty_artifact_is_migrated_with_defaults() {
    let (temp_dir, store) = create_test_env(&[json!({"job_id": "qrs", "status": "completed"})]);
    write_artifact(&temp_dir, "qrs", "{}");

    let summary = run_pass(&temp_dir, &store).await;

    assert_eq!(
        outcome_for(&summary, "qrs"),
        &RecordOutcome::Migrated { regions: 0 }
    );
    assert_eq!(
        store.get_document("qrs").unwrap().unwrap()["metadata"],
        json!({"regions": [], "has_tumor": false, "total_regions": 0})
    );
}

#[tokio::test]
async fn test_malformed_artifact_is_error_and_pass_continues() {
    let (temp_dir, store) = create_test_env(&[
        json!({"job_id": "bad", "status": "completed"}),
        json!({"job_id": "good", "status": "completed", "metadata": {"regions": []}}),
    ]);
    write_artifact(&temp_dir, "bad", "{\"regions\": [1, 2");
    write_artifact(&temp_dir, "good", r#"{"regions": [{"label": "edema"}], "has_tumor": true}"#);

    let summary = run_pass(&temp_dir, &store).await;

    assert!(matches!(outcome_for(&summary, "bad"), RecordOutcome::Error(_)));
    assert_eq!(
        outcome_for(&summary, "good"),
        &RecordOutcome::Migrated { regions: 1 }
    );
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.migrated, 1);
    assert_eq!(summary.failed_jobs().collect::<Vec<_>>(), vec!["bad"]);
    assert_conserved(&summary);
}

#[tokio::test]
async fn test_empty_candidate_set_reports_zeros() {
    let (temp_dir, store) = create_test_env(&[
        json!({"job_id": "done", "status": "completed", "metadata": {"regions": [1]}}),
        json!({"job_id": "busy", "status": "processing"}),
    ]);

    let summary = run_pass(&temp_dir, &store).await;

    assert_eq!(summary, MigrationSummary::default());
    assert!(summary.to_string().contains("Total processed: 0"));
}

#[tokio::test]
async fn test_second_pass_migrates_nothing() {
    let (temp_dir, store) = create_test_env(&[
        json!({"job_id": "a", "status": "completed"}),
        json!({"job_id": "b", "status": "completed", "metadata": {}}),
        json!({"job_id": "c", "status": "completed"}),
    ]);
    write_artifact(&temp_dir, "a", r#"{"regions": [1, 2], "has_tumor": true}"#);
    // Normalizes to an empty region list, so `b` stays a candidate.
    write_artifact(&temp_dir, "b", "{}");

    let first = run_pass(&temp_dir, &store).await;
    assert_eq!(first.migrated, 2);
    assert_eq!(first.skipped_by_reason(SkipReason::MetadataFileNotFound), 1);
    let after_first = store.all_documents().unwrap();

    let second = run_pass(&temp_dir, &store).await;
    assert_eq!(second.migrated, 0);
    assert_eq!(second.errors, 0);
    assert_eq!(
        outcome_for(&second, "b"),
        &RecordOutcome::Skipped(SkipReason::NotModified)
    );
    assert!(second.records.iter().all(|r| r.job_id.as_deref() != Some("a")));
    assert_eq!(store.all_documents().unwrap(), after_first);
    assert_conserved(&second);
}

#[tokio::test]
async fn test_only_metadata_field_is_written() {
    let (temp_dir, store) = create_test_env(&[json!({
        "job_id": "keep",
        "status": "completed",
        "filename": "scan.nii",
        "created_at": "2024-03-01T10:00:00Z",
        "metadata": {"regions": []}
    })]);
    write_artifact(
        &temp_dir,
        "keep",
        r#"{"regions": [1], "total_regions": 4, "volumes": {"core": 1.5}}"#,
    );

    run_pass(&temp_dir, &store).await;

    let document = store.get_document("keep").unwrap().unwrap();
    assert_eq!(document["filename"], json!("scan.nii"));
    assert_eq!(document["created_at"], json!("2024-03-01T10:00:00Z"));
    // Declared total is kept even though it disagrees with the list.
    assert_eq!(document["metadata"]["total_regions"], json!(4));
    assert_eq!(document["metadata"]["volumes"], json!({"core": 1.5}));
}

#[tokio::test]
async fn test_run_backfill_against_sqlite_file() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("mindview.db");
    let metadata_dir = temp_dir.path().join("metadata");
    std::fs::create_dir_all(&metadata_dir).unwrap();
    std::fs::write(metadata_dir.join("abc.json"), r#"{"regions": [1]}"#).unwrap();

    {
        let seed = SqliteScanFileStore::create(&db_path, "scan_files").unwrap();
        seed.insert_document(&json!({"job_id": "abc", "status": "completed"}))
            .unwrap();
        seed.insert_document(&json!({"job_id": "def", "status": "completed"}))
            .unwrap();
    }

    let config = BackfillConfig::new(
        format!("sqlite://{}", db_path.display()),
        "mindview",
        &metadata_dir,
    );
    let summary = run_backfill(&config).await.unwrap();

    assert_eq!(summary.migrated, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total, 2);

    let reopened = SqliteScanFileStore::open(&db_path, "scan_files").unwrap();
    assert_eq!(
        reopened.get_document("abc").unwrap().unwrap()["metadata"]["total_regions"],
        json!(1)
    );
}

#[tokio::test]
async fn test_run_backfill_fails_when_store_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let config = BackfillConfig::new(
        format!("sqlite://{}", temp_dir.path().join("absent.db").display()),
        "mindview",
        temp_dir.path(),
    );

    let err = run_backfill(&config).await.unwrap_err();
    assert!(matches!(err, BackfillError::Database { .. }));
}
