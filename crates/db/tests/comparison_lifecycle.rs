use sqlx::PgPool;

use lascmp_db::models::status::{ComparisonStatus, FileStatus};
use lascmp_db::models::NewComparisonFile;
use lascmp_db::repositories::{ComparisonFileRepo, ComparisonRepo};

fn new_file(comparison_id: i64, file_id: i64, included: bool) -> NewComparisonFile {
    NewComparisonFile {
        comparison_id,
        file_id,
        group_name: "survey-a".to_string(),
        included,
        status: if included {
            FileStatus::Processing
        } else {
            FileStatus::Ready
        },
    }
}

#[sqlx::test]
async fn comparison_starts_pending(pool: PgPool) {
    let comparison = ComparisonRepo::create(&pool, "baseline vs resurvey")
        .await
        .unwrap();
    assert_eq!(comparison.status, ComparisonStatus::Pending);
    assert!(comparison.error_message.is_none());

    let found = ComparisonRepo::find_by_id(&pool, comparison.id)
        .await
        .unwrap()
        .expect("created comparison should be found");
    assert_eq!(found.name, "baseline vs resurvey");
}

#[sqlx::test]
async fn fan_in_cas_only_fires_once(pool: PgPool) {
    let comparison = ComparisonRepo::create(&pool, "cas").await.unwrap();

    assert!(ComparisonRepo::try_begin_comparing(&pool, comparison.id)
        .await
        .unwrap());
    // Second caller loses the race.
    assert!(!ComparisonRepo::try_begin_comparing(&pool, comparison.id)
        .await
        .unwrap());
}

#[sqlx::test]
async fn terminal_states_are_never_reverted(pool: PgPool) {
    let comparison = ComparisonRepo::create(&pool, "terminal").await.unwrap();

    assert!(ComparisonRepo::fail_if_active(&pool, comparison.id, "preprocessing timed out")
        .await
        .unwrap());
    // A second failure is suppressed; the first reason wins.
    assert!(!ComparisonRepo::fail_if_active(&pool, comparison.id, "other")
        .await
        .unwrap());
    // A late successful result cannot complete a failed comparison.
    assert!(!ComparisonRepo::complete(&pool, comparison.id, "results", "cmp.laz")
        .await
        .unwrap());

    let found = ComparisonRepo::find_by_id(&pool, comparison.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, ComparisonStatus::Failed);
    assert_eq!(found.error_message.as_deref(), Some("preprocessing timed out"));
}

#[sqlx::test]
async fn completion_requires_comparing_state(pool: PgPool) {
    let comparison = ComparisonRepo::create(&pool, "complete").await.unwrap();

    // Still PENDING: completion must not apply.
    assert!(!ComparisonRepo::complete(&pool, comparison.id, "results", "cmp.laz")
        .await
        .unwrap());

    assert!(ComparisonRepo::try_begin_comparing(&pool, comparison.id)
        .await
        .unwrap());
    assert!(ComparisonRepo::complete(&pool, comparison.id, "results", "cmp.laz")
        .await
        .unwrap());

    let found = ComparisonRepo::find_by_id(&pool, comparison.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.status, ComparisonStatus::Completed);
    assert_eq!(found.result_bucket.as_deref(), Some("results"));
    assert_eq!(found.result_object_key.as_deref(), Some("cmp.laz"));
}

#[sqlx::test]
async fn readiness_considers_included_files_only(pool: PgPool) {
    let comparison = ComparisonRepo::create(&pool, "readiness").await.unwrap();

    ComparisonFileRepo::insert(&pool, &new_file(comparison.id, 1, true))
        .await
        .unwrap();
    ComparisonFileRepo::insert(&pool, &new_file(comparison.id, 2, true))
        .await
        .unwrap();
    // Fully-claimed file: no work, READY from the start, not included.
    ComparisonFileRepo::insert(&pool, &new_file(comparison.id, 3, false))
        .await
        .unwrap();

    assert!(!ComparisonFileRepo::all_included_ready(&pool, comparison.id)
        .await
        .unwrap());

    assert!(ComparisonFileRepo::mark_ready(&pool, comparison.id, 1, "prep", "f1.laz")
        .await
        .unwrap());
    assert!(!ComparisonFileRepo::all_included_ready(&pool, comparison.id)
        .await
        .unwrap());

    assert!(ComparisonFileRepo::mark_ready(&pool, comparison.id, 2, "prep", "f2.laz")
        .await
        .unwrap());
    assert!(ComparisonFileRepo::all_included_ready(&pool, comparison.id)
        .await
        .unwrap());

    let included = ComparisonFileRepo::list_included(&pool, comparison.id)
        .await
        .unwrap();
    assert_eq!(included.len(), 2);
}

#[sqlx::test]
async fn resolved_file_cannot_be_re_failed(pool: PgPool) {
    let comparison = ComparisonRepo::create(&pool, "file race").await.unwrap();
    ComparisonFileRepo::insert(&pool, &new_file(comparison.id, 7, true))
        .await
        .unwrap();

    assert!(ComparisonFileRepo::mark_ready(&pool, comparison.id, 7, "prep", "f7.laz")
        .await
        .unwrap());
    // The sweep losing the race must observe a no-op.
    assert!(!ComparisonFileRepo::fail_if_processing(
        &pool,
        comparison.id,
        7,
        "Preprocessing timed out"
    )
    .await
    .unwrap());

    let file = ComparisonFileRepo::find(&pool, comparison.id, 7)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(file.status, FileStatus::Ready);
    assert!(file.error_msg.is_none());
}
