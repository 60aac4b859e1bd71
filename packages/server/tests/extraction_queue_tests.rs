mod common;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};

use common::{json_body, test_env, TestEnv};
use server_core::domains::extraction::{
    ClaimedWork, ExtractionStatus, ItemOutcome, ItemStatus, QaExtractionJob,
};
use server_core::kernel::store::ExtractionStore;
use server_core::server::routes::extraction::{
    cancel_extraction_job, claim_work, create_extraction_job, get_extraction_job, report_work,
    CreateExtractionJobRequest, ExtractionJobResponse, ReportRequest,
};

async fn create_job(env: &TestEnv, asins: &[&str]) -> ExtractionJobResponse {
    let response = create_extraction_job(
        Extension(env.state.clone()),
        Json(CreateExtractionJobRequest {
            asins: asins.iter().map(|a| a.to_string()).collect(),
            marketplace: "US".to_string(),
            created_by: None,
        }),
    )
    .await
    .expect("create extraction job");
    let (status, body): (StatusCode, ExtractionJobResponse) = json_body(response).await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn claim(env: &TestEnv) -> Option<ClaimedWork> {
    let Json(work) = claim_work(Extension(env.state.clone())).await.unwrap();
    work
}

async fn report(
    env: &TestEnv,
    item_id: uuid::Uuid,
    outcome: ItemOutcome,
) -> Result<QaExtractionJob, server_core::server::ApiError> {
    report_work(
        Extension(env.state.clone()),
        Json(ReportRequest {
            item_id,
            outcome,
            questions_extracted: match outcome {
                ItemOutcome::Completed => Some(4),
                _ => None,
            },
            error_message: match outcome {
                ItemOutcome::Failed => Some("extraction failed".to_string()),
                _ => None,
            },
        }),
    )
    .await
    .map(|Json(job)| job)
}

/// Claim-and-report `completed` successes then `failed` failures.
async fn drain(env: &TestEnv, completed: usize, failed: usize) -> QaExtractionJob {
    let mut last = None;
    for i in 0..(completed + failed) {
        let work = claim(env).await.expect("work available");
        let outcome = if i < completed {
            ItemOutcome::Completed
        } else {
            ItemOutcome::Failed
        };
        last = Some(report(env, work.item_id, outcome).await.unwrap());
    }
    last.expect("at least one report")
}

#[tokio::test]
async fn job_meeting_threshold_completes() {
    let env = test_env();
    let asins: Vec<String> = (0..10).map(|i| format!("B{:02}", i)).collect();
    let asin_refs: Vec<&str> = asins.iter().map(|s| s.as_str()).collect();
    let created = create_job(&env, &asin_refs).await;
    assert_eq!(created.job.total_items, 10);

    // 7 of 10 succeed: at the 0.70 threshold, the job is fully completed.
    let job = drain(&env, 7, 3).await;
    assert_eq!(job.status, ExtractionStatus::Completed);
    assert_eq!(job.completed_items, 7);
    assert_eq!(job.failed_items, 3);
}

#[tokio::test]
async fn job_below_threshold_completes_partial() {
    let env = test_env();
    let asins: Vec<String> = (0..10).map(|i| format!("B{:02}", i)).collect();
    let asin_refs: Vec<&str> = asins.iter().map(|s| s.as_str()).collect();
    create_job(&env, &asin_refs).await;

    let job = drain(&env, 6, 4).await;
    assert_eq!(job.status, ExtractionStatus::CompletedPartial);
}

#[tokio::test]
async fn skipped_items_count_toward_neither_tally() {
    let env = test_env();
    create_job(&env, &["B01", "B02"]).await;

    let first = claim(&env).await.unwrap();
    report(&env, first.item_id, ItemOutcome::Completed).await.unwrap();
    let second = claim(&env).await.unwrap();
    let job = report(&env, second.item_id, ItemOutcome::Skipped).await.unwrap();

    assert_eq!(job.completed_items, 1);
    assert_eq!(job.failed_items, 0);
    // All items are terminal, so the job still finalizes: 1/2 is below 0.70.
    assert_eq!(job.status, ExtractionStatus::CompletedPartial);
}

#[tokio::test]
async fn claims_hand_out_oldest_job_first_in_item_order() {
    let env = test_env();
    // Insert directly so the two jobs have distinct creation times.
    let mut old_job = QaExtractionJob::new("US".to_string(), 2, None);
    old_job.created_at = Utc::now() - Duration::hours(1);
    env.store.insert_extraction_job(&old_job).await.unwrap();
    env.store
        .insert_extraction_items(&server_core::domains::extraction::build_items(
            old_job.id,
            &["OLD1".to_string(), "OLD2".to_string()],
        ))
        .await
        .unwrap();

    let new_job = QaExtractionJob::new("US".to_string(), 1, None);
    env.store.insert_extraction_job(&new_job).await.unwrap();
    env.store
        .insert_extraction_items(&server_core::domains::extraction::build_items(
            new_job.id,
            &["NEW1".to_string()],
        ))
        .await
        .unwrap();

    let first = claim(&env).await.unwrap();
    assert_eq!(first.asin, "OLD1");
    assert_eq!(first.job_id, old_job.id);
    let second = claim(&env).await.unwrap();
    assert_eq!(second.asin, "OLD2");
    let third = claim(&env).await.unwrap();
    assert_eq!(third.asin, "NEW1");
    assert!(claim(&env).await.is_none());
}

#[tokio::test]
async fn first_claim_moves_job_to_processing() {
    let env = test_env();
    let created = create_job(&env, &["B01"]).await;
    assert_eq!(created.job.status, ExtractionStatus::Queued);

    let work = claim(&env).await.unwrap();
    assert_eq!(work.job_id, created.job.id);
    assert_eq!(work.marketplace, "US");

    let job = env
        .store
        .get_extraction_job(created.job.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, ExtractionStatus::Processing);
}

#[tokio::test]
async fn stale_claims_are_swept_and_rehanded_out() {
    let env = test_env();
    create_job(&env, &["B01"]).await;

    let work = claim(&env).await.unwrap();
    // Nothing else is claimable while the item is processing.
    assert!(claim(&env).await.is_none());

    // Age the claim past the staleness window.
    let mut item = env
        .store
        .get_extraction_item(work.item_id)
        .await
        .unwrap()
        .unwrap();
    item.started_at = Some(Utc::now() - Duration::minutes(31));
    env.store.update_extraction_item(&item).await.unwrap();

    let reclaimed = claim(&env).await.expect("stale item reclaimed");
    assert_eq!(reclaimed.item_id, work.item_id);
}

#[tokio::test]
async fn cancel_skips_pending_and_rejects_repeat() {
    let env = test_env();
    let created = create_job(&env, &["B01", "B02", "B03"]).await;
    let claimed = claim(&env).await.unwrap();

    let Json(cancelled) = cancel_extraction_job(Extension(env.state.clone()), Path(created.job.id))
        .await
        .unwrap();
    assert_eq!(cancelled.status, ExtractionStatus::Cancelled);

    // Pending items were skipped; the in-flight claim is untouched.
    let Json(read) = get_extraction_job(Extension(env.state.clone()), Path(created.job.id))
        .await
        .unwrap();
    for item in &read.items {
        if item.id == claimed.item_id {
            assert_eq!(item.status, ItemStatus::Processing);
        } else {
            assert_eq!(item.status, ItemStatus::Skipped);
        }
    }

    // Nothing further is handed out and a second cancel conflicts.
    assert!(claim(&env).await.is_none());
    let err = cancel_extraction_job(Extension(env.state.clone()), Path(created.job.id))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn late_report_after_cancel_is_recorded_without_status_change() {
    let env = test_env();
    let created = create_job(&env, &["B01", "B02"]).await;
    let claimed = claim(&env).await.unwrap();

    cancel_extraction_job(Extension(env.state.clone()), Path(created.job.id))
        .await
        .unwrap();

    let job = report(&env, claimed.item_id, ItemOutcome::Completed)
        .await
        .unwrap();
    assert_eq!(job.status, ExtractionStatus::Cancelled);
    assert_eq!(job.completed_items, 1);

    let item = env
        .store
        .get_extraction_item(claimed.item_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status, ItemStatus::Completed);
}

#[tokio::test]
async fn duplicate_and_unknown_reports_are_rejected() {
    let env = test_env();
    create_job(&env, &["B01"]).await;
    let work = claim(&env).await.unwrap();
    report(&env, work.item_id, ItemOutcome::Completed).await.unwrap();

    let err = report(&env, work.item_id, ItemOutcome::Failed).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let err = report(&env, uuid::Uuid::new_v4(), ItemOutcome::Completed)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_item_keeps_the_worker_error() {
    let env = test_env();
    create_job(&env, &["B01"]).await;
    let work = claim(&env).await.unwrap();
    report(&env, work.item_id, ItemOutcome::Failed).await.unwrap();

    let item = env
        .store
        .get_extraction_item(work.item_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status, ItemStatus::Failed);
    assert_eq!(item.error_message.as_deref(), Some("extraction failed"));
    assert!(item.completed_at.is_some());
}

#[tokio::test]
async fn empty_queue_claims_return_null() {
    let env = test_env();
    assert!(claim(&env).await.is_none());
}

#[tokio::test]
async fn create_dedupes_asins_and_validates_input() {
    let env = test_env();
    let created = create_job(&env, &["B01", "B01", "B02"]).await;
    assert_eq!(created.job.total_items, 2);
    assert_eq!(created.items.len(), 2);

    let err = create_extraction_job(
        Extension(env.state.clone()),
        Json(CreateExtractionJobRequest {
            asins: vec![],
            marketplace: "US".to_string(),
            created_by: None,
        }),
    )
    .await
    .err()
    .expect("validation error");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}
