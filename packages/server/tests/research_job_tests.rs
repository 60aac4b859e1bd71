mod common;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;

use common::{env_with_products, json_body, TestEnv};
use server_core::domains::research::{ResearchJob, ResearchStatus};
use server_core::kernel::store::ResearchJobStore;
use server_core::kernel::test_support::MockProductApi;
use server_core::server::routes::research::{
    create_research_job, get_research_job, select_products, CreateResearchJobRequest,
    SelectProductsRequest, SelectProductsResponse,
};

fn env() -> TestEnv {
    env_with_products(MockProductApi::new().with_results(&["B01", "B02", "B03"]))
}

async fn create_job(env: &TestEnv) -> ResearchJob {
    let response = create_research_job(
        Extension(env.state.clone()),
        Json(CreateResearchJobRequest {
            keywords: vec!["garlic press".to_string()],
            marketplace: "US".to_string(),
            max_competitors: None,
            reviews_per_product: None,
            created_by: None,
        }),
    )
    .await
    .expect("create research job");
    let (status, job): (StatusCode, ResearchJob) = json_body(response).await;
    assert_eq!(status, StatusCode::CREATED);
    job
}

async fn select(
    env: &TestEnv,
    id: uuid::Uuid,
    asins: Option<Vec<&str>>,
) -> Result<SelectProductsResponse, server_core::server::ApiError> {
    let body = asins.map(|asins| {
        Json(SelectProductsRequest {
            asins: Some(asins.into_iter().map(|a| a.to_string()).collect()),
        })
    });
    select_products(Extension(env.state.clone()), Path(id), body)
        .await
        .map(|Json(resp)| resp)
}

async fn stored(env: &TestEnv, id: uuid::Uuid) -> ResearchJob {
    env.store
        .get_research_job(id)
        .await
        .unwrap()
        .expect("job exists")
}

#[tokio::test]
async fn create_scrapes_candidates_and_parks_at_selection_gate() {
    let env = env();
    let job = create_job(&env).await;
    assert_eq!(job.status, ResearchStatus::Pending);

    env.state.spawner.wait(job.id).await;

    let job = stored(&env, job.id).await;
    assert_eq!(job.status, ResearchStatus::AwaitingSelection);
    let candidates = job.candidates.expect("candidates persisted");
    assert_eq!(candidates.as_array().unwrap().len(), 3);
    assert_eq!(env.products.call_count("search:"), 1);
}

#[tokio::test]
async fn selection_runs_collection_and_all_four_phases() {
    let env = env();
    let job = create_job(&env).await;
    env.state.spawner.wait(job.id).await;

    let accepted = select(&env, job.id, Some(vec!["B01", "B02"])).await.unwrap();
    assert!(!accepted.resumed);
    assert_eq!(accepted.job.status, ResearchStatus::Analyzing);
    env.state.spawner.wait(job.id).await;

    let job = stored(&env, job.id).await;
    assert_eq!(job.status, ResearchStatus::Completed);
    assert_eq!(
        job.progress.completed_phases,
        vec!["phase_1", "phase_2", "phase_3", "phase_4"]
    );
    assert_eq!(job.phase_results.as_object().unwrap().len(), 4);
    assert!(job.error_message.is_none());

    // One review and one question fetch per selected product.
    assert_eq!(env.products.call_count("reviews:"), 2);
    assert_eq!(env.products.call_count("questions:"), 2);
    assert_eq!(env.analysis.call_count(), 4);

    // Progress covered every sub-step: 2 reviews + 2 question sets + 4 phases.
    assert_eq!(job.progress.total, 8);
    assert_eq!(job.progress.current, 8);
}

#[tokio::test]
async fn phase_failure_resumes_from_next_phase_without_recollecting() {
    let env = env();
    let job = create_job(&env).await;
    env.state.spawner.wait(job.id).await;

    env.analysis.fail_on_call(3);
    select(&env, job.id, Some(vec!["B01"])).await.unwrap();
    env.state.spawner.wait(job.id).await;

    let failed = stored(&env, job.id).await;
    assert_eq!(failed.status, ResearchStatus::Failed);
    assert_eq!(failed.progress.completed_phases, vec!["phase_1", "phase_2"]);
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("analysis phase 3"));

    // Retry without a body: reuses the persisted selection and picks up at
    // phase 3.
    env.analysis.clear_failure();
    let resumed = select(&env, job.id, None).await.unwrap();
    assert!(resumed.resumed);
    assert_eq!(resumed.job.status, ResearchStatus::Analyzing);
    assert!(resumed.job.error_message.is_none());
    env.state.spawner.wait(job.id).await;

    let job = stored(&env, job.id).await;
    assert_eq!(job.status, ResearchStatus::Completed);
    assert_eq!(job.progress.completed_phases.len(), 4);
    // Reviews were not fetched again; phases 3 and 4 ran on the second pass.
    assert_eq!(env.products.call_count("reviews:"), 1);
    assert_eq!(env.products.call_count("questions:"), 1);
    assert_eq!(env.analysis.call_count(), 5);
}

#[tokio::test]
async fn collection_failure_restarts_collection_on_retry() {
    let env = env();
    let job = create_job(&env).await;
    env.state.spawner.wait(job.id).await;

    env.products.fail_on("reviews:B02");
    select(&env, job.id, Some(vec!["B01", "B02"])).await.unwrap();
    env.state.spawner.wait(job.id).await;

    let failed = stored(&env, job.id).await;
    assert_eq!(failed.status, ResearchStatus::Failed);
    assert!(failed.progress.completed_phases.is_empty());

    // Collection never finished, so the retry starts over at review fetch.
    let before = env.products.call_count("reviews:");
    env.products.clear_failures();
    select(&env, job.id, None).await.unwrap();
    env.state.spawner.wait(job.id).await;

    let job = stored(&env, job.id).await;
    assert_eq!(job.status, ResearchStatus::Completed);
    assert_eq!(env.products.call_count("reviews:") - before, 2);
}

#[tokio::test]
async fn selection_rejected_outside_gate_without_mutation() {
    let env = env();
    // A job still in candidate scraping cannot be selected against.
    let job = ResearchJob::new(vec!["kw".to_string()], "US".to_string(), None, None, None);
    env.store.insert_research_job(&job).await.unwrap();

    let err = select(&env, job.id, Some(vec!["B01"])).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let unchanged = stored(&env, job.id).await;
    assert_eq!(unchanged.status, ResearchStatus::Pending);
    assert!(unchanged.selected_asins.is_none());
    assert_eq!(env.analysis.call_count(), 0);
}

#[tokio::test]
async fn selection_requires_asins_on_first_attempt() {
    let env = env();
    let job = create_job(&env).await;
    env.state.spawner.wait(job.id).await;

    let err = select(&env, job.id, None).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_returns_job_or_404() {
    let env = env();
    let job = create_job(&env).await;

    let Json(found) = get_research_job(Extension(env.state.clone()), Path(job.id))
        .await
        .unwrap();
    assert_eq!(found.id, job.id);

    let err = get_research_job(Extension(env.state.clone()), Path(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_rejects_empty_keywords() {
    let env = env();
    let err = create_research_job(
        Extension(env.state.clone()),
        Json(CreateResearchJobRequest {
            keywords: vec!["  ".to_string()],
            marketplace: "US".to_string(),
            max_competitors: None,
            reviews_per_product: None,
            created_by: None,
        }),
    )
    .await
    .err()
    .expect("validation error");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}
