//! Market-intelligence job endpoints.

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::research::{
    can_select, resolve_selection, ResearchJob, ResearchStatus, ResumePlan, StateError,
};
use crate::server::app::AppState;
use crate::server::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateResearchJobRequest {
    pub keywords: Vec<String>,
    pub marketplace: String,
    pub max_competitors: Option<i32>,
    pub reviews_per_product: Option<i32>,
    pub created_by: Option<Uuid>,
}

pub async fn create_research_job(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateResearchJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let keywords: Vec<String> = req
        .keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return Err(ApiError::Validation(
            "at least one keyword is required".to_string(),
        ));
    }
    if req.marketplace.trim().is_empty() {
        return Err(ApiError::Validation("marketplace is required".to_string()));
    }

    let job = ResearchJob::new(
        keywords,
        req.marketplace,
        req.max_competitors,
        req.reviews_per_product,
        req.created_by,
    );
    state.research_store.insert_research_job(&job).await?;

    let runner = state.research_runner();
    state
        .spawner
        .spawn(job.id, runner.execute_candidate_scrape(job.id))
        .await;

    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_research_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResearchJob>, ApiError> {
    let job = state
        .research_store
        .get_research_job(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("research job {} not found", id)))?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize, Default)]
pub struct SelectProductsRequest {
    pub asins: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectProductsResponse {
    /// Whether this attempt resumed a failed job rather than starting fresh.
    pub resumed: bool,
    pub job: ResearchJob,
}

/// Start (or resume) the analysis pipeline for the selected products.
///
/// Allowed from `awaiting_selection` and, as a retry, from `failed`. A retry
/// without a body reuses the persisted selection and picks up where the last
/// attempt stopped.
pub async fn select_products(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<SelectProductsRequest>>,
) -> Result<Json<SelectProductsResponse>, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let mut job = state
        .research_store
        .get_research_job(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("research job {} not found", id)))?;

    if !can_select(job.status) {
        return Err(StateError::SelectionNotAllowed(job.status).into());
    }
    let asins = resolve_selection(req.asins, job.selected_asins.as_ref())?;

    let resumed = job.status == ResearchStatus::Failed;
    let plan = if resumed {
        ResumePlan::for_job(&job, &asins)
    } else {
        ResumePlan::RestartReviews
    };

    let previous = job.status;
    job.status = ResearchStatus::Analyzing;
    job.selected_asins = Some(asins.clone());
    job.error_message = None;
    job.touch();

    // Guards against a double-submit racing this handler.
    if !state
        .research_store
        .update_research_job_if_status(&job, previous)
        .await?
    {
        return Err(ApiError::Conflict(
            "job status changed while starting analysis".to_string(),
        ));
    }

    let runner = state.research_runner();
    state
        .spawner
        .spawn(job.id, runner.execute_analysis(job.id, asins, plan))
        .await;

    Ok(Json(SelectProductsResponse { resumed, job }))
}
