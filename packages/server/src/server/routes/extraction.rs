//! Extraction job endpoints, plus the worker claim/report pair.

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::extraction::{
    build_items, cancel, claim_next, report, ClaimedWork, ExtractionItem, ItemOutcome,
    QaExtractionJob,
};
use crate::server::app::AppState;
use crate::server::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateExtractionJobRequest {
    pub asins: Vec<String>,
    pub marketplace: String,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractionJobResponse {
    pub job: QaExtractionJob,
    pub items: Vec<ExtractionItem>,
}

pub async fn create_extraction_job(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateExtractionJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut seen = std::collections::HashSet::new();
    let asins: Vec<String> = req
        .asins
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && seen.insert(a.clone()))
        .collect();
    if asins.is_empty() {
        return Err(ApiError::Validation(
            "at least one ASIN is required".to_string(),
        ));
    }
    if req.marketplace.trim().is_empty() {
        return Err(ApiError::Validation("marketplace is required".to_string()));
    }

    let job = QaExtractionJob::new(req.marketplace, asins.len() as i32, req.created_by);
    let items = build_items(job.id, &asins);
    state.extraction_store.insert_extraction_job(&job).await?;
    state
        .extraction_store
        .insert_extraction_items(&items)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ExtractionJobResponse { job, items }),
    ))
}

pub async fn get_extraction_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExtractionJobResponse>, ApiError> {
    let job = state
        .extraction_store
        .get_extraction_job(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("extraction job {} not found", id)))?;
    let items = state.extraction_store.list_items_for_job(id).await?;
    Ok(Json(ExtractionJobResponse { job, items }))
}

pub async fn cancel_extraction_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QaExtractionJob>, ApiError> {
    let job = cancel(state.extraction_store.as_ref(), id, Utc::now()).await?;
    Ok(Json(job))
}

/// Worker poll: hand out the oldest claimable item, or JSON `null` when the
/// queue is empty.
pub async fn claim_work(
    Extension(state): Extension<AppState>,
) -> Result<Json<Option<ClaimedWork>>, ApiError> {
    let work = claim_next(state.extraction_store.as_ref(), &state.settings, Utc::now()).await?;
    Ok(Json(work))
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub item_id: Uuid,
    pub outcome: ItemOutcome,
    pub questions_extracted: Option<i32>,
    pub error_message: Option<String>,
}

pub async fn report_work(
    Extension(state): Extension<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<Json<QaExtractionJob>, ApiError> {
    let job = report(
        state.extraction_store.as_ref(),
        &state.settings,
        req.item_id,
        req.outcome,
        req.questions_extracted,
        req.error_message,
        Utc::now(),
    )
    .await?;
    Ok(Json(job))
}
