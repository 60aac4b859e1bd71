//! Seller catalog import endpoints.

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::seller::{sweep_timed_out, SellerImportJob, SellerStatus};
use crate::kernel::traits::ProductSummary;
use crate::server::app::AppState;
use crate::server::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateSellerJobRequest {
    pub seller_id: String,
    pub marketplace: String,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSellerJobResponse {
    pub job: SellerImportJob,
    /// The seller's storefront, for the user to pick imports from.
    pub catalog: Vec<ProductSummary>,
}

/// Pull the seller's catalog and create the job at the selection gate.
pub async fn create_seller_job(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateSellerJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.seller_id.trim().is_empty() {
        return Err(ApiError::Validation("seller_id is required".to_string()));
    }
    if req.marketplace.trim().is_empty() {
        return Err(ApiError::Validation("marketplace is required".to_string()));
    }

    let catalog = state
        .products
        .fetch_seller_catalog(&req.seller_id, &req.marketplace)
        .await?;

    let job = SellerImportJob::new(req.seller_id, req.marketplace, req.created_by);
    state.seller_store.insert_seller_job(&job).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSellerJobResponse { job, catalog }),
    ))
}

/// Read a job, applying the stalled-job watchdog lazily: a background job
/// with no persisted progress inside the window is failed on read.
pub async fn get_seller_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SellerImportJob>, ApiError> {
    let job = state
        .seller_store
        .get_seller_job(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("seller job {} not found", id)))?;

    if let Some(failed) = sweep_timed_out(&job, Utc::now(), state.settings.watchdog_minutes) {
        if state
            .seller_store
            .update_seller_job_if_status(&failed, job.status)
            .await?
        {
            return Ok(Json(failed));
        }
    }
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub asins: Vec<String>,
}

pub async fn import_products(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<SellerImportJob>, ApiError> {
    if req.asins.is_empty() {
        return Err(ApiError::Validation(
            "at least one ASIN is required".to_string(),
        ));
    }

    let mut job = state
        .seller_store
        .get_seller_job(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("seller job {} not found", id)))?;
    if job.status != SellerStatus::Pulled {
        return Err(ApiError::Conflict(format!(
            "cannot import while job is {:?}",
            job.status
        )));
    }

    job.status = SellerStatus::Importing;
    job.selections = Some(req.asins.clone());
    job.error_message = None;
    job.touch();
    if !state
        .seller_store
        .update_seller_job_if_status(&job, SellerStatus::Pulled)
        .await?
    {
        return Err(ApiError::Conflict(
            "job status changed while starting import".to_string(),
        ));
    }

    let runner = state.seller_runner();
    state
        .spawner
        .spawn(job.id, runner.execute_import(job.id, req.asins))
        .await;

    Ok(Json(job))
}

pub async fn import_variations(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<SellerImportJob>, ApiError> {
    if req.asins.is_empty() {
        return Err(ApiError::Validation(
            "at least one ASIN is required".to_string(),
        ));
    }

    let mut job = state
        .seller_store
        .get_seller_job(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("seller job {} not found", id)))?;
    if job.status != SellerStatus::AwaitingVariationSelection {
        return Err(ApiError::Conflict(format!(
            "cannot import variations while job is {:?}",
            job.status
        )));
    }

    job.status = SellerStatus::ImportingVariations;
    job.error_message = None;
    job.touch();
    if !state
        .seller_store
        .update_seller_job_if_status(&job, SellerStatus::AwaitingVariationSelection)
        .await?
    {
        return Err(ApiError::Conflict(
            "job status changed while starting variation import".to_string(),
        ));
    }

    let runner = state.seller_runner();
    state
        .spawner
        .spawn(job.id, runner.execute_variation_import(job.id, req.asins))
        .await;

    Ok(Json(job))
}
