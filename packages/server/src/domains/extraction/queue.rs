//! Pull-based claim/report protocol for external extraction workers.
//!
//! Workers poll for the oldest pending item, process it off-box, then report
//! the outcome. The server owns all state transitions; a claim that never
//! reports back is swept lazily on the next claim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::JobSettings;
use crate::kernel::store::ExtractionStore;

use super::model::{final_status, ExtractionStatus, ItemStatus, QaExtractionJob};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("extraction job {0} not found")]
    JobNotFound(Uuid),
    #[error("extraction item {0} not found")]
    ItemNotFound(Uuid),
    #[error("extraction job {0} is already {1:?}")]
    AlreadyTerminal(Uuid, ExtractionStatus),
    #[error("extraction item {0} was already reported")]
    AlreadyReported(Uuid),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Work handed to a polling worker.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimedWork {
    pub item_id: Uuid,
    pub job_id: Uuid,
    pub asin: String,
    pub marketplace: String,
    /// How many questions the worker should pull per item.
    pub batch_hint: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Completed,
    Failed,
    Skipped,
}

/// Claim the next pending item, oldest job first, oldest item within it.
///
/// Stale claims are swept before selection so items abandoned by a dead
/// worker become claimable again. Fairness is bounded: only the oldest
/// active jobs (up to the configured window) are considered.
pub async fn claim_next(
    store: &dyn ExtractionStore,
    settings: &JobSettings,
    now: DateTime<Utc>,
) -> Result<Option<ClaimedWork>, QueueError> {
    let reclaimed = store
        .reset_stale_items(settings.stale_claim_cutoff(now))
        .await?;
    if reclaimed > 0 {
        info!(count = reclaimed, "Reset stale extraction claims");
    }

    let jobs = store
        .list_active_extraction_jobs(settings.claim_job_window as i64)
        .await?;
    if jobs.is_empty() {
        return Ok(None);
    }

    let job_ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
    let Some(mut item) = store.oldest_pending_item(&job_ids).await? else {
        return Ok(None);
    };

    item.status = ItemStatus::Processing;
    item.started_at = Some(now);
    store.update_extraction_item(&item).await?;

    let job = jobs
        .into_iter()
        .find(|j| j.id == item.job_id)
        .ok_or(QueueError::JobNotFound(item.job_id))?;

    // First claim moves the job out of the queue.
    if job.status == ExtractionStatus::Queued {
        let mut processing = job.clone();
        processing.status = ExtractionStatus::Processing;
        processing.touch();
        store
            .update_extraction_job_if_status(&processing, ExtractionStatus::Queued)
            .await?;
    }

    info!(job_id = %job.id, item_id = %item.id, asin = %item.asin, "Claimed extraction item");
    Ok(Some(ClaimedWork {
        item_id: item.id,
        job_id: job.id,
        asin: item.asin,
        marketplace: job.marketplace,
        batch_hint: settings.claim_batch_hint,
    }))
}

/// Record a worker's outcome for a claimed item and roll the parent job's
/// counters forward. Counter updates are atomic in the store, so concurrent
/// reports for sibling items never lose increments.
pub async fn report(
    store: &dyn ExtractionStore,
    settings: &JobSettings,
    item_id: Uuid,
    outcome: ItemOutcome,
    questions_extracted: Option<i32>,
    error_message: Option<String>,
    now: DateTime<Utc>,
) -> Result<QaExtractionJob, QueueError> {
    let mut item = store
        .get_extraction_item(item_id)
        .await?
        .ok_or(QueueError::ItemNotFound(item_id))?;
    if item.status.is_terminal() {
        return Err(QueueError::AlreadyReported(item_id));
    }

    item.status = match outcome {
        ItemOutcome::Completed => ItemStatus::Completed,
        ItemOutcome::Failed => ItemStatus::Failed,
        ItemOutcome::Skipped => ItemStatus::Skipped,
    };
    item.completed_at = Some(now);
    item.questions_extracted = questions_extracted;
    item.error_message = error_message;
    store.update_extraction_item(&item).await?;

    let (completed, failed) = match outcome {
        ItemOutcome::Completed => (1, 0),
        ItemOutcome::Failed => (0, 1),
        ItemOutcome::Skipped => (0, 0),
    };
    let job = store
        .increment_job_counters(item.job_id, completed, failed)
        .await?
        .ok_or(QueueError::JobNotFound(item.job_id))?;

    // Skipped items count toward neither counter, so completion is judged
    // on the items themselves rather than the tallies.
    let items = store.list_items_for_job(item.job_id).await?;
    let all_reported = items.iter().all(|i| i.status.is_terminal());

    if !job.status.is_terminal() && all_reported {
        let mut finished = job.clone();
        finished.status = final_status(job.completed_items, job.total_items, settings.completion_threshold);
        finished.touch();
        // A concurrent cancel wins; only land the terminal status if the
        // job is still where we saw it.
        if store
            .update_extraction_job_if_status(&finished, job.status)
            .await?
        {
            info!(job_id = %finished.id, status = ?finished.status, "Extraction job finished");
            return Ok(finished);
        }
    }

    Ok(job)
}

/// Cancel a job: pending items are skipped, the job lands on `cancelled`.
/// Items already claimed may still report; their outcome is recorded but
/// the job status no longer changes.
pub async fn cancel(
    store: &dyn ExtractionStore,
    job_id: Uuid,
    now: DateTime<Utc>,
) -> Result<QaExtractionJob, QueueError> {
    let mut job = store
        .get_extraction_job(job_id)
        .await?
        .ok_or(QueueError::JobNotFound(job_id))?;
    if job.status.is_terminal() {
        return Err(QueueError::AlreadyTerminal(job_id, job.status));
    }

    let skipped = store.skip_pending_items(job_id, now).await?;
    job.status = ExtractionStatus::Cancelled;
    job.touch();
    store.update_extraction_job(&job).await?;

    info!(job_id = %job_id, skipped, "Extraction job cancelled");
    Ok(job)
}
