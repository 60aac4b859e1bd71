//! Persistence seam for job records.
//!
//! Handlers and runners only see these traits; production wires the
//! Postgres-backed [`postgres::PgStore`], tests use [`memory::MemoryStore`].
//!
//! Stores write records verbatim. Callers own `updated_at` (via `touch`),
//! which keeps timestamp-sensitive logic like the watchdog and stale-claim
//! sweep testable.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domains::extraction::{ExtractionItem, ExtractionStatus, QaExtractionJob};
use crate::domains::research::{ResearchJob, ResearchStatus};
use crate::domains::seller::{SellerImportJob, SellerStatus};

#[async_trait]
pub trait ResearchJobStore: Send + Sync {
    async fn insert_research_job(&self, job: &ResearchJob) -> Result<()>;
    async fn get_research_job(&self, id: Uuid) -> Result<Option<ResearchJob>>;
    async fn update_research_job(&self, job: &ResearchJob) -> Result<()>;
    /// Conditional write: persists `job` only while the stored status still
    /// matches `expected`. Returns whether the write landed.
    async fn update_research_job_if_status(
        &self,
        job: &ResearchJob,
        expected: ResearchStatus,
    ) -> Result<bool>;
}

#[async_trait]
pub trait SellerJobStore: Send + Sync {
    async fn insert_seller_job(&self, job: &SellerImportJob) -> Result<()>;
    async fn get_seller_job(&self, id: Uuid) -> Result<Option<SellerImportJob>>;
    async fn update_seller_job(&self, job: &SellerImportJob) -> Result<()>;
    async fn update_seller_job_if_status(
        &self,
        job: &SellerImportJob,
        expected: SellerStatus,
    ) -> Result<bool>;
    /// Jobs currently in a background phase, for the periodic watchdog sweep.
    async fn list_background_seller_jobs(&self) -> Result<Vec<SellerImportJob>>;
}

#[async_trait]
pub trait ExtractionStore: Send + Sync {
    async fn insert_extraction_job(&self, job: &QaExtractionJob) -> Result<()>;
    async fn get_extraction_job(&self, id: Uuid) -> Result<Option<QaExtractionJob>>;
    async fn update_extraction_job(&self, job: &QaExtractionJob) -> Result<()>;
    async fn update_extraction_job_if_status(
        &self,
        job: &QaExtractionJob,
        expected: ExtractionStatus,
    ) -> Result<bool>;
    /// Jobs still accepting claims (`queued` or `processing`), oldest first,
    /// capped at `limit`.
    async fn list_active_extraction_jobs(&self, limit: i64) -> Result<Vec<QaExtractionJob>>;
    /// Atomic counter bump on the parent job. Returns the updated row so the
    /// caller sees the post-increment totals without a racy re-read.
    async fn increment_job_counters(
        &self,
        job_id: Uuid,
        completed: i32,
        failed: i32,
    ) -> Result<Option<QaExtractionJob>>;

    async fn insert_extraction_items(&self, items: &[ExtractionItem]) -> Result<()>;
    async fn get_extraction_item(&self, id: Uuid) -> Result<Option<ExtractionItem>>;
    /// Items for a job in position order.
    async fn list_items_for_job(&self, job_id: Uuid) -> Result<Vec<ExtractionItem>>;
    async fn update_extraction_item(&self, item: &ExtractionItem) -> Result<()>;
    /// The oldest pending item across `job_ids`. The id list must already be
    /// in oldest-job-first order; within a job, lowest position wins.
    async fn oldest_pending_item(&self, job_ids: &[Uuid]) -> Result<Option<ExtractionItem>>;
    /// Stale-claim sweep: processing items started before `cutoff` go back
    /// to pending. Returns how many were reset.
    async fn reset_stale_items(&self, cutoff: DateTime<Utc>) -> Result<u64>;
    /// Cancel support: every pending item of the job becomes skipped.
    async fn skip_pending_items(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<u64>;
}
