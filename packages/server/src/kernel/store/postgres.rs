//! Postgres-backed job store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::extraction::{ExtractionItem, ExtractionStatus, QaExtractionJob};
use crate::domains::research::{ResearchJob, ResearchStatus};
use crate::domains::seller::{SellerImportJob, SellerStatus};

use super::{ExtractionStore, ResearchJobStore, SellerJobStore};

const RESEARCH_COLUMNS: &str = "id, status, keywords, marketplace, max_competitors, \
     reviews_per_product, candidates, selected_asins, review_data, qa_data, \
     phase_results, progress, error_message, created_by, created_at, updated_at";

const SELLER_COLUMNS: &str = "id, status, seller_id, marketplace, selections, \
     variation_candidates, import_result, variation_result, error_message, \
     created_by, created_at, updated_at";

const EXTRACTION_JOB_COLUMNS: &str = "id, status, marketplace, total_items, \
     completed_items, failed_items, created_by, created_at, updated_at";

const EXTRACTION_ITEM_COLUMNS: &str = "id, job_id, asin, \"position\", status, \
     started_at, completed_at, questions_extracted, error_message, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResearchJobStore for PgStore {
    async fn insert_research_job(&self, job: &ResearchJob) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO research_jobs ({RESEARCH_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(job.id)
        .bind(job.status)
        .bind(&job.keywords)
        .bind(&job.marketplace)
        .bind(job.max_competitors)
        .bind(job.reviews_per_product)
        .bind(&job.candidates)
        .bind(&job.selected_asins)
        .bind(&job.review_data)
        .bind(&job.qa_data)
        .bind(&job.phase_results)
        .bind(serde_json::to_value(&job.progress)?)
        .bind(&job.error_message)
        .bind(job.created_by)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert research job")?;
        Ok(())
    }

    async fn get_research_job(&self, id: Uuid) -> Result<Option<ResearchJob>> {
        let job = sqlx::query_as::<_, ResearchJob>(&format!(
            "SELECT {RESEARCH_COLUMNS} FROM research_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch research job")?;
        Ok(job)
    }

    async fn update_research_job(&self, job: &ResearchJob) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE research_jobs
            SET status = $2, candidates = $3, selected_asins = $4, review_data = $5,
                qa_data = $6, phase_results = $7, progress = $8, error_message = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.candidates)
        .bind(&job.selected_asins)
        .bind(&job.review_data)
        .bind(&job.qa_data)
        .bind(&job.phase_results)
        .bind(serde_json::to_value(&job.progress)?)
        .bind(&job.error_message)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to update research job")?;
        Ok(())
    }

    async fn update_research_job_if_status(
        &self,
        job: &ResearchJob,
        expected: ResearchStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE research_jobs
            SET status = $2, candidates = $3, selected_asins = $4, review_data = $5,
                qa_data = $6, phase_results = $7, progress = $8, error_message = $9,
                updated_at = $10
            WHERE id = $1 AND status = $11
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.candidates)
        .bind(&job.selected_asins)
        .bind(&job.review_data)
        .bind(&job.qa_data)
        .bind(&job.phase_results)
        .bind(serde_json::to_value(&job.progress)?)
        .bind(&job.error_message)
        .bind(job.updated_at)
        .bind(expected)
        .execute(&self.pool)
        .await
        .context("Failed to update research job")?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SellerJobStore for PgStore {
    async fn insert_seller_job(&self, job: &SellerImportJob) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO seller_import_jobs ({SELLER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(job.id)
        .bind(job.status)
        .bind(&job.seller_id)
        .bind(&job.marketplace)
        .bind(&job.selections)
        .bind(&job.variation_candidates)
        .bind(&job.import_result)
        .bind(&job.variation_result)
        .bind(&job.error_message)
        .bind(job.created_by)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert seller job")?;
        Ok(())
    }

    async fn get_seller_job(&self, id: Uuid) -> Result<Option<SellerImportJob>> {
        let job = sqlx::query_as::<_, SellerImportJob>(&format!(
            "SELECT {SELLER_COLUMNS} FROM seller_import_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch seller job")?;
        Ok(job)
    }

    async fn update_seller_job(&self, job: &SellerImportJob) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE seller_import_jobs
            SET status = $2, selections = $3, variation_candidates = $4,
                import_result = $5, variation_result = $6, error_message = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.selections)
        .bind(&job.variation_candidates)
        .bind(&job.import_result)
        .bind(&job.variation_result)
        .bind(&job.error_message)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to update seller job")?;
        Ok(())
    }

    async fn update_seller_job_if_status(
        &self,
        job: &SellerImportJob,
        expected: SellerStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE seller_import_jobs
            SET status = $2, selections = $3, variation_candidates = $4,
                import_result = $5, variation_result = $6, error_message = $7,
                updated_at = $8
            WHERE id = $1 AND status = $9
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.selections)
        .bind(&job.variation_candidates)
        .bind(&job.import_result)
        .bind(&job.variation_result)
        .bind(&job.error_message)
        .bind(job.updated_at)
        .bind(expected)
        .execute(&self.pool)
        .await
        .context("Failed to update seller job")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_background_seller_jobs(&self) -> Result<Vec<SellerImportJob>> {
        let jobs = sqlx::query_as::<_, SellerImportJob>(&format!(
            "SELECT {SELLER_COLUMNS} FROM seller_import_jobs \
             WHERE status IN ('importing', 'scraping', 'importing_variations') \
             ORDER BY updated_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list background seller jobs")?;
        Ok(jobs)
    }
}

#[async_trait]
impl ExtractionStore for PgStore {
    async fn insert_extraction_job(&self, job: &QaExtractionJob) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO extraction_jobs ({EXTRACTION_JOB_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(job.id)
        .bind(job.status)
        .bind(&job.marketplace)
        .bind(job.total_items)
        .bind(job.completed_items)
        .bind(job.failed_items)
        .bind(job.created_by)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert extraction job")?;
        Ok(())
    }

    async fn get_extraction_job(&self, id: Uuid) -> Result<Option<QaExtractionJob>> {
        let job = sqlx::query_as::<_, QaExtractionJob>(&format!(
            "SELECT {EXTRACTION_JOB_COLUMNS} FROM extraction_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch extraction job")?;
        Ok(job)
    }

    async fn update_extraction_job(&self, job: &QaExtractionJob) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = $2, completed_items = $3, failed_items = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(job.completed_items)
        .bind(job.failed_items)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to update extraction job")?;
        Ok(())
    }

    async fn update_extraction_job_if_status(
        &self,
        job: &QaExtractionJob,
        expected: ExtractionStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE extraction_jobs
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(job.id)
        .bind(job.status)
        .bind(job.updated_at)
        .bind(expected)
        .execute(&self.pool)
        .await
        .context("Failed to update extraction job")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_active_extraction_jobs(&self, limit: i64) -> Result<Vec<QaExtractionJob>> {
        let jobs = sqlx::query_as::<_, QaExtractionJob>(&format!(
            "SELECT {EXTRACTION_JOB_COLUMNS} FROM extraction_jobs \
             WHERE status IN ('queued', 'processing') \
             ORDER BY created_at ASC \
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list active extraction jobs")?;
        Ok(jobs)
    }

    async fn increment_job_counters(
        &self,
        job_id: Uuid,
        completed: i32,
        failed: i32,
    ) -> Result<Option<QaExtractionJob>> {
        let job = sqlx::query_as::<_, QaExtractionJob>(&format!(
            "UPDATE extraction_jobs \
             SET completed_items = completed_items + $2, \
                 failed_items = failed_items + $3, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {EXTRACTION_JOB_COLUMNS}"
        ))
        .bind(job_id)
        .bind(completed)
        .bind(failed)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to increment extraction job counters")?;
        Ok(job)
    }

    async fn insert_extraction_items(&self, items: &[ExtractionItem]) -> Result<()> {
        for item in items {
            sqlx::query(&format!(
                "INSERT INTO extraction_items ({EXTRACTION_ITEM_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
            ))
            .bind(item.id)
            .bind(item.job_id)
            .bind(&item.asin)
            .bind(item.position)
            .bind(item.status)
            .bind(item.started_at)
            .bind(item.completed_at)
            .bind(item.questions_extracted)
            .bind(&item.error_message)
            .bind(item.created_at)
            .execute(&self.pool)
            .await
            .context("Failed to insert extraction item")?;
        }
        Ok(())
    }

    async fn get_extraction_item(&self, id: Uuid) -> Result<Option<ExtractionItem>> {
        let item = sqlx::query_as::<_, ExtractionItem>(&format!(
            "SELECT {EXTRACTION_ITEM_COLUMNS} FROM extraction_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch extraction item")?;
        Ok(item)
    }

    async fn list_items_for_job(&self, job_id: Uuid) -> Result<Vec<ExtractionItem>> {
        let items = sqlx::query_as::<_, ExtractionItem>(&format!(
            "SELECT {EXTRACTION_ITEM_COLUMNS} FROM extraction_items \
             WHERE job_id = $1 ORDER BY \"position\" ASC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list extraction items")?;
        Ok(items)
    }

    async fn update_extraction_item(&self, item: &ExtractionItem) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE extraction_items
            SET status = $2, started_at = $3, completed_at = $4,
                questions_extracted = $5, error_message = $6
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.status)
        .bind(item.started_at)
        .bind(item.completed_at)
        .bind(item.questions_extracted)
        .bind(&item.error_message)
        .execute(&self.pool)
        .await
        .context("Failed to update extraction item")?;
        Ok(())
    }

    async fn oldest_pending_item(&self, job_ids: &[Uuid]) -> Result<Option<ExtractionItem>> {
        let item = sqlx::query_as::<_, ExtractionItem>(
            r#"
            SELECT i.id, i.job_id, i.asin, i."position", i.status, i.started_at,
                   i.completed_at, i.questions_extracted, i.error_message, i.created_at
            FROM extraction_items i
            JOIN extraction_jobs j ON j.id = i.job_id
            WHERE i.status = 'pending' AND i.job_id = ANY($1)
            ORDER BY j.created_at ASC, i."position" ASC
            LIMIT 1
            "#,
        )
        .bind(job_ids)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to select next extraction item")?;
        Ok(item)
    }

    async fn reset_stale_items(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE extraction_items
            SET status = 'pending', started_at = NULL
            WHERE status = 'processing' AND started_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to reset stale extraction claims")?;
        Ok(result.rows_affected())
    }

    async fn skip_pending_items(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE extraction_items
            SET status = 'skipped', completed_at = $2
            WHERE job_id = $1 AND status = 'pending'
            "#,
        )
        .bind(job_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to skip pending extraction items")?;
        Ok(result.rows_affected())
    }
}
