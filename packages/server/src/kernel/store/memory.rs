//! In-memory store used by the test suites.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domains::extraction::{ExtractionItem, ExtractionStatus, ItemStatus, QaExtractionJob};
use crate::domains::research::{ResearchJob, ResearchStatus};
use crate::domains::seller::{SellerImportJob, SellerStatus};

use super::{ExtractionStore, ResearchJobStore, SellerJobStore};

/// HashMap-backed implementation of all three store traits.
#[derive(Default)]
pub struct MemoryStore {
    research_jobs: RwLock<HashMap<Uuid, ResearchJob>>,
    seller_jobs: RwLock<HashMap<Uuid, SellerImportJob>>,
    extraction_jobs: RwLock<HashMap<Uuid, QaExtractionJob>>,
    extraction_items: RwLock<HashMap<Uuid, ExtractionItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResearchJobStore for MemoryStore {
    async fn insert_research_job(&self, job: &ResearchJob) -> Result<()> {
        self.research_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn get_research_job(&self, id: Uuid) -> Result<Option<ResearchJob>> {
        Ok(self
            .research_jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    async fn update_research_job(&self, job: &ResearchJob) -> Result<()> {
        self.research_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn update_research_job_if_status(
        &self,
        job: &ResearchJob,
        expected: ResearchStatus,
    ) -> Result<bool> {
        let mut jobs = self
            .research_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner());
        match jobs.get(&job.id) {
            Some(current) if current.status == expected => {
                jobs.insert(job.id, job.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl SellerJobStore for MemoryStore {
    async fn insert_seller_job(&self, job: &SellerImportJob) -> Result<()> {
        self.seller_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn get_seller_job(&self, id: Uuid) -> Result<Option<SellerImportJob>> {
        Ok(self
            .seller_jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    async fn update_seller_job(&self, job: &SellerImportJob) -> Result<()> {
        self.seller_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn update_seller_job_if_status(
        &self,
        job: &SellerImportJob,
        expected: SellerStatus,
    ) -> Result<bool> {
        let mut jobs = self.seller_jobs.write().unwrap_or_else(|e| e.into_inner());
        match jobs.get(&job.id) {
            Some(current) if current.status == expected => {
                jobs.insert(job.id, job.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_background_seller_jobs(&self) -> Result<Vec<SellerImportJob>> {
        let mut jobs: Vec<SellerImportJob> = self
            .seller_jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|j| j.status.is_background())
            .cloned()
            .collect();
        jobs.sort_by_key(|j| (j.updated_at, j.id));
        Ok(jobs)
    }
}

#[async_trait]
impl ExtractionStore for MemoryStore {
    async fn insert_extraction_job(&self, job: &QaExtractionJob) -> Result<()> {
        self.extraction_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn get_extraction_job(&self, id: Uuid) -> Result<Option<QaExtractionJob>> {
        Ok(self
            .extraction_jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    async fn update_extraction_job(&self, job: &QaExtractionJob) -> Result<()> {
        self.extraction_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job.clone());
        Ok(())
    }

    async fn update_extraction_job_if_status(
        &self,
        job: &QaExtractionJob,
        expected: ExtractionStatus,
    ) -> Result<bool> {
        let mut jobs = self
            .extraction_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner());
        match jobs.get(&job.id) {
            Some(current) if current.status == expected => {
                jobs.insert(job.id, job.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_active_extraction_jobs(&self, limit: i64) -> Result<Vec<QaExtractionJob>> {
        let mut jobs: Vec<QaExtractionJob> = self
            .extraction_jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|j| {
                matches!(
                    j.status,
                    ExtractionStatus::Queued | ExtractionStatus::Processing
                )
            })
            .cloned()
            .collect();
        jobs.sort_by_key(|j| (j.created_at, j.id));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn increment_job_counters(
        &self,
        job_id: Uuid,
        completed: i32,
        failed: i32,
    ) -> Result<Option<QaExtractionJob>> {
        let mut jobs = self
            .extraction_jobs
            .write()
            .unwrap_or_else(|e| e.into_inner());
        Ok(jobs.get_mut(&job_id).map(|job| {
            job.completed_items += completed;
            job.failed_items += failed;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn insert_extraction_items(&self, items: &[ExtractionItem]) -> Result<()> {
        let mut map = self
            .extraction_items
            .write()
            .unwrap_or_else(|e| e.into_inner());
        for item in items {
            map.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn get_extraction_item(&self, id: Uuid) -> Result<Option<ExtractionItem>> {
        Ok(self
            .extraction_items
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    async fn list_items_for_job(&self, job_id: Uuid) -> Result<Vec<ExtractionItem>> {
        let mut items: Vec<ExtractionItem> = self
            .extraction_items
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|i| i.job_id == job_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.position);
        Ok(items)
    }

    async fn update_extraction_item(&self, item: &ExtractionItem) -> Result<()> {
        self.extraction_items
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(item.id, item.clone());
        Ok(())
    }

    async fn oldest_pending_item(&self, job_ids: &[Uuid]) -> Result<Option<ExtractionItem>> {
        let items = self
            .extraction_items
            .read()
            .unwrap_or_else(|e| e.into_inner());
        for job_id in job_ids {
            let next = items
                .values()
                .filter(|i| i.job_id == *job_id && i.status == ItemStatus::Pending)
                .min_by_key(|i| i.position);
            if let Some(item) = next {
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    async fn reset_stale_items(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut items = self
            .extraction_items
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let mut reset = 0;
        for item in items.values_mut() {
            let stale = item.status == ItemStatus::Processing
                && item.started_at.map(|t| t < cutoff).unwrap_or(true);
            if stale {
                item.status = ItemStatus::Pending;
                item.started_at = None;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn skip_pending_items(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
        let mut items = self
            .extraction_items
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let mut skipped = 0;
        for item in items.values_mut() {
            if item.job_id == job_id && item.status == ItemStatus::Pending {
                item.status = ItemStatus::Skipped;
                item.completed_at = Some(now);
                skipped += 1;
            }
        }
        Ok(skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn conditional_update_checks_stored_status() {
        let store = MemoryStore::new();
        let mut job = QaExtractionJob::new("US".into(), 2, None);
        store.insert_extraction_job(&job).await.unwrap();

        job.status = ExtractionStatus::Processing;
        assert!(store
            .update_extraction_job_if_status(&job, ExtractionStatus::Queued)
            .await
            .unwrap());
        // Stored status is now processing; the same expectation fails.
        assert!(!store
            .update_extraction_job_if_status(&job, ExtractionStatus::Queued)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn counter_increments_accumulate() {
        let store = MemoryStore::new();
        let job = QaExtractionJob::new("US".into(), 5, None);
        store.insert_extraction_job(&job).await.unwrap();

        store.increment_job_counters(job.id, 1, 0).await.unwrap();
        store.increment_job_counters(job.id, 0, 1).await.unwrap();
        let updated = store
            .increment_job_counters(job.id, 1, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.completed_items, 2);
        assert_eq!(updated.failed_items, 1);
    }

    #[tokio::test]
    async fn oldest_pending_item_respects_job_order() {
        let store = MemoryStore::new();
        let old_job = QaExtractionJob::new("US".into(), 1, None);
        let new_job = QaExtractionJob::new("US".into(), 1, None);
        store.insert_extraction_job(&old_job).await.unwrap();
        store.insert_extraction_job(&new_job).await.unwrap();

        let old_item = ExtractionItem::new(old_job.id, "OLD".into(), 0);
        let new_item = ExtractionItem::new(new_job.id, "NEW".into(), 0);
        store
            .insert_extraction_items(&[new_item, old_item])
            .await
            .unwrap();

        let picked = store
            .oldest_pending_item(&[old_job.id, new_job.id])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.asin, "OLD");
    }

    #[tokio::test]
    async fn stale_reset_only_touches_old_claims() {
        let store = MemoryStore::new();
        let job_id = Uuid::new_v4();
        let now = Utc::now();

        let mut stale = ExtractionItem::new(job_id, "STALE".into(), 0);
        stale.status = ItemStatus::Processing;
        stale.started_at = Some(now - Duration::minutes(45));
        let mut fresh = ExtractionItem::new(job_id, "FRESH".into(), 1);
        fresh.status = ItemStatus::Processing;
        fresh.started_at = Some(now - Duration::minutes(5));
        store
            .insert_extraction_items(&[stale.clone(), fresh.clone()])
            .await
            .unwrap();

        let reset = store
            .reset_stale_items(now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(reset, 1);

        let stale = store.get_extraction_item(stale.id).await.unwrap().unwrap();
        assert_eq!(stale.status, ItemStatus::Pending);
        assert!(stale.started_at.is_none());
        let fresh = store.get_extraction_item(fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, ItemStatus::Processing);
    }
}
