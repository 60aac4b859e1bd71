//! Q&A extraction queue records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "extraction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    #[default]
    Queued,
    Processing,
    Completed,
    CompletedPartial,
    Cancelled,
}

impl ExtractionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExtractionStatus::Completed
                | ExtractionStatus::CompletedPartial
                | ExtractionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "extraction_item_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Skipped
        )
    }
}

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct QaExtractionJob {
    pub id: Uuid,
    pub status: ExtractionStatus,
    pub marketplace: String,
    pub total_items: i32,
    pub completed_items: i32,
    pub failed_items: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QaExtractionJob {
    pub fn new(marketplace: String, total_items: i32, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: ExtractionStatus::Queued,
            marketplace,
            total_items,
            completed_items: 0,
            failed_items: 0,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionItem {
    pub id: Uuid,
    pub job_id: Uuid,
    pub asin: String,
    /// Creation order within the job; claims hand out the lowest first.
    pub position: i32,
    pub status: ItemStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub questions_extracted: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExtractionItem {
    pub fn new(job_id: Uuid, asin: String, position: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            asin,
            position,
            status: ItemStatus::Pending,
            started_at: None,
            completed_at: None,
            questions_extracted: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

/// Build the item rows for a new job, one per ASIN in request order.
pub fn build_items(job_id: Uuid, asins: &[String]) -> Vec<ExtractionItem> {
    asins
        .iter()
        .enumerate()
        .map(|(i, asin)| ExtractionItem::new(job_id, asin.clone(), i as i32))
        .collect()
}

/// Terminal status for a fully reported job: completed when the success
/// ratio meets the threshold, otherwise completed with partial results.
pub fn final_status(completed: i32, total: i32, threshold: f64) -> ExtractionStatus {
    if total > 0 && f64::from(completed) / f64::from(total) >= threshold {
        ExtractionStatus::Completed
    } else {
        ExtractionStatus::CompletedPartial
    }
}
