//! Seller catalog import job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "seller_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SellerStatus {
    /// Created; catalog shown to the user, waiting for an import request.
    #[default]
    Pulled,
    Importing,
    Scraping,
    AwaitingVariationSelection,
    ImportingVariations,
    Done,
    Failed,
}

impl SellerStatus {
    /// States driven by a background runner, and therefore subject to the
    /// stalled-job watchdog.
    pub fn is_background(&self) -> bool {
        matches!(
            self,
            SellerStatus::Importing | SellerStatus::Scraping | SellerStatus::ImportingVariations
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SellerStatus::Done | SellerStatus::Failed)
    }
}

/// Per-batch import accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImportResult {
    pub imported: i32,
    pub skipped: i32,
    pub errored: i32,
}

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct SellerImportJob {
    pub id: Uuid,
    pub status: SellerStatus,
    pub seller_id: String,
    pub marketplace: String,

    /// ASINs the user picked for import.
    pub selections: Option<Vec<String>>,
    /// Variation ASINs discovered while scraping, offered for a second pick.
    pub variation_candidates: Option<Vec<String>>,

    pub import_result: Option<serde_json::Value>,
    pub variation_result: Option<serde_json::Value>,

    pub error_message: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SellerImportJob {
    pub fn new(seller_id: String, marketplace: String, created_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: SellerStatus::Pulled,
            seller_id,
            marketplace,
            selections: None,
            variation_candidates: None,
            import_result: None,
            variation_result: None,
            error_message: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn import_result(&self) -> Option<ImportResult> {
        self.import_result
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_import_result(&mut self, result: &ImportResult) -> anyhow::Result<()> {
        self.import_result = Some(serde_json::to_value(result)?);
        Ok(())
    }

    pub fn set_variation_result(&mut self, result: &ImportResult) -> anyhow::Result<()> {
        self.variation_result = Some(serde_json::to_value(result)?);
        Ok(())
    }
}

/// Watchdog check: a job stuck in a background state with no persisted
/// progress since `cutoff` is declared failed. Returns the failed copy to
/// write back, or `None` if the job is healthy.
pub fn sweep_timed_out(
    job: &SellerImportJob,
    now: DateTime<Utc>,
    watchdog_minutes: i64,
) -> Option<SellerImportJob> {
    let cutoff = now - chrono::Duration::minutes(watchdog_minutes);
    if !job.status.is_background() || job.updated_at >= cutoff {
        return None;
    }

    let mut failed = job.clone();
    failed.status = SellerStatus::Failed;
    failed.error_message = Some(format!(
        "Job timed out: no progress for over {} minutes",
        watchdog_minutes
    ));
    failed.updated_at = now;
    Some(failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> SellerImportJob {
        SellerImportJob::new("A1SELLER".into(), "US".into(), None)
    }

    #[test]
    fn import_result_round_trips_through_json() {
        let mut j = job();
        let result = ImportResult {
            imported: 3,
            skipped: 1,
            errored: 0,
        };
        j.set_import_result(&result).unwrap();
        assert_eq!(j.import_result(), Some(result));
    }

    #[test]
    fn watchdog_fails_stalled_background_job() {
        let mut j = job();
        j.status = SellerStatus::Scraping;
        let now = Utc::now();
        j.updated_at = now - chrono::Duration::minutes(31);

        let swept = sweep_timed_out(&j, now, 30).unwrap();
        assert_eq!(swept.status, SellerStatus::Failed);
        assert!(swept.error_message.unwrap().contains("timed out"));
    }

    #[test]
    fn watchdog_ignores_recent_and_foreground_jobs() {
        let now = Utc::now();

        let mut recent = job();
        recent.status = SellerStatus::Importing;
        recent.updated_at = now - chrono::Duration::minutes(5);
        assert!(sweep_timed_out(&recent, now, 30).is_none());

        let mut waiting = job();
        waiting.status = SellerStatus::AwaitingVariationSelection;
        waiting.updated_at = now - chrono::Duration::hours(2);
        assert!(sweep_timed_out(&waiting, now, 30).is_none());
    }
}
