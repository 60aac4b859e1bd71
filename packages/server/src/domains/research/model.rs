//! Market-intelligence job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Competitor-count bounds accepted when creating a job.
pub const MAX_COMPETITORS_RANGE: std::ops::RangeInclusive<i32> = 1..=10;
/// Reviews-per-product bounds accepted when creating a job.
pub const REVIEWS_PER_PRODUCT_RANGE: std::ops::RangeInclusive<i32> = 10..=100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "research_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    #[default]
    Pending,
    AwaitingSelection,
    Analyzing,
    Completed,
    CompletedPartial,
    Failed,
}

impl ResearchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResearchStatus::Completed | ResearchStatus::CompletedPartial | ResearchStatus::Failed
        )
    }
}

/// Monotonic progress snapshot persisted after every sub-step.
///
/// `total` is fixed once the work is scoped and never shrinks;
/// `completed_phases` only grows within one non-restarted attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JobProgress {
    pub step: String,
    pub current: i32,
    pub total: i32,
    pub message: String,
    #[serde(default)]
    pub completed_phases: Vec<String>,
}

/// One of the four discrete LLM analysis phases, in execution order.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisPhase {
    /// Result key ("phase_1" .. "phase_4"), also the completed-phases marker.
    pub key: &'static str,
    pub label: &'static str,
}

pub const ANALYSIS_PHASES: [AnalysisPhase; 4] = [
    AnalysisPhase {
        key: "phase_1",
        label: "customer pain points",
    },
    AnalysisPhase {
        key: "phase_2",
        label: "competitor positioning",
    },
    AnalysisPhase {
        key: "phase_3",
        label: "improvement opportunities",
    },
    AnalysisPhase {
        key: "phase_4",
        label: "listing strategy",
    },
];

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ResearchJob {
    pub id: Uuid,
    pub status: ResearchStatus,

    // Request payload
    pub keywords: Vec<String>,
    pub marketplace: String,
    pub max_competitors: i32,
    pub reviews_per_product: i32,

    // Candidate shortlist from the initial scrape
    pub candidates: Option<serde_json::Value>,
    // ASINs chosen for deep analysis
    pub selected_asins: Option<Vec<String>>,

    // Accumulated results, kept across failed attempts for resume
    pub review_data: Option<serde_json::Value>,
    pub qa_data: Option<serde_json::Value>,
    pub phase_results: serde_json::Value,

    #[sqlx(json)]
    pub progress: JobProgress,

    pub error_message: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResearchJob {
    pub fn new(
        keywords: Vec<String>,
        marketplace: String,
        max_competitors: Option<i32>,
        reviews_per_product: Option<i32>,
        created_by: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: ResearchStatus::Pending,
            keywords,
            marketplace,
            max_competitors: max_competitors
                .unwrap_or(5)
                .clamp(*MAX_COMPETITORS_RANGE.start(), *MAX_COMPETITORS_RANGE.end()),
            reviews_per_product: reviews_per_product.unwrap_or(50).clamp(
                *REVIEWS_PER_PRODUCT_RANGE.start(),
                *REVIEWS_PER_PRODUCT_RANGE.end(),
            ),
            candidates: None,
            selected_asins: None,
            review_data: None,
            qa_data: None,
            phase_results: serde_json::json!({}),
            progress: JobProgress::default(),
            error_message: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_phase_result(&mut self, key: &str, output: serde_json::Value) {
        if let Some(map) = self.phase_results.as_object_mut() {
            map.insert(key.to_string(), output);
        } else {
            self.phase_results = serde_json::json!({ key: output });
        }
    }
}
