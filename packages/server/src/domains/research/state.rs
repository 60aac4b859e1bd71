//! Selection gating and resume planning for analysis jobs.

use thiserror::Error;

use super::model::{ResearchJob, ResearchStatus};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot start analysis while the job is {0:?}")]
    SelectionNotAllowed(ResearchStatus),
    #[error("no product selection supplied and none persisted from an earlier attempt")]
    MissingSelection,
}

/// Analysis may be triggered from the selection gate or retried after a
/// failure. Every other status rejects the request without mutating the job.
pub fn can_select(status: ResearchStatus) -> bool {
    matches!(
        status,
        ResearchStatus::AwaitingSelection | ResearchStatus::Failed
    )
}

/// Resolve the ASIN list for an analysis attempt. An explicit request body
/// wins; a retry without one falls back to the persisted selection.
pub fn resolve_selection(
    requested: Option<Vec<String>>,
    persisted: Option<&Vec<String>>,
) -> Result<Vec<String>, StateError> {
    match requested {
        Some(asins) if !asins.is_empty() => Ok(asins),
        _ => persisted
            .filter(|p| !p.is_empty())
            .cloned()
            .ok_or(StateError::MissingSelection),
    }
}

/// Where a (re)started analysis attempt picks up, derived from what the
/// previous attempt managed to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Nothing usable survived; collect reviews and questions again.
    RestartReviews,
    /// Collected data survived but no phase finished; run all phases.
    FromAnalysis,
    /// Skip the named number of finished phases (1-based first phase to run).
    FromPhase(usize),
}

impl ResumePlan {
    /// Collected data is persisted item by item, so a failed attempt may
    /// leave a partial map behind. Collection only counts as finished when
    /// every ASIN of this attempt is covered in both maps.
    pub fn for_job(job: &ResearchJob, asins: &[String]) -> Self {
        let collected = covers(job.review_data.as_ref(), asins)
            && covers(job.qa_data.as_ref(), asins);
        let phases_done = job.progress.completed_phases.len();
        if collected && phases_done > 0 {
            ResumePlan::FromPhase(phases_done + 1)
        } else if collected {
            ResumePlan::FromAnalysis
        } else {
            ResumePlan::RestartReviews
        }
    }

    /// 1-based index of the first phase this attempt executes.
    pub fn first_phase(&self) -> usize {
        match self {
            ResumePlan::FromPhase(n) => *n,
            _ => 1,
        }
    }

    /// Whether this attempt re-collects reviews and questions.
    pub fn collects_data(&self) -> bool {
        matches!(self, ResumePlan::RestartReviews)
    }
}

fn covers(data: Option<&serde_json::Value>, asins: &[String]) -> bool {
    match data.and_then(|v| v.as_object()) {
        Some(map) => asins.iter().all(|a| map.contains_key(a)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ResearchJob {
        ResearchJob::new(vec!["kw".into()], "US".into(), None, None, None)
    }

    #[test]
    fn selection_allowed_only_from_gate_or_failure() {
        assert!(can_select(ResearchStatus::AwaitingSelection));
        assert!(can_select(ResearchStatus::Failed));
        assert!(!can_select(ResearchStatus::Pending));
        assert!(!can_select(ResearchStatus::Analyzing));
        assert!(!can_select(ResearchStatus::Completed));
    }

    #[test]
    fn explicit_selection_wins_over_persisted() {
        let persisted = vec!["OLD".to_string()];
        let asins = resolve_selection(Some(vec!["NEW".into()]), Some(&persisted)).unwrap();
        assert_eq!(asins, vec!["NEW".to_string()]);
    }

    #[test]
    fn retry_falls_back_to_persisted_selection() {
        let persisted = vec!["A1".to_string(), "A2".to_string()];
        let asins = resolve_selection(None, Some(&persisted)).unwrap();
        assert_eq!(asins, persisted);
    }

    #[test]
    fn missing_selection_is_rejected() {
        assert!(matches!(
            resolve_selection(None, None),
            Err(StateError::MissingSelection)
        ));
        assert!(matches!(
            resolve_selection(Some(vec![]), None),
            Err(StateError::MissingSelection)
        ));
    }

    #[test]
    fn plan_restarts_without_collected_data() {
        let mut j = job();
        // Completed phases without collected data cannot be trusted.
        j.progress.completed_phases = vec!["phase_1".into()];
        let asins = vec!["B01".to_string()];
        assert_eq!(ResumePlan::for_job(&j, &asins), ResumePlan::RestartReviews);
    }

    #[test]
    fn plan_restarts_when_collection_was_partial() {
        let mut j = job();
        j.review_data = Some(serde_json::json!({"B01": []}));
        j.qa_data = Some(serde_json::json!({"B01": []}));
        let asins = vec!["B01".to_string(), "B02".to_string()];
        assert_eq!(ResumePlan::for_job(&j, &asins), ResumePlan::RestartReviews);
    }

    #[test]
    fn plan_skips_collection_when_data_survived() {
        let mut j = job();
        j.review_data = Some(serde_json::json!({"B01": []}));
        j.qa_data = Some(serde_json::json!({"B01": []}));
        let asins = vec!["B01".to_string()];
        assert_eq!(ResumePlan::for_job(&j, &asins), ResumePlan::FromAnalysis);
    }

    #[test]
    fn plan_resumes_after_last_finished_phase() {
        let mut j = job();
        j.review_data = Some(serde_json::json!({"B01": []}));
        j.qa_data = Some(serde_json::json!({"B01": []}));
        j.progress.completed_phases = vec!["phase_1".into(), "phase_2".into()];
        let asins = vec!["B01".to_string()];
        let plan = ResumePlan::for_job(&j, &asins);
        assert_eq!(plan, ResumePlan::FromPhase(3));
        assert_eq!(plan.first_phase(), 3);
        assert!(!plan.collects_data());
    }
}
