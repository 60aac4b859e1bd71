//! Background execution for market-intelligence jobs.
//!
//! Runners persist after every sub-step so a crash or restart loses at most
//! the sub-step in flight, and a failed job can resume from what survived.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::JobSettings;
use crate::kernel::batch::Pacer;
use crate::kernel::store::ResearchJobStore;
use crate::kernel::traits::{BaseAnalysis, BaseProductApi};

use super::model::{ResearchJob, ResearchStatus, ANALYSIS_PHASES};
use super::state::ResumePlan;

const SYSTEM_PROMPT: &str = "You are an Amazon market analyst. Ground every \
claim in the customer data provided and answer in concise markdown.";

/// Cap on how much raw scrape data goes into a single prompt.
const PROMPT_DATA_LIMIT: usize = 12_000;

#[derive(Clone)]
pub struct ResearchRunner {
    pub store: Arc<dyn ResearchJobStore>,
    pub products: Arc<dyn BaseProductApi>,
    pub analysis: Arc<dyn BaseAnalysis>,
    pub settings: JobSettings,
}

impl ResearchRunner {
    /// Candidate discovery: keyword search, persist the shortlist, park the
    /// job at the selection gate.
    pub async fn execute_candidate_scrape(self, job_id: Uuid) {
        if let Err(e) = self.run_candidate_scrape(job_id).await {
            error!(job_id = %job_id, error = %e, "Candidate scrape failed");
            self.mark_failed(job_id, &e).await;
        }
    }

    /// Review/Q&A collection plus the four analysis phases, starting where
    /// `plan` says the previous attempt left off.
    pub async fn execute_analysis(self, job_id: Uuid, asins: Vec<String>, plan: ResumePlan) {
        if let Err(e) = self.run_analysis(job_id, &asins, plan).await {
            error!(job_id = %job_id, error = %e, "Analysis run failed");
            self.mark_failed(job_id, &e).await;
        }
    }

    async fn run_candidate_scrape(&self, job_id: Uuid) -> Result<()> {
        let mut job = self.load(job_id).await?;
        let query = job.keywords.join(" ");

        info!(job_id = %job_id, query = %query, "Scraping candidate products");
        let candidates = self
            .products
            .search_products(&query, &job.marketplace, job.max_competitors as usize)
            .await?;

        let found = candidates.len() as i32;
        job.candidates = Some(serde_json::to_value(&candidates)?);
        job.status = ResearchStatus::AwaitingSelection;
        job.progress.step = "candidate_scrape".to_string();
        job.progress.current = found;
        job.progress.total = found.max(job.progress.total);
        job.progress.message = format!("found {} candidate products", found);
        job.touch();
        self.store.update_research_job(&job).await?;
        Ok(())
    }

    async fn run_analysis(&self, job_id: Uuid, asins: &[String], plan: ResumePlan) -> Result<()> {
        let mut job = self.load(job_id).await?;

        // Total is scoped up front and never shrinks across resumes.
        let total = (asins.len() * 2 + ANALYSIS_PHASES.len()) as i32;
        job.progress.total = job.progress.total.max(total);

        if plan.collects_data() {
            job.progress.completed_phases.clear();
            job.phase_results = serde_json::json!({});
            self.collect_reviews(&mut job, asins).await?;
            self.collect_questions(&mut job, asins).await?;
        }

        let first_phase = plan.first_phase();
        let collected = (asins.len() * 2) as i32;
        for (idx, phase) in ANALYSIS_PHASES.iter().enumerate() {
            let number = idx + 1;
            if number < first_phase {
                continue;
            }

            info!(job_id = %job_id, phase = phase.key, "Running analysis phase");
            let prompt = build_phase_prompt(phase.label, &job);
            let output = self
                .analysis
                .complete(SYSTEM_PROMPT, &prompt)
                .await
                .with_context(|| format!("analysis phase {} failed", number))?;

            job.set_phase_result(phase.key, serde_json::Value::String(output));
            job.progress.completed_phases.push(phase.key.to_string());
            job.progress.step = phase.key.to_string();
            job.progress.current = collected + number as i32;
            job.progress.message = format!("analyzed {}", phase.label);
            job.touch();
            self.store.update_research_job(&job).await?;
        }

        job.status = ResearchStatus::Completed;
        job.progress.step = "done".to_string();
        job.progress.message = "analysis complete".to_string();
        job.touch();
        self.store.update_research_job(&job).await?;
        info!(job_id = %job_id, "Research job completed");
        Ok(())
    }

    async fn collect_reviews(&self, job: &mut ResearchJob, asins: &[String]) -> Result<()> {
        let mut pacer = Pacer::new(self.settings.scrape_delay());
        let mut reviews = serde_json::Map::new();

        job.progress.step = "review_collection".to_string();
        for (i, asin) in asins.iter().enumerate() {
            pacer.wait().await;
            let data = self
                .products
                .fetch_reviews(asin, &job.marketplace, job.reviews_per_product)
                .await
                .with_context(|| format!("review fetch failed for {}", asin))?;

            reviews.insert(asin.clone(), data);
            job.review_data = Some(serde_json::Value::Object(reviews.clone()));
            job.progress.current = (i + 1) as i32;
            job.progress.message = format!("collected reviews for {}", asin);
            job.touch();
            self.store.update_research_job(job).await?;
        }
        Ok(())
    }

    async fn collect_questions(&self, job: &mut ResearchJob, asins: &[String]) -> Result<()> {
        let mut pacer = Pacer::new(self.settings.scrape_delay());
        let mut questions = serde_json::Map::new();

        job.progress.step = "qa_collection".to_string();
        for (i, asin) in asins.iter().enumerate() {
            pacer.wait().await;
            let data = self
                .products
                .fetch_questions(asin, &job.marketplace)
                .await
                .with_context(|| format!("question fetch failed for {}", asin))?;

            questions.insert(asin.clone(), data);
            job.qa_data = Some(serde_json::Value::Object(questions.clone()));
            job.progress.current = (asins.len() + i + 1) as i32;
            job.progress.message = format!("collected questions for {}", asin);
            job.touch();
            self.store.update_research_job(job).await?;
        }
        Ok(())
    }

    async fn load(&self, job_id: Uuid) -> Result<ResearchJob> {
        self.store
            .get_research_job(job_id)
            .await?
            .with_context(|| format!("research job {} not found", job_id))
    }

    /// Terminal failure write. Progress stays as persisted so the next
    /// attempt can resume from it.
    async fn mark_failed(&self, job_id: Uuid, error: &anyhow::Error) {
        let result = async {
            let mut job = self.load(job_id).await?;
            job.status = ResearchStatus::Failed;
            job.error_message = Some(error.to_string());
            job.touch();
            self.store.update_research_job(&job).await
        }
        .await;

        if let Err(e) = result {
            error!(job_id = %job_id, error = %e, "Failed to persist job failure");
        }
    }
}

fn build_phase_prompt(label: &str, job: &ResearchJob) -> String {
    let mut prompt = format!(
        "Analyze the {} for products competing on: {}\nMarketplace: {}\n",
        label,
        job.keywords.join(", "),
        job.marketplace
    );

    prompt.push_str("\n## Customer reviews\n");
    prompt.push_str(&excerpt(job.review_data.as_ref()));
    prompt.push_str("\n## Customer questions\n");
    prompt.push_str(&excerpt(job.qa_data.as_ref()));

    if let Some(map) = job.phase_results.as_object() {
        if !map.is_empty() {
            prompt.push_str("\n## Earlier findings\n");
            for phase in &ANALYSIS_PHASES {
                if let Some(serde_json::Value::String(text)) = map.get(phase.key) {
                    prompt.push_str(&format!("### {}\n{}\n", phase.label, text));
                }
            }
        }
    }

    prompt
}

fn excerpt(data: Option<&serde_json::Value>) -> String {
    let mut text = match data {
        Some(v) => v.to_string(),
        None => return "(none collected)".to_string(),
    };
    if text.len() > PROMPT_DATA_LIMIT {
        // Truncate on a char boundary.
        let mut end = PROMPT_DATA_LIMIT;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_collected_data_and_prior_phases() {
        let mut job = ResearchJob::new(vec!["garlic press".into()], "US".into(), None, None, None);
        job.review_data = Some(serde_json::json!({"B01": ["solid build"]}));
        job.set_phase_result("phase_1", serde_json::json!("pain point: slips"));

        let prompt = build_phase_prompt("competitor positioning", &job);
        assert!(prompt.contains("garlic press"));
        assert!(prompt.contains("solid build"));
        assert!(prompt.contains("pain point: slips"));
    }

    #[test]
    fn excerpt_truncates_oversized_payloads() {
        let big = serde_json::Value::String("x".repeat(PROMPT_DATA_LIMIT * 2));
        assert_eq!(excerpt(Some(&big)).len(), PROMPT_DATA_LIMIT);
        assert_eq!(excerpt(None), "(none collected)");
    }
}
