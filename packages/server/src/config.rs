use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rainforest_api_key: String,
    pub openai_api_key: String,
    /// Shared bearer credential for the extraction worker (browser extension).
    pub worker_auth_token: String,
    pub settings: JobSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            rainforest_api_key: env::var("RAINFOREST_API_KEY")
                .context("RAINFOREST_API_KEY must be set")?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            worker_auth_token: env::var("WORKER_AUTH_TOKEN")
                .context("WORKER_AUTH_TOKEN must be set")?,
            settings: JobSettings::from_env()?,
        })
    }
}

/// Tunable parameters for the job subsystem. Every window and threshold can
/// be overridden from the environment.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Minutes before a claimed extraction item is considered abandoned.
    pub stale_claim_minutes: i64,
    /// Minutes before a seller job stuck in a background state is failed.
    pub watchdog_minutes: i64,
    /// Completed fraction at which a partially-failed extraction job is
    /// still declared fully completed.
    pub completion_threshold: f64,
    /// How many of the oldest active jobs a claim call considers.
    pub claim_job_window: usize,
    /// Fixed delay between successive scraping-API calls.
    pub scrape_delay_ms: u64,
    /// Concurrency window for bulk image generation.
    pub image_concurrency: usize,
    /// Per-claim work-size hint returned to the extraction worker.
    pub claim_batch_hint: i32,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            stale_claim_minutes: 30,
            watchdog_minutes: 30,
            completion_threshold: 0.70,
            claim_job_window: 5,
            scrape_delay_ms: 1_000,
            image_concurrency: 3,
            claim_batch_hint: 10,
        }
    }
}

impl JobSettings {
    /// Load tunables from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            stale_claim_minutes: parse_or(
                "STALE_CLAIM_MINUTES",
                defaults.stale_claim_minutes,
            )?,
            watchdog_minutes: parse_or("WATCHDOG_MINUTES", defaults.watchdog_minutes)?,
            completion_threshold: parse_or(
                "COMPLETION_THRESHOLD",
                defaults.completion_threshold,
            )?,
            claim_job_window: parse_or("CLAIM_JOB_WINDOW", defaults.claim_job_window)?,
            scrape_delay_ms: parse_or("SCRAPE_DELAY_MS", defaults.scrape_delay_ms)?,
            image_concurrency: parse_or("IMAGE_CONCURRENCY", defaults.image_concurrency)?,
            claim_batch_hint: parse_or("CLAIM_BATCH_HINT", defaults.claim_batch_hint)?,
        })
    }

    /// The cutoff before which a `processing` item claim counts as stale.
    pub fn stale_claim_cutoff(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> chrono::DateTime<chrono::Utc> {
        now - chrono::Duration::minutes(self.stale_claim_minutes)
    }

    /// The cutoff before which a background seller job counts as timed out.
    pub fn watchdog_cutoff(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> chrono::DateTime<chrono::Utc> {
        now - chrono::Duration::minutes(self.watchdog_minutes)
    }

    pub fn scrape_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.scrape_delay_ms)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}
