//! Periodic watchdog for stalled seller-import jobs.
//!
//! The GET handler already sweeps lazily on read; this loop catches jobs
//! nobody is polling so they still fail within the timeout window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::JobSettings;
use crate::domains::seller::sweep_timed_out;
use crate::kernel::store::SellerJobStore;

pub struct WatchdogSweeper {
    store: Arc<dyn SellerJobStore>,
    settings: JobSettings,
    interval: Duration,
    shutdown: CancellationToken,
}

impl WatchdogSweeper {
    pub fn new(
        store: Arc<dyn SellerJobStore>,
        settings: JobSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            settings,
            interval: Duration::from_secs(60),
            shutdown,
        }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Watchdog sweeper started");
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep_once().await {
                            error!(error = %e, "Watchdog sweep failed");
                        }
                    }
                    _ = self.shutdown.cancelled() => {
                        info!("Watchdog sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    async fn sweep_once(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        for job in self.store.list_background_seller_jobs().await? {
            if let Some(failed) = sweep_timed_out(&job, now, self.settings.watchdog_minutes) {
                warn!(job_id = %job.id, status = ?job.status, "Failing stalled seller job");
                // Conditional write: a job that made progress since the
                // listing keeps its new state.
                self.store
                    .update_seller_job_if_status(&failed, job.status)
                    .await?;
            }
        }
        Ok(())
    }
}
