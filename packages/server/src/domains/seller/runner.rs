//! Background execution for seller catalog imports.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::JobSettings;
use crate::kernel::batch::{join_settled, Pacer};
use crate::kernel::store::SellerJobStore;
use crate::kernel::traits::{BaseImageGen, BaseProductApi};

use super::model::{ImportResult, SellerImportJob, SellerStatus};

#[derive(Clone)]
pub struct SellerRunner {
    pub store: Arc<dyn SellerJobStore>,
    pub products: Arc<dyn BaseProductApi>,
    pub images: Arc<dyn BaseImageGen>,
    pub settings: JobSettings,
}

impl SellerRunner {
    /// Import the selected ASINs, scrape each one, then park the job at the
    /// variation selection gate.
    pub async fn execute_import(self, job_id: Uuid, selections: Vec<String>) {
        if let Err(e) = self.run_import(job_id, selections).await {
            error!(job_id = %job_id, error = %e, "Seller import failed");
            self.mark_failed(job_id, &e).await;
        }
    }

    /// Import the chosen variation ASINs and finish the job.
    pub async fn execute_variation_import(self, job_id: Uuid, selections: Vec<String>) {
        if let Err(e) = self.run_variation_import(job_id, selections).await {
            error!(job_id = %job_id, error = %e, "Variation import failed");
            self.mark_failed(job_id, &e).await;
        }
    }

    async fn run_import(&self, job_id: Uuid, selections: Vec<String>) -> Result<()> {
        let mut job = self.load(job_id).await?;

        let (asins, mut result) = dedupe_selection(selections);
        job.set_import_result(&result)?;
        job.touch();
        self.store.update_seller_job(&job).await?;

        job.status = SellerStatus::Scraping;
        job.touch();
        self.store.update_seller_job(&job).await?;
        info!(job_id = %job_id, count = asins.len(), "Scraping imported products");

        let mut variations: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = asins.iter().cloned().collect();
        let mut pacer = Pacer::new(self.settings.scrape_delay());
        for asin in &asins {
            pacer.wait().await;
            match self.products.fetch_product(asin, &job.marketplace).await {
                Ok(_) => result.imported += 1,
                Err(e) => {
                    warn!(job_id = %job_id, asin = %asin, error = %e, "Product scrape failed");
                    result.errored += 1;
                    job.set_import_result(&result)?;
                    job.touch();
                    self.store.update_seller_job(&job).await?;
                    continue;
                }
            }

            match self.products.fetch_variations(asin, &job.marketplace).await {
                Ok(found) => {
                    for v in found {
                        if seen.insert(v.clone()) {
                            variations.push(v);
                        }
                    }
                }
                Err(e) => {
                    warn!(job_id = %job_id, asin = %asin, error = %e, "Variation discovery failed")
                }
            }

            job.set_import_result(&result)?;
            job.touch();
            self.store.update_seller_job(&job).await?;
        }

        self.generate_listing_images(&job, &asins).await;

        job.variation_candidates = Some(variations);
        job.status = SellerStatus::AwaitingVariationSelection;
        job.touch();
        self.store.update_seller_job(&job).await?;
        info!(job_id = %job_id, imported = result.imported, "Import batch finished");
        Ok(())
    }

    async fn run_variation_import(&self, job_id: Uuid, selections: Vec<String>) -> Result<()> {
        let mut job = self.load(job_id).await?;

        let (asins, mut result) = dedupe_selection(selections);
        let mut pacer = Pacer::new(self.settings.scrape_delay());
        for asin in &asins {
            pacer.wait().await;
            match self.products.fetch_product(asin, &job.marketplace).await {
                Ok(_) => result.imported += 1,
                Err(e) => {
                    warn!(job_id = %job_id, asin = %asin, error = %e, "Variation scrape failed");
                    result.errored += 1;
                }
            }
            job.set_variation_result(&result)?;
            job.touch();
            self.store.update_seller_job(&job).await?;
        }

        job.status = SellerStatus::Done;
        job.touch();
        self.store.update_seller_job(&job).await?;
        info!(job_id = %job_id, imported = result.imported, "Variation import finished");
        Ok(())
    }

    /// Listing images are generated in parallel with a small window; a
    /// failed image never fails the import.
    async fn generate_listing_images(&self, job: &SellerImportJob, asins: &[String]) {
        let futures: Vec<_> = asins
            .iter()
            .map(|asin| {
                let prompt = format!(
                    "Clean product listing hero image for Amazon ASIN {} sold by {}",
                    asin, job.seller_id
                );
                let images = self.images.clone();
                async move { images.generate_image(&prompt).await }
            })
            .collect();

        for (asin, outcome) in asins
            .iter()
            .zip(join_settled(self.settings.image_concurrency, futures).await)
        {
            if let Err(e) = outcome {
                warn!(job_id = %job.id, asin = %asin, error = %e, "Image generation failed");
            }
        }
    }

    async fn load(&self, job_id: Uuid) -> Result<SellerImportJob> {
        self.store
            .get_seller_job(job_id)
            .await?
            .with_context(|| format!("seller job {} not found", job_id))
    }

    async fn mark_failed(&self, job_id: Uuid, error: &anyhow::Error) {
        let result = async {
            let mut job = self.load(job_id).await?;
            job.status = SellerStatus::Failed;
            job.error_message = Some(error.to_string());
            job.touch();
            self.store.update_seller_job(&job).await
        }
        .await;

        if let Err(e) = result {
            error!(job_id = %job_id, error = %e, "Failed to persist job failure");
        }
    }
}

/// Drop duplicate ASINs from a selection, counting them as skipped.
fn dedupe_selection(selections: Vec<String>) -> (Vec<String>, ImportResult) {
    let mut seen = HashSet::new();
    let mut asins = Vec::with_capacity(selections.len());
    let mut result = ImportResult::default();
    for asin in selections {
        if seen.insert(asin.clone()) {
            asins.push(asin);
        } else {
            result.skipped += 1;
        }
    }
    (asins, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_selections_are_skipped_once_each() {
        let (asins, result) = dedupe_selection(vec![
            "B01".into(),
            "B02".into(),
            "B01".into(),
            "B01".into(),
        ]);
        assert_eq!(asins, vec!["B01".to_string(), "B02".to_string()]);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.imported, 0);
    }
}
