//! Rainforest-backed implementation of [`BaseProductApi`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use rainforest_client::RainforestClient;

use super::traits::{BaseProductApi, ProductSummary};

/// Adapter from the marketplace codes used in job payloads ("US", "UK", ...)
/// to the Amazon domain the Rainforest API expects.
pub fn amazon_domain(marketplace: &str) -> &str {
    match marketplace.to_ascii_uppercase().as_str() {
        "US" => "amazon.com",
        "UK" | "GB" => "amazon.co.uk",
        "DE" => "amazon.de",
        "FR" => "amazon.fr",
        "IT" => "amazon.it",
        "ES" => "amazon.es",
        "CA" => "amazon.ca",
        "JP" => "amazon.co.jp",
        "AU" => "amazon.com.au",
        "MX" => "amazon.com.mx",
        _ => "amazon.com",
    }
}

/// Production product-data provider backed by the Rainforest API.
pub struct RainforestProductApi {
    client: RainforestClient,
}

impl RainforestProductApi {
    pub fn new(api_key: String) -> Self {
        Self {
            client: RainforestClient::new(api_key),
        }
    }
}

/// Rainforest returns ten reviews per page.
const REVIEWS_PER_PAGE: i32 = 10;

#[async_trait]
impl BaseProductApi for RainforestProductApi {
    async fn search_products(
        &self,
        query: &str,
        marketplace: &str,
        max_results: usize,
    ) -> Result<Vec<ProductSummary>> {
        let response = self
            .client
            .search(query, amazon_domain(marketplace), 1)
            .await
            .context("product search failed")?;

        Ok(response
            .search_results
            .into_iter()
            .take(max_results)
            .map(|r| ProductSummary {
                asin: r.asin,
                title: r.title,
                price: r.price.and_then(|p| p.value),
                rating: r.rating,
                ratings_total: r.ratings_total,
                image: r.image,
            })
            .collect())
    }

    async fn fetch_reviews(
        &self,
        asin: &str,
        marketplace: &str,
        max_reviews: i32,
    ) -> Result<serde_json::Value> {
        let domain = amazon_domain(marketplace);
        let pages = (max_reviews.max(1) + REVIEWS_PER_PAGE - 1) / REVIEWS_PER_PAGE;

        let mut reviews = Vec::new();
        for page in 1..=pages as u32 {
            let response = self
                .client
                .product_reviews(asin, domain, page)
                .await
                .with_context(|| format!("review fetch failed for {}", asin))?;

            let page_count = response.reviews.len();
            reviews.extend(response.reviews);

            // Short page means the product has no further reviews.
            if page_count < REVIEWS_PER_PAGE as usize {
                break;
            }
        }

        reviews.truncate(max_reviews.max(1) as usize);
        serde_json::to_value(reviews).context("failed to encode reviews")
    }

    async fn fetch_questions(&self, asin: &str, marketplace: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .product_questions(asin, amazon_domain(marketplace), 1)
            .await
            .with_context(|| format!("question fetch failed for {}", asin))?;

        serde_json::to_value(response.questions).context("failed to encode questions")
    }

    async fn fetch_seller_catalog(
        &self,
        seller_id: &str,
        marketplace: &str,
    ) -> Result<Vec<ProductSummary>> {
        let response = self
            .client
            .seller_products(seller_id, amazon_domain(marketplace), 1)
            .await
            .with_context(|| format!("seller catalog fetch failed for {}", seller_id))?;

        Ok(response
            .seller_products
            .into_iter()
            .map(|p| ProductSummary {
                asin: p.asin,
                title: p.title,
                price: p.price.and_then(|pr| pr.value),
                rating: None,
                ratings_total: None,
                image: p.image,
            })
            .collect())
    }

    async fn fetch_product(&self, asin: &str, marketplace: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .product(asin, amazon_domain(marketplace))
            .await
            .with_context(|| format!("product fetch failed for {}", asin))?;

        serde_json::to_value(response.product).context("failed to encode product")
    }

    async fn fetch_variations(&self, asin: &str, marketplace: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .product(asin, amazon_domain(marketplace))
            .await
            .with_context(|| format!("variation discovery failed for {}", asin))?;

        Ok(response
            .product
            .map(|p| p.variants.into_iter().filter_map(|v| v.asin).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marketplace_codes_map_to_domains() {
        assert_eq!(amazon_domain("US"), "amazon.com");
        assert_eq!(amazon_domain("uk"), "amazon.co.uk");
        assert_eq!(amazon_domain("DE"), "amazon.de");
    }

    #[test]
    fn unknown_marketplace_falls_back_to_com() {
        assert_eq!(amazon_domain("XX"), "amazon.com");
    }
}
