// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "run the analysis phases") lives in domain runners
// that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseProductApi)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// Product Data API (Infrastructure - scraping provider)
// =============================================================================

/// A summarized product listing, shared by search and seller-catalog calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub asin: String,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub ratings_total: Option<i64>,
    pub image: Option<String>,
}

#[async_trait]
pub trait BaseProductApi: Send + Sync {
    /// Search a marketplace for candidate products.
    async fn search_products(
        &self,
        query: &str,
        marketplace: &str,
        max_results: usize,
    ) -> Result<Vec<ProductSummary>>;

    /// Fetch up to `max_reviews` customer reviews for one ASIN.
    async fn fetch_reviews(
        &self,
        asin: &str,
        marketplace: &str,
        max_reviews: i32,
    ) -> Result<serde_json::Value>;

    /// Fetch customer questions and answers for one ASIN.
    async fn fetch_questions(&self, asin: &str, marketplace: &str) -> Result<serde_json::Value>;

    /// List a seller's catalog.
    async fn fetch_seller_catalog(
        &self,
        seller_id: &str,
        marketplace: &str,
    ) -> Result<Vec<ProductSummary>>;

    /// Fetch the full detail record for one ASIN.
    async fn fetch_product(&self, asin: &str, marketplace: &str) -> Result<serde_json::Value>;

    /// Discover variation ASINs for one ASIN.
    async fn fetch_variations(&self, asin: &str, marketplace: &str) -> Result<Vec<String>>;
}

// =============================================================================
// Analysis Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAnalysis: Send + Sync {
    /// Complete one analysis prompt (returns raw text response).
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

// =============================================================================
// Image Generation Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseImageGen: Send + Sync {
    /// Generate one image and return its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}
