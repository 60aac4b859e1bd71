//! Pure Rainforest REST API client.
//!
//! A minimal client for the Rainforest product-data API. Supports product
//! search, review and Q&A collection, seller catalog listing, and full
//! product detail lookups. Every call is a single GET against `/request`
//! with a `type` discriminator.
//!
//! # Example
//!
//! ```rust,ignore
//! use rainforest_client::RainforestClient;
//!
//! let client = RainforestClient::new("your-api-key".into());
//!
//! let reviews = client.product_reviews("B07ZPKN6YR", "amazon.com", 1).await?;
//! for review in &reviews.reviews {
//!     println!("{}", review.title.as_deref().unwrap_or("(untitled)"));
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{RainforestError, Result};
pub use types::{
    Price, Product, ProductResponse, Question, QuestionsResponse, Review, ReviewsResponse,
    SearchResponse, SearchResult, SellerProduct, SellerProductsResponse, Variant,
};

use serde::de::DeserializeOwned;

const BASE_URL: &str = "https://api.rainforestapi.com/request";

pub struct RainforestClient {
    client: reqwest::Client,
    api_key: String,
}

impl RainforestClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    /// Issue one request against the API and decode the typed response.
    async fn request<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let mut query: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        query.extend_from_slice(params);

        let resp = self.client.get(BASE_URL).query(&query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RainforestError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Search a marketplace for products matching a term.
    pub async fn search(
        &self,
        search_term: &str,
        amazon_domain: &str,
        page: u32,
    ) -> Result<SearchResponse> {
        tracing::debug!(search_term, amazon_domain, page, "Rainforest search");
        let page = page.to_string();
        self.request(&[
            ("type", "search"),
            ("search_term", search_term),
            ("amazon_domain", amazon_domain),
            ("page", &page),
        ])
        .await
    }

    /// Fetch one page of customer reviews for an ASIN.
    pub async fn product_reviews(
        &self,
        asin: &str,
        amazon_domain: &str,
        page: u32,
    ) -> Result<ReviewsResponse> {
        tracing::debug!(asin, amazon_domain, page, "Rainforest reviews");
        let page = page.to_string();
        self.request(&[
            ("type", "reviews"),
            ("asin", asin),
            ("amazon_domain", amazon_domain),
            ("page", &page),
        ])
        .await
    }

    /// Fetch one page of customer questions and answers for an ASIN.
    pub async fn product_questions(
        &self,
        asin: &str,
        amazon_domain: &str,
        page: u32,
    ) -> Result<QuestionsResponse> {
        tracing::debug!(asin, amazon_domain, page, "Rainforest questions");
        let page = page.to_string();
        self.request(&[
            ("type", "questions"),
            ("asin", asin),
            ("amazon_domain", amazon_domain),
            ("page", &page),
        ])
        .await
    }

    /// List one page of a seller's catalog.
    pub async fn seller_products(
        &self,
        seller_id: &str,
        amazon_domain: &str,
        page: u32,
    ) -> Result<SellerProductsResponse> {
        tracing::debug!(seller_id, amazon_domain, page, "Rainforest seller products");
        let page = page.to_string();
        self.request(&[
            ("type", "seller_products"),
            ("seller_id", seller_id),
            ("amazon_domain", amazon_domain),
            ("page", &page),
        ])
        .await
    }

    /// Fetch the full product detail record for an ASIN.
    pub async fn product(&self, asin: &str, amazon_domain: &str) -> Result<ProductResponse> {
        tracing::debug!(asin, amazon_domain, "Rainforest product");
        self.request(&[
            ("type", "product"),
            ("asin", asin),
            ("amazon_domain", amazon_domain),
        ])
        .await
    }
}
