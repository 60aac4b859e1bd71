//! Recording mocks for the external-service traits.
//!
//! Shared by unit tests and the integration suites, so this lives in the
//! library rather than under `tests/`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::traits::{BaseAnalysis, BaseImageGen, BaseProductApi, ProductSummary};

fn summary(asin: &str) -> ProductSummary {
    ProductSummary {
        asin: asin.to_string(),
        title: Some(format!("Product {}", asin)),
        price: Some(19.99),
        rating: Some(4.4),
        ratings_total: Some(1234),
        image: None,
    }
}

/// Product API mock that records every call as `"kind:argument"` and fails
/// any call whose key was registered with [`MockProductApi::fail_on`].
#[derive(Default)]
pub struct MockProductApi {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashSet<String>>,
    variations: Mutex<HashMap<String, Vec<String>>>,
    search_results: Mutex<Vec<String>>,
}

impl MockProductApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// ASINs returned by `search_products` and `fetch_seller_catalog`.
    pub fn with_results(self, asins: &[&str]) -> Self {
        *self
            .search_results
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = asins.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Make the call recorded under `key` (e.g. `"reviews:B01"`) fail.
    pub fn fail_on(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn set_variations(&self, asin: &str, variations: &[&str]) {
        self.variations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                asin.to_string(),
                variations.iter().map(|v| v.to_string()).collect(),
            );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, key: String) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.clone());
        if self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
        {
            return Err(anyhow!("injected failure for {}", key));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseProductApi for MockProductApi {
    async fn search_products(
        &self,
        query: &str,
        _marketplace: &str,
        max_results: usize,
    ) -> Result<Vec<ProductSummary>> {
        self.record(format!("search:{}", query))?;
        Ok(self
            .search_results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .take(max_results)
            .map(|a| summary(a))
            .collect())
    }

    async fn fetch_reviews(
        &self,
        asin: &str,
        _marketplace: &str,
        max_reviews: i32,
    ) -> Result<serde_json::Value> {
        self.record(format!("reviews:{}", asin))?;
        Ok(serde_json::json!([{ "asin": asin, "body": "great", "max": max_reviews }]))
    }

    async fn fetch_questions(&self, asin: &str, _marketplace: &str) -> Result<serde_json::Value> {
        self.record(format!("questions:{}", asin))?;
        Ok(serde_json::json!([{ "asin": asin, "question": "does it fit?" }]))
    }

    async fn fetch_seller_catalog(
        &self,
        seller_id: &str,
        _marketplace: &str,
    ) -> Result<Vec<ProductSummary>> {
        self.record(format!("catalog:{}", seller_id))?;
        Ok(self
            .search_results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|a| summary(a))
            .collect())
    }

    async fn fetch_product(&self, asin: &str, _marketplace: &str) -> Result<serde_json::Value> {
        self.record(format!("product:{}", asin))?;
        Ok(serde_json::json!({ "asin": asin, "title": format!("Product {}", asin) }))
    }

    async fn fetch_variations(&self, asin: &str, _marketplace: &str) -> Result<Vec<String>> {
        self.record(format!("variations:{}", asin))?;
        Ok(self
            .variations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(asin)
            .cloned()
            .unwrap_or_default())
    }
}

/// Analysis mock returning a canned completion per call, with an optional
/// 1-based call index that fails.
#[derive(Default)]
pub struct MockAnalysis {
    prompts: Mutex<Vec<String>>,
    fail_on_call: Mutex<Option<usize>>,
}

impl MockAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_call(&self, call: usize) {
        *self
            .fail_on_call
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(call);
    }

    pub fn clear_failure(&self) {
        *self
            .fail_on_call
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl BaseAnalysis for MockAnalysis {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap_or_else(|e| e.into_inner());
            prompts.push(user_prompt.to_string());
            prompts.len()
        };
        if *self
            .fail_on_call
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            == Some(call)
        {
            return Err(anyhow!("injected analysis failure on call {}", call));
        }
        Ok(format!("analysis output {}", call))
    }
}

/// Image generation mock.
#[derive(Default)]
pub struct MockImageGen {
    prompts: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl MockImageGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl BaseImageGen for MockImageGen {
    async fn generate_image(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        if *self.fail.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(anyhow!("injected image failure"));
        }
        Ok("https://images.example.com/generated.png".to_string())
    }
}
