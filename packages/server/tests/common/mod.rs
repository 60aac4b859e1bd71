//! Shared harness for the HTTP-level test suites: in-memory store, recording
//! mocks, and handlers invoked directly.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;

use server_core::config::JobSettings;
use server_core::kernel::spawner::TaskSpawner;
use server_core::kernel::store::memory::MemoryStore;
use server_core::kernel::test_support::{MockAnalysis, MockImageGen, MockProductApi};
use server_core::server::AppState;

pub struct TestEnv {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub products: Arc<MockProductApi>,
    pub analysis: Arc<MockAnalysis>,
    pub images: Arc<MockImageGen>,
}

pub fn test_env() -> TestEnv {
    env_with_products(MockProductApi::new())
}

pub fn env_with_products(products: MockProductApi) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    let products = Arc::new(products);
    let analysis = Arc::new(MockAnalysis::new());
    let images = Arc::new(MockImageGen::new());

    let settings = JobSettings {
        // No pacing in tests.
        scrape_delay_ms: 0,
        ..JobSettings::default()
    };

    let state = AppState {
        research_store: store.clone(),
        seller_store: store.clone(),
        extraction_store: store.clone(),
        products: products.clone(),
        analysis: analysis.clone(),
        images: images.clone(),
        spawner: TaskSpawner::new(),
        settings,
        worker_auth_token: "test-token".to_string(),
    };

    TestEnv {
        state,
        store,
        products,
        analysis,
        images,
    }
}

/// Turn a handler result into (status, decoded JSON body).
pub async fn json_body<T: DeserializeOwned>(response: impl IntoResponse) -> (StatusCode, T) {
    let response = response.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("bad response body ({}): {:?}", e, bytes));
    (status, value)
}
