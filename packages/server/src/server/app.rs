//! Application state and router setup.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::JobSettings;
use crate::domains::research::ResearchRunner;
use crate::domains::seller::SellerRunner;
use crate::kernel::spawner::TaskSpawner;
use crate::kernel::store::{ExtractionStore, ResearchJobStore, SellerJobStore};
use crate::kernel::traits::{BaseAnalysis, BaseImageGen, BaseProductApi};
use crate::server::middleware::worker_auth_middleware;
use crate::server::routes::{extraction, health, research, seller};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub research_store: Arc<dyn ResearchJobStore>,
    pub seller_store: Arc<dyn SellerJobStore>,
    pub extraction_store: Arc<dyn ExtractionStore>,
    pub products: Arc<dyn BaseProductApi>,
    pub analysis: Arc<dyn BaseAnalysis>,
    pub images: Arc<dyn BaseImageGen>,
    pub spawner: TaskSpawner,
    pub settings: JobSettings,
    pub worker_auth_token: String,
}

impl AppState {
    pub fn research_runner(&self) -> ResearchRunner {
        ResearchRunner {
            store: self.research_store.clone(),
            products: self.products.clone(),
            analysis: self.analysis.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn seller_runner(&self) -> SellerRunner {
        SellerRunner {
            store: self.seller_store.clone(),
            products: self.products.clone(),
            images: self.images.clone(),
            settings: self.settings.clone(),
        }
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let worker_token = state.worker_auth_token.clone();
    let worker_routes = Router::new()
        .route("/claim", get(extraction::claim_work))
        .route("/report", post(extraction::report_work))
        .layer(middleware::from_fn(move |req, next| {
            worker_auth_middleware(worker_token.clone(), req, next)
        }));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .route("/api/research-jobs", post(research::create_research_job))
        .route("/api/research-jobs/:id", get(research::get_research_job))
        .route(
            "/api/research-jobs/:id/select",
            post(research::select_products),
        )
        .route("/api/seller-jobs", post(seller::create_seller_job))
        .route("/api/seller-jobs/:id", get(seller::get_seller_job))
        .route("/api/seller-jobs/:id/import", post(seller::import_products))
        .route(
            "/api/seller-jobs/:id/import-variations",
            post(seller::import_variations),
        )
        .route(
            "/api/extraction-jobs",
            post(extraction::create_extraction_job),
        )
        .route(
            "/api/extraction-jobs/:id",
            get(extraction::get_extraction_job).delete(extraction::cancel_extraction_job),
        )
        .nest("/api/worker", worker_routes)
        .route("/health", get(health::health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
