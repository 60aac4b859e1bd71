// Main entry point for the API server

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::kernel::openai_client::OpenAiClient;
use server_core::kernel::product_api::RainforestProductApi;
use server_core::kernel::spawner::TaskSpawner;
use server_core::kernel::store::postgres::PgStore;
use server_core::kernel::sweeper::WatchdogSweeper;
use server_core::server::{build_app, AppState};
use server_core::Config;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Product Research Aggregator API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let store = Arc::new(PgStore::new(pool));
    let openai = Arc::new(
        OpenAiClient::new(config.openai_api_key.clone())
            .context("Failed to create OpenAI client")?,
    );

    let state = AppState {
        research_store: store.clone(),
        seller_store: store.clone(),
        extraction_store: store.clone(),
        products: Arc::new(RainforestProductApi::new(config.rainforest_api_key.clone())),
        analysis: openai.clone(),
        images: openai,
        spawner: TaskSpawner::new(),
        settings: config.settings.clone(),
        worker_auth_token: config.worker_auth_token.clone(),
    };

    // Periodic watchdog alongside the lazy on-read sweep.
    let shutdown = CancellationToken::new();
    let sweeper = WatchdogSweeper::new(
        state.seller_store.clone(),
        config.settings.clone(),
        shutdown.clone(),
    );
    let _sweeper = sweeper.start();

    let app = build_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    Ok(())
}
