use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use customsearch_client::CustomSearchClient;
use sitewatch_api::{build_router, AppState};
use sitewatch_common::AppConfig;
use sitewatch_scout::{CredentialDefaults, Crawler, PgCrawlStore, Scheduler};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sitewatch=info,tower_http=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before tracing so LOG_FORMAT and RUST_LOG apply.
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let pool =
        sitewatch_store::connect(&config.database_url, config.database_max_connections).await?;
    info!(max_connections = config.database_max_connections, "Connected to database");

    let crawler = Arc::new(Crawler::new(
        Arc::new(PgCrawlStore::new(pool.clone())),
        Arc::new(CustomSearchClient::new()),
        CredentialDefaults::from_config(&config),
    ));

    let scheduler = Arc::new(Scheduler::new(crawler.clone()));
    if config.scheduler_enabled {
        scheduler.start();
    } else {
        info!("Scheduler disabled (SCHEDULER_ENABLED=false)");
    }

    let state = Arc::new(AppState { pool, crawler });
    let app = build_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Sitewatch API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    Ok(())
}
