//! HTTP surface: REST CRUD for sites, pages, and settings plus on-demand crawls.

pub mod error;
pub mod rest;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post, put},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use sitewatch_scout::Crawler;
use sitewatch_store::PgPool;

pub struct AppState {
    pub pool: PgPool,
    pub crawler: Arc<Crawler>,
}

pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health check
        .route("/health", get(|| async { "ok" }))
        // Sites
        .route("/api/sites", get(rest::sites::list_sites).post(rest::sites::create_site))
        .route(
            "/api/sites/{id}",
            get(rest::sites::get_site)
                .put(rest::sites::update_site)
                .delete(rest::sites::delete_site),
        )
        // Crawling
        .route("/api/crawl", post(rest::crawl::crawl_site))
        // Pages
        .route("/api/pages", get(rest::pages::list_pages))
        .route("/api/pages/read-all", put(rest::pages::mark_all_read))
        .route("/api/pages/{id}", put(rest::pages::update_page))
        // Settings
        .route(
            "/api/settings",
            get(rest::settings::get_settings).put(rest::settings::put_settings),
        )
        .with_state(state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
