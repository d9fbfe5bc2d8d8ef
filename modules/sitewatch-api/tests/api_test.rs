//! HTTP round-trips through the router against a real Postgres.
//! Set DATABASE_TEST_URL or these tests are skipped. The search provider is mocked.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use sitewatch_api::{build_router, AppState};
use sitewatch_scout::testing::{result, MockSearcher};
use sitewatch_scout::{CredentialDefaults, Crawler, PgCrawlStore};
use sitewatch_store::PgPool;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    sitewatch_store::migrate(&pool).await.ok()?;
    Some(pool)
}

fn app(pool: &PgPool, searcher: MockSearcher, defaults: CredentialDefaults) -> Router {
    let crawler = Arc::new(Crawler::new(
        Arc::new(PgCrawlStore::new(pool.clone())),
        Arc::new(searcher),
        defaults,
    ));
    build_router(
        Arc::new(AppState {
            pool: pool.clone(),
            crawler,
        }),
        &[],
    )
}

fn configured() -> CredentialDefaults {
    CredentialDefaults {
        api_key: Some("test-key".into()),
        engine_id: Some("test-cx".into()),
    }
}

fn unique_domain() -> String {
    format!("rival-{}.test", Uuid::new_v4().simple())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_site(app: &Router, domain: &str) -> Value {
    let (status, site) = send(
        app,
        Method::POST,
        "/api/sites",
        Some(json!({ "name": "Rival", "domain": domain })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    site
}

#[tokio::test]
async fn health_responds_without_cache() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool, MockSearcher::new(), configured());

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn site_crud_round_trip() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool, MockSearcher::new(), configured());
    let domain = unique_domain();

    let site = create_site(&app, &format!("HTTPS://{}/", domain.to_uppercase())).await;
    assert_eq!(site["domain"], domain);
    assert_eq!(site["crawlInterval"], "1d");
    assert_eq!(site["status"], "active");
    assert_eq!(site["pageCount"], 0);
    let id = site["id"].as_str().unwrap().to_string();

    let (status, dup) = send(
        &app,
        Method::POST,
        "/api/sites",
        Some(json!({ "name": "Again", "domain": format!("http://{domain}") })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(dup["error"].as_str().unwrap().contains(&domain));

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/sites/{id}"),
        Some(json!({ "name": "Renamed", "crawlInterval": "12h" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["crawlInterval"], "12h");

    let (status, kept) = send(
        &app,
        Method::PUT,
        &format!("/api/sites/{id}"),
        Some(json!({ "name": "   ", "crawlInterval": "1w" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kept["name"], "Renamed");
    assert_eq!(kept["crawlInterval"], "1w");

    let (status, fetched) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Renamed");

    let (status, all) = send(&app, Method::GET, "/api/sites", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(all.as_array().unwrap().iter().any(|s| s["id"] == id.as_str()));

    let (status, body) = send(&app, Method::DELETE, &format!("/api/sites/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_site_input_is_rejected() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool, MockSearcher::new(), configured());

    for body in [
        json!({ "domain": unique_domain() }),
        json!({ "name": "  ", "domain": unique_domain() }),
        json!({ "name": "X", "domain": "https://" }),
        json!({ "name": "X", "domain": unique_domain(), "crawlInterval": "5m" }),
    ] {
        let (status, resp) = send(&app, Method::POST, "/api/sites", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["error"].is_string());
    }

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/sites/{}", Uuid::new_v4()),
        Some(json!({ "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn crawl_then_read_pages() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let domain = unique_domain();
    let searcher = MockSearcher::new().on_domain(
        &domain,
        vec![
            result(&format!("https://{domain}/pricing"), "Pricing"),
            result(&format!("https://{domain}/blog/launch"), "Launch post"),
        ],
    );
    let app = app(&pool, searcher, configured());
    let site = create_site(&app, &domain).await;
    let id = site["id"].as_str().unwrap().to_string();

    let (status, crawl) = send(
        &app,
        Method::POST,
        "/api/crawl",
        Some(json!({ "siteId": id, "dateRange": "2w" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(crawl, json!({ "success": true, "newPagesCount": 2, "totalFound": 2 }));

    let (_, again) = send(&app, Method::POST, "/api/crawl", Some(json!({ "siteId": id }))).await;
    assert_eq!(again["newPagesCount"], 0);
    assert_eq!(again["totalFound"], 2);

    let (_, site) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(site["status"], "active");
    assert!(site["lastCrawledAt"].is_string());
    assert_eq!(site["pageCount"], 2);

    let (status, listing) = send(&app, Method::GET, &format!("/api/pages?siteId={id}&search=PRICING"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["unreadCount"], 1);
    assert_eq!(listing["limit"], 50);
    assert_eq!(listing["pages"][0]["site"]["domain"], domain);
    let page_id = listing["pages"][0]["id"].as_str().unwrap().to_string();

    let (status, page) = send(
        &app,
        Method::PUT,
        &format!("/api/pages/{page_id}"),
        Some(json!({ "isRead": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["isRead"], true);

    let (status, _) = send(&app, Method::PUT, &format!("/api/pages/read-all?siteId={id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, listing) = send(&app, Method::GET, &format!("/api/pages?siteId={id}&isRead=false"), None).await;
    assert_eq!(listing["total"], 0);
    assert_eq!(listing["unreadCount"], 0);
}

#[tokio::test]
async fn crawl_failures_map_to_status_codes() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let failing = unique_domain();
    let searcher = MockSearcher::new().failing_domain(&failing, "Daily Limit Exceeded");
    let app = app(&pool, searcher, configured());

    let (status, _) = send(&app, Method::POST, "/api/crawl", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/crawl",
        Some(json!({ "siteId": Uuid::new_v4().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let site = create_site(&app, &failing).await;
    let id = site["id"].as_str().unwrap().to_string();
    let (status, body) = send(&app, Method::POST, "/api/crawl", Some(json!({ "siteId": id }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Daily Limit Exceeded");

    let (_, site) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(site["status"], "error");
    assert_eq!(site["errorMessage"], "Daily Limit Exceeded");
    assert!(site["lastCrawledAt"].is_null());
}

#[tokio::test]
async fn crawl_without_credentials_is_bad_request() {
    let Some(pool) = test_pool().await else {
        return;
    };
    // Credentials stored through the settings API would satisfy the crawl.
    if credentials_already_stored(&pool).await {
        return;
    }
    let app = app(&pool, MockSearcher::new(), CredentialDefaults::default());
    let site = create_site(&app, &unique_domain()).await;
    let id = site["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::POST, "/api/crawl", Some(json!({ "siteId": id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not configured"));

    let (_, site) = send(&app, Method::GET, &format!("/api/sites/{id}"), None).await;
    assert_eq!(site["status"], "active");
    assert!(site["errorMessage"].is_null());
}

/// True when the database already carries non-blank search credentials.
async fn credentials_already_stored(pool: &PgPool) -> bool {
    let all = sitewatch_store::Setting::all(pool).await.unwrap_or_default();
    let set = |k: &str| all.get(k).is_some_and(|v| !v.trim().is_empty());
    set(sitewatch_common::SETTING_GOOGLE_API_KEY) && set(sitewatch_common::SETTING_GOOGLE_CX)
}

#[tokio::test]
async fn settings_put_keeps_only_strings() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let app = app(&pool, MockSearcher::new(), configured());
    let key = format!("test_setting_{}", Uuid::new_v4().simple());
    let ignored = format!("test_number_{}", Uuid::new_v4().simple());

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/settings",
        Some(json!({ (key.clone()): "value", (ignored.clone()): 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, settings) = send(&app, Method::GET, "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings[&key], "value");
    assert!(settings.get(&ignored).is_none());

    let (status, _) = send(&app, Method::PUT, "/api/settings", Some(json!("nope"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
