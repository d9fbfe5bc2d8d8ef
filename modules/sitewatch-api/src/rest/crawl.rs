use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use customsearch_client::DateRange;
use sitewatch_store::Site;

use crate::error::{ApiError, ApiResult};
use crate::rest::{parse_id, read_json};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    site_id: Option<String>,
    date_range: Option<String>,
}

/// Crawl one site now. Error-status sites may be crawled; success clears the error.
pub async fn crawl_site(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = read_json(payload)?;
    let raw_id = body
        .site_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("siteId is required"))?;
    let site_id = parse_id(raw_id)?;
    let range = body
        .date_range
        .as_deref()
        .map(DateRange::from_code)
        .unwrap_or_default();

    let site = Site::find_by_id(site_id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Site"))?;

    let outcome = state.crawler.crawl_site(&site, range).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "newPagesCount": outcome.new_pages,
        "totalFound": outcome.total_found,
    })))
}
