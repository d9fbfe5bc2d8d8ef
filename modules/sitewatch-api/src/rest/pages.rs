use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use sitewatch_store::{Page, PageFilter};

use crate::error::{ApiError, ApiResult};
use crate::rest::{parse_id, read_json};
use crate::AppState;

/// Raw query parameters. Everything is optional and parsed leniently.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PagesQuery {
    site_id: Option<String>,
    is_read: Option<String>,
    search: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

impl PagesQuery {
    fn into_filter(self) -> Result<PageFilter, ApiError> {
        Ok(PageFilter {
            site_id: optional_id(self.site_id.as_deref())?,
            is_read: match self.is_read.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
            search: self.search,
            limit: self.limit.and_then(|v| v.trim().parse().ok()),
            offset: self.offset.and_then(|v| v.trim().parse().ok()),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadAllQuery {
    site_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageRequest {
    is_read: Option<bool>,
}

fn optional_id(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_id(v).map(Some),
        None => Ok(None),
    }
}

pub async fn list_pages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PagesQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let listing = Page::list(&filter, &state.pool).await?;
    Ok(Json(listing))
}

pub async fn update_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let is_read = read_json(payload)?
        .is_read
        .ok_or_else(|| ApiError::bad_request("isRead must be a boolean"))?;

    let page = Page::set_read(id, is_read, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Page"))?;
    Ok(Json(page))
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadAllQuery>,
) -> ApiResult<impl IntoResponse> {
    let site_id = optional_id(params.site_id.as_deref())?;
    let changed = Page::mark_all_read(site_id, &state.pool).await?;
    info!(site_id = ?site_id, changed, "Marked pages read");
    Ok(Json(serde_json::json!({ "success": true })))
}
