use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::info;

use sitewatch_common::{normalize_domain, CrawlInterval, SitewatchError};
use sitewatch_store::{Site, SiteChanges};

use crate::error::{ApiError, ApiResult};
use crate::rest::{parse_id, read_json};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteRequest {
    name: Option<String>,
    domain: Option<String>,
    crawl_interval: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSiteRequest {
    name: Option<String>,
    domain: Option<String>,
    crawl_interval: Option<String>,
}

fn required_name(name: &str) -> Result<String, SitewatchError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SitewatchError::Validation("Name is required".into()));
    }
    Ok(name.to_string())
}

/// A blank name on update leaves the stored name as it is.
fn name_change(name: Option<&str>) -> Option<String> {
    name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string)
}

fn required_domain(raw: &str) -> Result<String, SitewatchError> {
    let domain = normalize_domain(raw);
    if domain.is_empty() {
        return Err(SitewatchError::Validation("Domain is required".into()));
    }
    Ok(domain)
}

fn valid_interval(code: &str) -> Result<CrawlInterval, SitewatchError> {
    CrawlInterval::parse(code).ok_or_else(|| {
        SitewatchError::Validation(format!(
            "Invalid crawl interval: {code} (expected one of 12h, 1d, 1w)"
        ))
    })
}

pub async fn list_sites(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let sites = Site::find_all(&state.pool).await?;
    Ok(Json(sites))
}

pub async fn create_site(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = read_json(payload)?;

    let name = required_name(body.name.as_deref().unwrap_or_default())?;
    let domain = required_domain(body.domain.as_deref().unwrap_or_default())?;
    let interval = match body.crawl_interval.as_deref() {
        Some(code) => valid_interval(code)?,
        None => CrawlInterval::default(),
    };

    let site = Site::create(&name, &domain, interval.code(), &state.pool).await?;
    info!(site_id = %site.id, domain = site.domain.as_str(), "Site created");
    Ok((StatusCode::CREATED, Json(site)))
}

pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let site = Site::find_by_id(id, &state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Site"))?;
    Ok(Json(site))
}

pub async fn update_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSiteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    let body = read_json(payload)?;

    let changes = SiteChanges {
        name: name_change(body.name.as_deref()),
        domain: body.domain.as_deref().map(required_domain).transpose()?,
        crawl_interval: body
            .crawl_interval
            .as_deref()
            .map(|code| valid_interval(code).map(|i| i.code().to_string()))
            .transpose()?,
    };

    let site = Site::update(id, &changes, &state.pool).await?;
    info!(site_id = %site.id, "Site updated");
    Ok(Json(site))
}

pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id)?;
    if !Site::delete(id, &state.pool).await? {
        return Err(ApiError::not_found("Site"));
    }
    info!(site_id = %id, "Site deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}
