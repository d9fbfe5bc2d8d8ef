use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json},
};
use serde_json::Value;
use tracing::info;

use sitewatch_store::Setting;

use crate::error::{ApiError, ApiResult};
use crate::rest::read_json;
use crate::AppState;

pub async fn get_settings(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let settings = Setting::all(&state.pool).await?;
    Ok(Json(settings))
}

/// Upsert every string-valued key of a JSON object. Other values are ignored.
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = read_json(payload)?;
    let entries = string_entries(&body)?;

    Setting::upsert_many(&entries, &state.pool).await?;
    info!(keys = ?entries.keys().collect::<Vec<_>>(), "Settings saved");
    Ok(Json(serde_json::json!({ "success": true })))
}

fn string_entries(body: &Value) -> Result<BTreeMap<String, String>, ApiError> {
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Settings must be a JSON object"))?;
    Ok(object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect())
}
