pub mod crawl;
pub mod pages;
pub mod settings;
pub mod sites;

use axum::{extract::rejection::JsonRejection, Json};
use uuid::Uuid;

use crate::error::ApiError;

// --- Helpers ---

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id: {raw}")))
}

/// Unwrap a JSON body, turning extractor rejections into `{"error": ..}` 400s.
fn read_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
