use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

use sitewatch_common::SitewatchError;
use sitewatch_scout::CrawlError;

/// Handler error rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }
}

impl From<SitewatchError> for ApiError {
    fn from(err: SitewatchError) -> Self {
        let status = match &err {
            SitewatchError::Validation(_)
            | SitewatchError::DuplicateDomain(_)
            | SitewatchError::Config(_) => StatusCode::BAD_REQUEST,
            SitewatchError::NotFound(_) => StatusCode::NOT_FOUND,
            SitewatchError::Provider(_)
            | SitewatchError::Database(_)
            | SitewatchError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::AlreadyRunning(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            CrawlError::Config(message) => SitewatchError::Config(message).into(),
            CrawlError::Search(e) => SitewatchError::Provider(e.to_string()).into(),
            CrawlError::Store(e) => SitewatchError::Anyhow(e).into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        SitewatchError::Anyhow(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), error = %self.message, "Request failed");
        }
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
