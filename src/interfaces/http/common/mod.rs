//! Shared HTTP building blocks: the response envelope, domain error
//! mapping and validating extractors.

pub mod validated_json;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::shared::errors::DomainError;

pub use validated_json::{ValidatedJson, ValidatedQuery, ValidationRejection};

/// Seconds a client should wait before retrying a busy lot.
pub const BUSY_RETRY_AFTER_SECS: u64 = 1;

/// Standard API response envelope
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// A [`DomainError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            err if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Busy(_) | DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ApiResponse::<()>::error(self.0.to_string()));

        match &self.0 {
            DomainError::Busy(_) => {
                warn!(error = %self.0, "Request rejected, resource busy");
                (
                    status,
                    [(header::RETRY_AFTER, BUSY_RETRY_AFTER_SECS.to_string())],
                    body,
                )
                    .into_response()
            }
            DomainError::Unavailable(_) => {
                error!(error = %self.0, "Backing store unavailable");
                (status, body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
