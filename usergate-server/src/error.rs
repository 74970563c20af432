//! Error types for the HTTP API

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use usergate_core::UsergateError;
use utoipa::ToSchema;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Request body could not be read as the expected JSON
    Payload(StatusCode, String),

    /// Gate rejection (401)
    Unauthorized,

    /// Core error
    Core(UsergateError),
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error kind
    #[schema(example = "unauthorized")]
    pub error: String,
    /// Human-readable message
    #[schema(example = "Unauthorized")]
    pub message: String,
}

impl ApiError {
    /// The one response every gate rejection produces
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Payload(status, msg) => write!(f, "Invalid payload ({}): {}", status, msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::Core(e) => write!(f, "Core error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<UsergateError> for ApiError {
    fn from(err: UsergateError) -> Self {
        ApiError::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Well-formed JSON of the wrong shape is a plain bad request here;
        // content type and size problems keep axum's status.
        let status = match rejection.status() {
            StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
            status => status,
        };
        ApiError::Payload(status, rejection.body_text())
    }
}

fn payload_error_type(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        s if s.is_server_error() => "internal_error",
        _ => "bad_request",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Payload(status, msg) => (status, payload_error_type(status), msg),
            ApiError::Unauthorized | ApiError::Core(UsergateError::Unauthorized(_)) => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::Core(UsergateError::UserNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("User {} not found", id),
            ),
            ApiError::Core(UsergateError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg)
            }
            ApiError::Core(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                e.to_string(),
            ),
        };

        crate::metrics::record_error(error_type);

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
