// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::filter::FilterError;
use crate::geo::GeoError;
use crate::mail::MailError;
use crate::store::StoreError;

pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";
pub const SERVER_ERROR: &str = "Server Error";

/// HTTP API error. Every failure leaving a handler is translated here.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    /// Field messages, reported joined by ", "
    ValidationError(Vec<String>),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::ValidationError(messages) => messages.join(", "),
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::InternalServerError(msg) => msg.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(messages: Vec<String>) -> Self {
        ApiError::ValidationError(messages)
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized(NOT_AUTHORIZED.to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Malformed ids are reported the same way as missing records.
    pub fn resource_not_found() -> Self {
        ApiError::NotFound("Resource not found".to_string())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn server_error() -> Self {
        ApiError::InternalServerError(SERVER_ERROR.to_string())
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(constraint) => {
                tracing::debug!("Duplicate key on {}", constraint);
                ApiError::bad_request("Duplicate field value entered")
            }
            StoreError::OwnerLimit(user) => {
                ApiError::forbidden(format!("The user with ID {} has already published a bootcamp", user))
            }
            StoreError::MissingReference(reference) => {
                tracing::debug!("Missing reference: {}", reference);
                ApiError::resource_not_found()
            }
            other => {
                // Log the real error but return generic message
                tracing::error!("Store error: {}", other);
                ApiError::server_error()
            }
        }
    }
}

impl From<GeoError> for ApiError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::NotFound(input) => ApiError::not_found(format!("Location not found for {}", input)),
            other => {
                tracing::error!("Geocoder error: {}", other);
                ApiError::server_error()
            }
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        tracing::error!("Mail error: {}", err);
        ApiError::internal_server_error("Email could not be sent")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(reason) => {
                tracing::warn!("Rejected token: {}", reason);
                ApiError::unauthorized()
            }
            other => {
                tracing::error!("Auth error: {}", other);
                ApiError::server_error()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
