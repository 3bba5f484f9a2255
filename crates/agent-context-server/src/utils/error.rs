use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Body text returned when a caller presents a contextId with a bad signature.
pub const INVALID_SIGNATURE_MESSAGE: &str = "Invalid contextId signature";

/// Errors raised while building or using the signing material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Signing key is not configured")]
    MissingSigningKey,

    #[error("Signing key too short: {0} characters (min: {1})")]
    SigningKeyTooShort(usize, usize),

    #[error("Subject must not be empty")]
    EmptySubject,

    #[error("Subject must not contain '|': {0}")]
    DelimiterInSubject(String),
}

/// Errors raised by the conversation persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", INVALID_SIGNATURE_MESSAGE)]
    InvalidSignature,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Agent error: {0}")]
    AgentError(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StoreError(err.to_string())
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::InvalidSignature => (
                StatusCode::FORBIDDEN,
                INVALID_SIGNATURE_MESSAGE,
                None,
            ),
            ApiError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, "Unauthorized", Some(msg))
            }
            ApiError::Forbidden(msg) => {
                tracing::warn!("Forbidden: {}", msg);
                (StatusCode::FORBIDDEN, "Forbidden", Some(msg))
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", Some(msg))
            }
            ApiError::PayloadTooLarge(limit) => {
                tracing::warn!("Request body exceeds {} bytes", limit);
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "PayloadTooLarge",
                    Some(format!("Request body exceeds {} bytes", limit)),
                )
            }
            ApiError::StoreError(msg) => {
                tracing::error!("Store error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "StoreError", Some(msg))
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", Some(msg))
            }
            ApiError::AgentError(msg) => {
                tracing::error!("Agent error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "AgentError", Some(msg))
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
