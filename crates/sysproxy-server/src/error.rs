//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use sysproxy_core::{EnumerationError, RequestKind, ValidationError};

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body was not the expected JSON.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    /// Request body decoded but was rejected by validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Network services could not be listed.
    #[error("Failed to get network services: {0}")]
    Enumeration(#[from] EnumerationError),

    /// The change failed on every service.
    #[error("Failed to {} for any service: {details}", .kind.action())]
    ApplyFailed { kind: RequestKind, details: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Decode(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Enumeration(_) | ApiError::ApplyFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Decode(_) => "invalid_body",
            ApiError::Validation(_) => "invalid_request",
            ApiError::Enumeration(_) => "enumeration_failed",
            ApiError::ApplyFailed { .. } => "apply_failed",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_bad_request() {
        let err = ApiError::from(ValidationError::EmptyHost);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "host must not be empty");

        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ApiError::from(decode).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_errors_are_internal() {
        let err = ApiError::from(EnumerationError::NoServices);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Failed to get network services: no network services found"
        );

        let err = ApiError::ApplyFailed {
            kind: RequestKind::Pac,
            details: "Failed to set PAC proxy for Wi-Fi: boom".to_string(),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Failed to set PAC proxy for any service: Failed to set PAC proxy for Wi-Fi: boom"
        );
    }
}
