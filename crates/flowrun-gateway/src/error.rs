use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use flowrun_core::error::{FlowError, ValidationError};

/// Request-fatal errors and their HTTP mapping.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    InvalidJson,
    Validation(ValidationError),
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::Validation(v) => Self::Validation(v),
            FlowError::Unauthorized => Self::Unauthorized,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, json!({"error": "Unauthorized"})),
            Self::InvalidJson => (StatusCode::BAD_REQUEST, json!({"error": "Invalid JSON body"})),
            Self::Validation(ValidationError::Cycle) => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Flow graph contains a cycle"}),
            ),
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Validation failed", "details": e.to_string()}),
            ),
            Self::Internal(message) => {
                error!(error = %message, "Flow execution failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal server error"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidJson.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(FlowError::Validation(ValidationError::Cycle))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(FlowError::Config("boom".into())).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
