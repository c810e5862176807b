//! HTTP error envelope for the non-stream endpoints and pre-stream failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vibe_core::error::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed request fields
    #[error("{0}")]
    InputValidation(String),
    /// The server cannot reach its upstream services as configured
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub logs: Vec<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InputValidation(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            logs: Vec::new(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::InputValidation("prompt is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        let missing = ApiError::from(ConfigError::MissingApiKey("GEMINI_API_KEY".into()));
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(missing.to_string().contains("GEMINI_API_KEY"));
    }
}
