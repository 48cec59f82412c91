//! Error types for picta-ai
//!
//! `AnalysisError` is the pipeline taxonomy; `ApiError` is what HTTP handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::types::AnalysisStage;

/// Failure of one pipeline stage
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Image bytes unreadable by the given extractor
    #[error("{stage} decode error: {message}")]
    Decode {
        stage: AnalysisStage,
        message: String,
    },

    /// Remote model did not answer in time
    #[error("Recognition timed out after {}ms", .0.as_millis())]
    RecognitionTimeout(Duration),

    /// Transport-level or protocol failure talking to the remote model
    #[error("Recognition service unavailable: {0}")]
    RecognitionUnavailable(String),

    /// Store rejected or could not complete the write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Blocking extractor task panicked or was aborted
    #[error("{stage} task failed: {message}")]
    TaskFailed {
        stage: AnalysisStage,
        message: String,
    },
}

impl AnalysisError {
    pub fn decode(stage: AnalysisStage, message: impl Into<String>) -> Self {
        AnalysisError::Decode {
            stage,
            message: message.into(),
        }
    }

    /// Stage the failure is attributed to
    pub fn stage(&self) -> AnalysisStage {
        match self {
            AnalysisError::Decode { stage, .. } | AnalysisError::TaskFailed { stage, .. } => *stage,
            AnalysisError::RecognitionTimeout(_) | AnalysisError::RecognitionUnavailable(_) => {
                AnalysisStage::Recognition
            }
            AnalysisError::Persistence(_) => AnalysisStage::Persistence,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Decode { .. } => "DECODE_ERROR",
            AnalysisError::RecognitionTimeout(_) => "RECOGNITION_TIMEOUT",
            AnalysisError::RecognitionUnavailable(_) => "RECOGNITION_UNAVAILABLE",
            AnalysisError::Persistence(_) => "PERSISTENCE_ERROR",
            AnalysisError::TaskFailed { .. } => "TASK_FAILED",
        }
    }
}

impl From<sqlx::Error> for AnalysisError {
    fn from(err: sqlx::Error) -> Self {
        AnalysisError::Persistence(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Upload exceeds the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Fatal pipeline failure
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Analysis(err) => match err {
                AnalysisError::Decode {
                    stage: AnalysisStage::Metadata,
                    ..
                } => StatusCode::UNPROCESSABLE_ENTITY,
                AnalysisError::RecognitionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                AnalysisError::RecognitionUnavailable(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = match &self {
            ApiError::Analysis(err) => json!({
                "code": err.code(),
                "stage": err.stage(),
                "message": err.to_string(),
            }),
            ApiError::BadRequest(msg) => json!({ "code": "BAD_REQUEST", "message": msg }),
            ApiError::NotFound(msg) => json!({ "code": "NOT_FOUND", "message": msg }),
            ApiError::PayloadTooLarge(msg) => json!({ "code": "PAYLOAD_TOO_LARGE", "message": msg }),
            ApiError::Internal(msg) => json!({ "code": "INTERNAL_ERROR", "message": msg }),
        };

        let body = Json(json!({
            "message": "Error analyzing the image",
            "error": error,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_attribution() {
        assert_eq!(
            AnalysisError::decode(AnalysisStage::Palette, "bad").stage(),
            AnalysisStage::Palette
        );
        assert_eq!(
            AnalysisError::RecognitionTimeout(Duration::from_secs(1)).stage(),
            AnalysisStage::Recognition
        );
        assert_eq!(
            AnalysisError::Persistence("disk full".into()).stage(),
            AnalysisStage::Persistence
        );
    }

    #[test]
    fn test_status_mapping() {
        let metadata = ApiError::from(AnalysisError::decode(AnalysisStage::Metadata, "x"));
        assert_eq!(metadata.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let timeout = ApiError::from(AnalysisError::RecognitionTimeout(Duration::from_millis(5)));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let unavailable = ApiError::from(AnalysisError::RecognitionUnavailable("503".into()));
        assert_eq!(unavailable.status(), StatusCode::BAD_GATEWAY);

        let persistence = ApiError::from(AnalysisError::Persistence("locked".into()));
        assert_eq!(persistence.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_timeout_message() {
        let err = AnalysisError::RecognitionTimeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Recognition timed out after 250ms");
    }
}
