//! Image upload and analysis
//!
//! POST /upload (multipart/form-data, field `image`)

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    types::{AnalysisRecord, Degradation},
    AppState,
};

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Filename used when the part carries none
pub const FALLBACK_FILENAME: &str = "upload";

/// Room for boundaries, part headers and small extra fields on top of the file limit
pub const MULTIPART_ENVELOPE_HEADROOM: usize = 64 * 1024;

/// POST /upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub data: AnalysisRecord,
    /// Stages that failed and were substituted with empty results
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

/// An uploaded image part
struct ImagePart {
    filename: String,
    bytes: Arc<[u8]>,
}

/// POST /upload
///
/// Runs the full analysis and returns the persisted record.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("Expected multipart form: {}", e)))?;

    let part = read_image_part(multipart, state.max_upload_bytes).await?;

    tracing::info!(
        filename = %part.filename,
        bytes = part.bytes.len(),
        "Image upload received"
    );

    let outcome = match state.orchestrator.analyze(&part.filename, part.bytes).await {
        Ok(outcome) => outcome,
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            return Err(e.into());
        }
    };

    Ok(Json(UploadResponse {
        message: "Image analysis completed successfully".to_string(),
        data: outcome.record,
        degraded: outcome.degraded,
    }))
}

/// Find the `image` field; other fields are skipped
///
/// The file itself may be at most `max_file_bytes` long.
async fn read_image_part(mut multipart: Multipart, max_file_bytes: usize) -> ApiResult<ImagePart> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::BadRequest(format!(
                "Only image uploads are accepted (got '{}')",
                content_type
            )));
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > max_file_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "Image exceeds the {} byte upload limit",
                    max_file_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(ImagePart {
            filename,
            bytes: Arc::from(bytes),
        });
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        IMAGE_FIELD
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Build upload routes for files of at most `max_upload_bytes`
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_image))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_ENVELOPE_HEADROOM),
        ))
}
