//! Stored analysis lookup
//!
//! GET /analyses/:id

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    types::AnalysisRecord,
    AppState,
};

/// GET /analyses/:id
///
/// Returns the stored record, 404 if unknown, 400 if the id is not a UUID.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisRecord>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid analysis id: {}", id)))?;

    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Analysis not found: {}", id)))?;

    Ok(Json(record))
}

/// Build analysis lookup routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/analyses/:id", get(get_analysis))
}
