//! Health check endpoint
//!
//! Status is `ok` until an analysis fails fatally, then `degraded` with the failure
//! kept in `last_error` for diagnostics.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Service condition reported by `/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
}

impl ServiceStatus {
    fn from_last_error(last_error: Option<&str>) -> Self {
        match last_error {
            Some(_) => ServiceStatus::Degraded,
            None => ServiceStatus::Ok,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: ServiceStatus,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: ServiceStatus::from_last_error(last_error.as_deref()),
        module: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        last_error,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_last_error() {
        assert_eq!(ServiceStatus::from_last_error(None), ServiceStatus::Ok);
        assert_eq!(
            ServiceStatus::from_last_error(Some("Persistence error: disk full")),
            ServiceStatus::Degraded
        );
        assert_eq!(serde_json::to_value(ServiceStatus::Degraded).unwrap(), "degraded");
    }
}
