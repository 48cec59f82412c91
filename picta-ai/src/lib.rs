//! picta-ai library interface
//!
//! Image analysis service: dimensions, dominant colors and recognized objects are
//! computed concurrently and persisted as one record.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod services;
pub mod types;

pub use crate::error::{AnalysisError, ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::AnalysisOrchestrator;
use crate::types::RecordStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Analysis pipeline
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Record store, for lookups
    pub store: Arc<dyn RecordStore>,
    /// Maximum accepted upload body size
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last fatal analysis error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<AnalysisOrchestrator>,
        store: Arc<dyn RecordStore>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            orchestrator,
            store,
            max_upload_bytes,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes(state.max_upload_bytes))
        .merge(api::analysis_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
