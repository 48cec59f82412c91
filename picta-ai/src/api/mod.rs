//! HTTP API handlers for picta-ai
//!
//! POST /upload, GET /analyses/:id, GET /health

pub mod analyses;
pub mod health;
pub mod upload;

pub use analyses::analysis_routes;
pub use health::health_routes;
pub use upload::upload_routes;
