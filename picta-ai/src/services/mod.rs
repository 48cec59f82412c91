//! Business logic services for picta-ai

pub mod analysis_orchestrator;

pub use analysis_orchestrator::{AnalysisOrchestrator, FailurePolicy, OrchestratorConfig};
