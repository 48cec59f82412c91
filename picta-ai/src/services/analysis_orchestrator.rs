//! Analysis Orchestrator
//!
//! Single entry point of the pipeline: fans one image out to the three analyzers,
//! joins them, applies the failure policy, filters recognition labels and commits the
//! aggregate record exactly once.
//!
//! # Concurrency
//! - Metadata and palette extraction run on the blocking pool (CPU-bound)
//! - Recognition runs on the async runtime, bounded by `recognition_timeout`
//! - `tokio::join!` is the barrier: every branch settles before any decision is made,
//!   so a failing branch never cancels the others
//!
//! # Failure Policy
//! - Metadata failure always escalates (no record exists without dimensions)
//! - Palette and recognition failures degrade to empty containers by default and can
//!   be configured to escalate
//! - Persistence failure always escalates
//! - With several escalated failures, the first in stage order is reported
//!   (metadata, palette, recognition)
//!
//! No retries happen here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use picta_common::config::StagePolicy;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::error::AnalysisError;
use crate::extractors::recognition_client::DEFAULT_TIMEOUT;
use crate::filter::{filter_labels, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::types::{
    AnalysisOutcome, AnalysisStage, Degradation, MetadataExtractor, NewAnalysisRecord,
    PaletteExtractor, RecognitionResult, Recognizer, RecordStore,
};

/// Per-stage failure handling for the non-critical stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailurePolicy {
    pub palette: StagePolicy,
    pub recognition: StagePolicy,
}

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Minimum confidence for a recognized label to be recorded
    pub confidence_threshold: f32,
    /// Upper bound on the recognition branch
    pub recognition_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            recognition_timeout: DEFAULT_TIMEOUT,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Coordinates one analysis per call; holds no per-request state
pub struct AnalysisOrchestrator {
    metadata: Arc<dyn MetadataExtractor>,
    palette: Arc<dyn PaletteExtractor>,
    recognizer: Arc<dyn Recognizer>,
    store: Arc<dyn RecordStore>,
    config: OrchestratorConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        metadata: Arc<dyn MetadataExtractor>,
        palette: Arc<dyn PaletteExtractor>,
        recognizer: Arc<dyn Recognizer>,
        store: Arc<dyn RecordStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            metadata,
            palette,
            recognizer,
            store,
            config,
        }
    }

    /// Analyze one image and persist the aggregate record
    ///
    /// # Errors
    /// - Metadata `Decode` (always)
    /// - Palette / recognition errors when their policy is `Escalate`
    /// - `Persistence` when the store rejects the write
    pub async fn analyze(
        &self,
        filename: &str,
        image: Arc<[u8]>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();
        debug!(filename = %filename, bytes = image.len(), "Starting image analysis");

        let metadata_task = {
            let extractor = Arc::clone(&self.metadata);
            let image = Arc::clone(&image);
            tokio::task::spawn_blocking(move || extractor.extract_dimensions(&image))
        };

        let palette_task = {
            let extractor = Arc::clone(&self.palette);
            let image = Arc::clone(&image);
            tokio::task::spawn_blocking(move || extractor.extract_palette(&image))
        };

        let (metadata, palette, recognition) =
            tokio::join!(metadata_task, palette_task, self.recognize_bounded(&image));

        let metadata = settle(AnalysisStage::Metadata, metadata);
        let palette = settle(AnalysisStage::Palette, palette);

        debug!(
            filename = %filename,
            metadata_ok = metadata.is_ok(),
            palette_ok = palette.is_ok(),
            recognition_ok = recognition.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "All analysis branches settled"
        );

        let dimensions = metadata.map_err(|e| escalate(filename, e))?;

        let mut degraded = Vec::new();
        let dominant_colors = apply_policy(
            AnalysisStage::Palette,
            self.config.failure_policy.palette,
            palette,
            &mut degraded,
        )
        .map_err(|e| escalate(filename, e))?;

        let candidates: RecognitionResult = apply_policy(
            AnalysisStage::Recognition,
            self.config.failure_policy.recognition,
            recognition,
            &mut degraded,
        )
        .map_err(|e| escalate(filename, e))?;

        let object_recognition = filter_labels(&candidates, self.config.confidence_threshold);
        debug!(
            candidates = candidates.len(),
            kept = object_recognition.len(),
            threshold = self.config.confidence_threshold,
            "Recognition labels filtered"
        );

        let record = NewAnalysisRecord {
            filename: filename.to_string(),
            dimensions,
            dominant_colors,
            object_recognition,
        };

        let record = self.store.save(record).await.map_err(|e| {
            let e = match e {
                AnalysisError::Persistence(_) => e,
                other => AnalysisError::Persistence(other.to_string()),
            };
            escalate(filename, e)
        })?;

        info!(
            id = %record.id,
            filename = %record.filename,
            width = record.dimensions.width,
            height = record.dimensions.height,
            colors = record.dominant_colors.len(),
            labels = record.object_recognition.len(),
            degraded = degraded.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Image analysis persisted"
        );

        Ok(AnalysisOutcome { record, degraded })
    }

    /// Recognition call that cannot outlive the configured timeout
    async fn recognize_bounded(&self, image: &[u8]) -> Result<RecognitionResult, AnalysisError> {
        let timeout = self.config.recognition_timeout;
        match tokio::time::timeout(timeout, self.recognizer.recognize(image, timeout)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(recognizer = self.recognizer.name(), "Recognition call exceeded timeout");
                Err(AnalysisError::RecognitionTimeout(timeout))
            }
        }
    }
}

/// Collapse a blocking task's join result into the stage result
fn settle<T>(
    stage: AnalysisStage,
    joined: Result<Result<T, AnalysisError>, JoinError>,
) -> Result<T, AnalysisError> {
    joined.unwrap_or_else(|e| {
        Err(AnalysisError::TaskFailed {
            stage,
            message: e.to_string(),
        })
    })
}

/// Degrade to `T::default()` or pass the error through, per policy
fn apply_policy<T: Default>(
    stage: AnalysisStage,
    policy: StagePolicy,
    result: Result<T, AnalysisError>,
    degraded: &mut Vec<Degradation>,
) -> Result<T, AnalysisError> {
    match (result, policy) {
        (Ok(value), _) => Ok(value),
        (Err(e), StagePolicy::Escalate) => Err(e),
        (Err(e), StagePolicy::Degrade) => {
            warn!(stage = %stage, error = %e, "Analysis stage failed, substituting empty result");
            degraded.push(Degradation {
                stage,
                reason: e.to_string(),
            });
            Ok(T::default())
        }
    }
}

fn escalate(filename: &str, err: AnalysisError) -> AnalysisError {
    error!(filename = %filename, stage = %err.stage(), error = %err, "Image analysis failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrade_substitutes_default_and_records_reason() {
        let mut degraded = Vec::new();
        let result: Result<Vec<String>, _> = apply_policy(
            AnalysisStage::Palette,
            StagePolicy::Degrade,
            Err(AnalysisError::decode(AnalysisStage::Palette, "corrupt scanline")),
            &mut degraded,
        );

        assert_eq!(result.unwrap(), Vec::<String>::new());
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].stage, AnalysisStage::Palette);
        assert!(degraded[0].reason.contains("corrupt scanline"));
    }

    #[test]
    fn test_escalate_passes_error_through() {
        let mut degraded = Vec::new();
        let result: Result<Vec<String>, _> = apply_policy(
            AnalysisStage::Recognition,
            StagePolicy::Escalate,
            Err(AnalysisError::RecognitionUnavailable("down".into())),
            &mut degraded,
        );

        assert!(matches!(result, Err(AnalysisError::RecognitionUnavailable(_))));
        assert!(degraded.is_empty());
    }

    #[test]
    fn test_success_ignores_policy() {
        let mut degraded = Vec::new();
        let result = apply_policy(
            AnalysisStage::Palette,
            StagePolicy::Escalate,
            Ok(vec![1, 2, 3]),
            &mut degraded,
        );
        assert_eq!(result.unwrap(), vec![1, 2, 3]);
        assert!(degraded.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.confidence_threshold, 0.95);
        assert_eq!(config.recognition_timeout, Duration::from_secs(10));
        assert_eq!(config.failure_policy.palette, StagePolicy::Degrade);
        assert_eq!(config.failure_policy.recognition, StagePolicy::Degrade);
    }
}
