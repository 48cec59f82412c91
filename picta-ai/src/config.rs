//! Configuration resolution for picta-ai
//!
//! Resolves analyzer settings from ENV → TOML → compiled defaults.

use picta_common::config::{LoggingConfig, TomlConfig};
use picta_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::extractors::palette_extractor::DEFAULT_SAMPLE_STRIDE;
use crate::extractors::recognition_client::{DEFAULT_BASE_URL, DEFAULT_MODEL_ID, DEFAULT_TIMEOUT};
use crate::filter::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::services::{FailurePolicy, OrchestratorConfig};

/// Environment variable carrying the recognition API key
pub const RECOGNITION_API_KEY_ENV: &str = "PICTA_RECOGNITION_API_KEY";

/// Default upload limit (4 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;

/// Fully resolved analyzer settings
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub recognition_api_key: Option<String>,
    pub recognition_base_url: String,
    pub recognition_model_id: String,
    pub recognition_timeout: Duration,
    pub confidence_threshold: f32,
    pub failure_policy: FailurePolicy,
    pub max_upload_bytes: usize,
    pub palette_sample_stride: usize,
}

impl AnalyzerSettings {
    /// Resolve settings from the environment and TOML config
    ///
    /// # Errors
    /// `Error::Config` for out-of-range values.
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        let recognition_api_key = resolve_recognition_api_key(toml_config);
        let recognition = &toml_config.recognition;
        let analysis = &toml_config.analysis;

        let confidence_threshold = analysis
            .confidence_threshold
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(Error::Config(format!(
                "analysis.confidence_threshold must be within [0.0, 1.0], got {}",
                confidence_threshold
            )));
        }

        let recognition_timeout = match recognition.timeout_ms {
            Some(0) => {
                return Err(Error::Config(
                    "recognition.timeout_ms must be greater than zero".to_string(),
                ))
            }
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_TIMEOUT,
        };

        let max_upload_bytes = match analysis.max_upload_bytes {
            Some(0) => {
                return Err(Error::Config(
                    "analysis.max_upload_bytes must be greater than zero".to_string(),
                ))
            }
            Some(bytes) => bytes,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            recognition_api_key,
            recognition_base_url: recognition
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            recognition_model_id: recognition
                .model_id
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            recognition_timeout,
            confidence_threshold,
            failure_policy: FailurePolicy {
                palette: analysis.palette_failure.unwrap_or_default(),
                recognition: analysis.recognition_failure.unwrap_or_default(),
            },
            max_upload_bytes,
            palette_sample_stride: analysis
                .palette_sample_stride
                .unwrap_or(DEFAULT_SAMPLE_STRIDE)
                .max(1),
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            confidence_threshold: self.confidence_threshold,
            recognition_timeout: self.recognition_timeout,
            failure_policy: self.failure_policy,
        }
    }
}

/// Recognition API key, ENV → TOML
///
/// A missing key is not an error: recognition then fails per call and is handled by
/// the recognition failure policy.
fn resolve_recognition_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(RECOGNITION_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .recognition
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    match (env_key, toml_key) {
        (Some(env), Some(_)) => {
            warn!(
                "Recognition API key found in environment and TOML. Using environment (highest priority)."
            );
            Some(env)
        }
        (Some(env), None) => {
            info!("Recognition API key loaded from environment variable");
            Some(env)
        }
        (None, Some(toml)) => {
            info!("Recognition API key loaded from TOML config");
            Some(toml)
        }
        (None, None) => {
            warn!(
                "Recognition API key not configured (set {} or recognition.api_key); \
                 recognition will be unavailable",
                RECOGNITION_API_KEY_ENV
            );
            None
        }
    }
}

/// `EnvFilter` directives for the `[logging]` level, used when `RUST_LOG` is unset
pub fn log_filter_directives(logging: &LoggingConfig) -> String {
    let level = logging.level.trim().to_ascii_lowercase();
    format!("picta_ai={0},picta_common={0},tower_http=info", level)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
