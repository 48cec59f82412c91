//! Recognition Client
//!
//! Sends the image (base64) to a remote general-purpose recognition model and returns
//! the ranked `{name, value}` concepts it answers with, unfiltered.
//!
//! # API Reference
//! - Endpoint: `POST {base_url}/v2/models/{model_id}/outputs`
//! - Auth: `Authorization: Key <api key>`
//! - Request: `{"inputs":[{"data":{"image":{"base64":"..."}}}]}`
//! - Response: `outputs[0].data.concepts[] = {name, value}`, plus a service status
//!   whose code is 10000 on success

use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::types::{RecognitionCandidate, RecognitionResult, Recognizer};

/// Recognition service base URL
pub const DEFAULT_BASE_URL: &str = "https://api.clarifai.com";

/// General object/concept model
pub const DEFAULT_MODEL_ID: &str = "general-image-recognition";

/// Default bounded wait for one recognition call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Service-level success code carried in the response body
const STATUS_SUCCESS: u32 = 10000;

const USER_AGENT: &str = concat!("picta-ai/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the remote recognition model
pub struct RemoteRecognitionClient {
    http_client: Client,
    base_url: String,
    model_id: String,
    api_key: Option<String>,
}

impl RemoteRecognitionClient {
    /// Create a client against the default endpoint
    ///
    /// A missing key is allowed; every call then fails with `RecognitionUnavailable`.
    pub fn new(api_key: Option<String>) -> Result<Self, AnalysisError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AnalysisError::RecognitionUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Point the client at another service root and model
    pub fn with_endpoint(mut self, base_url: impl Into<String>, model_id: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.model_id = model_id.into();
        self
    }

    fn outputs_url(&self) -> String {
        format!(
            "{}/v2/models/{}/outputs",
            self.base_url.trim_end_matches('/'),
            self.model_id
        )
    }
}

#[async_trait]
impl Recognizer for RemoteRecognitionClient {
    fn name(&self) -> &'static str {
        "remote-recognition"
    }

    async fn recognize(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<RecognitionResult, AnalysisError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AnalysisError::RecognitionUnavailable("recognition API key not configured".to_string())
        })?;

        let request = PredictRequest {
            inputs: vec![PredictInput {
                data: InputData {
                    image: InputImage {
                        base64: base64::engine::general_purpose::STANDARD.encode(image),
                    },
                },
            }],
        };

        let url = self.outputs_url();
        debug!(url = %url, bytes = image.len(), "Sending image to recognition service");

        let response = self
            .http_client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Key {}", api_key))
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::RecognitionUnavailable(format!(
                "recognition service returned {}: {}",
                status, body
            )));
        }

        let parsed: PredictResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisError::RecognitionTimeout(timeout)
            } else {
                AnalysisError::RecognitionUnavailable(format!("malformed response body: {}", e))
            }
        })?;

        let candidates = candidates_from_response(parsed)?;
        debug!(candidates = candidates.len(), "Recognition response parsed");
        Ok(candidates)
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> AnalysisError {
    if err.is_timeout() {
        AnalysisError::RecognitionTimeout(timeout)
    } else {
        AnalysisError::RecognitionUnavailable(format!("request failed: {}", err))
    }
}

/// Concepts of the first output, in model order
///
/// Absent `outputs`/`data`/`concepts` yield an empty result. Concepts without a name
/// or value, or with a confidence outside `[0, 1]`, are skipped.
fn candidates_from_response(response: PredictResponse) -> Result<RecognitionResult, AnalysisError> {
    if let Some(status) = &response.status {
        if status.code != STATUS_SUCCESS {
            return Err(AnalysisError::RecognitionUnavailable(format!(
                "recognition service status {}: {}",
                status.code, status.description
            )));
        }
    }

    let concepts = response
        .outputs
        .into_iter()
        .next()
        .and_then(|output| output.data)
        .map(|data| data.concepts)
        .unwrap_or_default();

    Ok(concepts
        .into_iter()
        .filter_map(|c| Some(RecognitionCandidate::new(c.name?, c.value?)))
        .filter(|c| {
            let in_range = (0.0..=1.0).contains(&c.confidence);
            if !in_range {
                warn!(
                    label = %c.label,
                    confidence = c.confidence,
                    "Dropping concept with out-of-range confidence"
                );
            }
            in_range
        })
        .collect())
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct PredictRequest {
    inputs: Vec<PredictInput>,
}

#[derive(Debug, Serialize)]
struct PredictInput {
    data: InputData,
}

#[derive(Debug, Serialize)]
struct InputData {
    image: InputImage,
}

#[derive(Debug, Serialize)]
struct InputImage {
    base64: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    status: Option<ServiceStatus>,
    #[serde(default)]
    outputs: Vec<PredictOutput>,
}

#[derive(Debug, Deserialize)]
struct ServiceStatus {
    code: u32,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct PredictOutput {
    #[serde(default)]
    data: Option<OutputData>,
}

#[derive(Debug, Deserialize)]
struct OutputData {
    #[serde(default)]
    concepts: Vec<Concept>,
}

#[derive(Debug, Deserialize)]
struct Concept {
    name: Option<String>,
    value: Option<f32>,
}
