//! Recognition client tests against a local mock service

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use picta_ai::error::AnalysisError;
use picta_ai::extractors::RemoteRecognitionClient;
use picta_ai::types::Recognizer;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// What the mock service saw on its last request
#[derive(Default)]
struct Seen {
    authorization: Option<String>,
    model: Option<String>,
    body: Option<Value>,
}

#[derive(Clone)]
struct MockState {
    seen: Arc<Mutex<Seen>>,
    mode: &'static str,
}

async fn outputs(
    State(state): State<MockState>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    {
        let mut seen = state.seen.lock().unwrap();
        seen.authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.model = Some(model);
        seen.body = Some(body);
    }

    match state.mode {
        "ok" => Json(json!({
            "status": { "code": 10000, "description": "Ok" },
            "outputs": [{
                "data": { "concepts": [
                    { "name": "cat", "value": 0.99 },
                    { "name": "dog", "value": 0.50 }
                ]}
            }]
        }))
        .into_response(),
        "error" => (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response(),
        "garbage" => (StatusCode::OK, "not json").into_response(),
        "hang" => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::OK.into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Start the mock service and return its base URL and request log
async fn spawn_mock(mode: &'static str) -> (String, Arc<Mutex<Seen>>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let app = Router::new()
        .route("/v2/models/:model/outputs", post(outputs))
        .with_state(MockState {
            seen: Arc::clone(&seen),
            mode,
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), seen)
}

fn client(base_url: &str) -> RemoteRecognitionClient {
    RemoteRecognitionClient::new(Some("test-key".to_string()))
        .unwrap()
        .with_endpoint(base_url, "general")
}

#[tokio::test]
async fn test_successful_recognition() {
    let (base_url, seen) = spawn_mock("ok").await;

    let candidates = client(&base_url)
        .recognize(b"\x89PNG fake", Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].label, "cat");
    assert_eq!(candidates[1].label, "dog");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.authorization.as_deref(), Some("Key test-key"));
    assert_eq!(seen.model.as_deref(), Some("general"));
    let body = seen.body.as_ref().unwrap();
    assert_eq!(body["inputs"][0]["data"]["image"]["base64"], "iVBORyBmYWtl");
}

#[tokio::test]
async fn test_http_error_is_unavailable() {
    let (base_url, _) = spawn_mock("error").await;

    let err = client(&base_url)
        .recognize(b"img", Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::RecognitionUnavailable(ref m) if m.contains("503")));
}

#[tokio::test]
async fn test_malformed_body_is_unavailable() {
    let (base_url, _) = spawn_mock("garbage").await;

    let err = client(&base_url)
        .recognize(b"img", Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::RecognitionUnavailable(_)));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let (base_url, _) = spawn_mock("hang").await;

    let started = Instant::now();
    let err = client(&base_url)
        .recognize(b"img", Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::RecognitionTimeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_connection_refused_is_unavailable() {
    // Bind then drop to get a port with nothing listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr))
        .recognize(b"img", Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::RecognitionUnavailable(_)));
}
