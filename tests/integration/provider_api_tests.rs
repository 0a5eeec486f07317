/*!
 * Integration tests for the Ollama client against a mock HTTP server
 */

use resxforge::app_config::BackendConfig;
use resxforge::errors::ProviderError;
use resxforge::providers::server::ServerGuard;
use resxforge::providers::{GenerationRequest, InferenceBackend, Ollama};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Ollama {
    Ollama::new(server.uri(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_generate_withStreamedLines_shouldConcatenateFragments() {
    let mock_server = MockServer::start().await;
    let body = concat!(
        "{\"response\":\"Enre\",\"done\":false}\n",
        "garbage line\n",
        "{\"response\":\"gistrer\",\"done\":false}\n",
        "{\"done\":true}\n"
    );

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "translategemma:27b", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = GenerationRequest::new("translategemma:27b", "Save").with_backend_config(&BackendConfig::default());
    let output = client(&mock_server).generate(request).await.unwrap();

    assert_eq!(output, "Enregistrer");
}

#[tokio::test]
async fn test_generate_withServerError_shouldReturnApiError() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server)
        .generate(GenerationRequest::new("translategemma:27b", "Save"))
        .await;

    match result {
        Err(ProviderError::ApiError { status_code, message }) => {
            assert_eq!(status_code, 500);
            assert_eq!(message, "model crashed");
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_withOptions_shouldSendSamplingAndKeepAlive() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "options": {"temperature": 0.0, "num_ctx": 4096},
            "keep_alive": "5m"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\":\"ok\"}\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = GenerationRequest::new("translategemma:27b", "OK").with_backend_config(&BackendConfig::default());
    assert_eq!(client(&mock_server).generate(request).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_unload_shouldPostZeroKeepAlive() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({"model": "translategemma:12b", "keep_alive": 0})))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"done\":true}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server).unload("translategemma:12b").await.unwrap();
}

#[tokio::test]
async fn test_ensureModels_withMissingVariant_shouldNameIt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "translategemma:27b"}, {"name": "llama3:latest"}]
        })))
        .mount(&mock_server)
        .await;

    let ollama = client(&mock_server);
    ollama
        .ensure_models(&["translategemma:27b".to_string(), "llama3".to_string()])
        .await
        .unwrap();

    let missing = ollama
        .ensure_models(&["translategemma:27b".to_string(), "translategemma:12b".to_string()])
        .await;
    match missing {
        Err(ProviderError::ModelMissing(models)) => assert_eq!(models, vec!["translategemma:12b".to_string()]),
        other => panic!("expected ModelMissing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_serverGuard_withServingBackend_shouldNotOwnProcess() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&mock_server)
        .await;

    let config = BackendConfig {
        endpoint: mock_server.uri(),
        manage_server: false,
        ..BackendConfig::default()
    };
    let guard = ServerGuard::acquire(&client(&mock_server), &config).await.unwrap();

    assert!(!guard.owns_process());
}

#[tokio::test]
async fn test_serverGuard_withUnmanagedDeadEndpoint_shouldFail() {
    let config = BackendConfig {
        endpoint: "http://127.0.0.1:9".to_string(),
        manage_server: false,
        ..BackendConfig::default()
    };
    let ollama = Ollama::from_config(&config);

    let result = ServerGuard::acquire(&ollama, &config).await;

    assert!(matches!(result, Err(ProviderError::ConnectionError(_))));
}
