use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::BackendConfig;
use crate::errors::ProviderError;
use super::InferenceBackend;

/// Ollama client for interacting with Ollama API
#[derive(Debug, Clone)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for generation requests (long timeout)
    client: Client,
    /// HTTP client for status and unload requests (short timeout)
    status_client: Client,
}

/// How long the backend keeps a model resident after a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeepAlive {
    /// Duration string such as "5m"
    Duration(String),
    /// Seconds; zero evicts the model immediately
    Seconds(i64),
}

/// Generate request for the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    pub model: String,
    /// Prompt to generate from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<KeepAlive>,
}

/// Generation options for the Ollama API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Context window size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    /// Number of CPU threads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
}

/// One line of a streamed generation response
#[derive(Debug, Deserialize)]
struct GenerationChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Response of the model listing endpoint
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

impl GenerationRequest {
    /// Create a new streamed generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: Some(prompt.into()),
            options: None,
            stream: Some(true),
            keep_alive: None,
        }
    }

    /// Create a request that evicts the model (`keep_alive: 0`, no prompt)
    pub fn unload(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: None,
            options: None,
            stream: None,
            keep_alive: Some(KeepAlive::Seconds(0)),
        }
    }

    /// Apply the sampling options and keep-alive from backend configuration
    pub fn with_backend_config(mut self, config: &BackendConfig) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(config.temperature),
            num_ctx: Some(config.context_size),
            num_thread: config.thread_count,
        });
        self.keep_alive = Some(KeepAlive::Duration(config.keep_alive.clone()));
        self
    }
}

/// Concatenate the `response` fragments of a newline-delimited JSON stream
///
/// Lines that are not valid JSON contribute nothing; a line carrying an
/// `error` field fails the whole call.
pub fn assemble_stream(body: &str) -> Result<String, ProviderError> {
    let mut output = String::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<GenerationChunk>(line) {
            Ok(chunk) => {
                if let Some(message) = chunk.error {
                    return Err(ProviderError::ApiError {
                        status_code: 200,
                        message,
                    });
                }
                if let Some(part) = chunk.response {
                    output.push_str(&part);
                }
            }
            Err(e) => {
                warn!("Skipping malformed response line ({}): {}", e, truncate(line, 120));
            }
        }
    }

    Ok(output)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

impl Ollama {
    /// Create a new Ollama client for the given endpoint URL
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        let base_url = normalize_endpoint(&endpoint);

        Self {
            base_url,
            client: Client::builder()
                .timeout(timeout)
                // Ollama uses HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            status_client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a client from backend configuration
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_generate(&self, client: &Client, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response.text().await?)
    }
}

/// Turn "host:port" or a full URL into a base URL without trailing slash
fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let with_scheme = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    match url::Url::parse(&with_scheme) {
        Ok(url) => url.as_str().trim_end_matches('/').to_string(),
        Err(_) => with_scheme,
    }
}

#[async_trait]
impl InferenceBackend for Ollama {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        debug!("Generating with {} ({} prompt chars)",
               request.model,
               request.prompt.as_deref().map(|p| p.chars().count()).unwrap_or(0));

        let body = self.post_generate(&self.client, &request).await?;
        assemble_stream(&body)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.status_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn unload(&self, model: &str) -> Result<(), ProviderError> {
        debug!("Unloading model {}", model);
        self.post_generate(&self.status_client, &GenerationRequest::unload(model))
            .await
            .map(|_| ())
    }
}
