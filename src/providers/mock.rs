/*!
 * Mock inference backend for testing.
 *
 * `MockBackend` answers generation requests through a caller-supplied
 * responder and records every request, so tests can assert how many
 * inference calls the engine made and which models it evicted.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use super::{GenerationRequest, InferenceBackend};

type Responder = dyn Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync;

/// Scripted backend for tests
#[derive(Clone)]
pub struct MockBackend {
    responder: Arc<Responder>,
    models: Arc<Vec<String>>,
    generate_calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    unloaded: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("models", &self.models)
            .field("generate_calls", &self.call_count())
            .finish()
    }
}

impl MockBackend {
    /// Create a backend that answers through the given responder
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            models: Arc::new(Vec::new()),
            generate_calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            unloaded: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Backend that always answers with the same text
    pub fn fixed(answer: impl Into<String>) -> Self {
        let answer = answer.into();
        Self::new(move |_| Ok(answer.clone()))
    }

    /// Backend whose generation always fails with a connection error
    pub fn failing() -> Self {
        Self::new(|_| Err(ProviderError::ConnectionError("backend unavailable".into())))
    }

    /// Declare the models the backend reports as available
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = Arc::new(models.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Sleep before answering each generation request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of generation requests received
    pub fn call_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Copies of every generation request received, in arrival order
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Models evicted through `unload`, in order
    pub fn unloaded(&self) -> Vec<String> {
        self.unloaded.lock().clone()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.responder)(&request)
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.models.as_ref().clone())
    }

    async fn unload(&self, model: &str) -> Result<(), ProviderError> {
        self.unloaded.lock().push(model.to_string());
        Ok(())
    }
}
