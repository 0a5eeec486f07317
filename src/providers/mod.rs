/*!
 * Inference backend implementations.
 *
 * This module contains the client side of the locally hosted text-generation
 * server the engine talks to:
 * - `ollama`: HTTP client for the Ollama API
 * - `mock`: scripted backend used by tests
 * - `server`: lifecycle guard for a locally started `ollama serve` process
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

pub mod mock;
pub mod ollama;
pub mod server;

pub use self::ollama::{GenerationOptions, GenerationRequest, KeepAlive, Ollama};

/// Common trait for inference backends
///
/// The engine only needs synchronous text-in/text-out generation, a model
/// listing for readiness checks, and a way to evict a model between
/// language groups.
#[async_trait]
pub trait InferenceBackend: Send + Sync + Debug {
    /// Run one generation request and return the assembled output text
    async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;

    /// List the model variants the backend has available
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;

    /// Ask the backend to evict a model from memory
    async fn unload(&self, model: &str) -> Result<(), ProviderError>;

    /// Whether the backend answers at all
    async fn is_serving(&self) -> bool {
        self.list_models().await.is_ok()
    }

    /// Check that every required model variant is present
    ///
    /// A backend that answers but lacks a variant is not ready.
    async fn ensure_models(&self, required: &[String]) -> Result<(), ProviderError> {
        let available = self.list_models().await?;
        let missing: Vec<String> = required
            .iter()
            .filter(|model| !available.iter().any(|name| model_names_match(name, model)))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::ModelMissing(missing))
        }
    }
}

/// Compare model names, treating an untagged name as `:latest`
pub fn model_names_match(available: &str, required: &str) -> bool {
    fn with_tag(name: &str) -> String {
        if name.contains(':') {
            name.to_string()
        } else {
            format!("{}:latest", name)
        }
    }

    with_tag(available.trim()) == with_tag(required.trim())
}
