/*!
 * Lifecycle of a locally started inference server.
 *
 * When the configured endpoint is not serving, `ServerGuard::acquire` starts
 * `<server_command> serve` and waits for it to answer. The guard stops the
 * process it started on `shutdown` and, as a last resort, on drop.
 */

use log::{info, warn};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

use crate::app_config::BackendConfig;
use crate::errors::ProviderError;
use super::InferenceBackend;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Owns the server process if this run started it
#[derive(Debug, Default)]
pub struct ServerGuard {
    child: Option<Child>,
}

impl ServerGuard {
    /// Guard that owns nothing (server already running or unmanaged)
    pub fn external() -> Self {
        Self { child: None }
    }

    /// Whether this guard started the server
    pub fn owns_process(&self) -> bool {
        self.child.is_some()
    }

    /// Make sure the backend is serving, starting it if allowed
    pub async fn acquire<B: InferenceBackend + ?Sized>(
        backend: &B,
        config: &BackendConfig,
    ) -> Result<Self, ProviderError> {
        if backend.is_serving().await {
            info!("⚡ Inference server already running.");
            return Ok(Self::external());
        }

        if !config.manage_server {
            return Err(ProviderError::ConnectionError(format!(
                "Inference server at {} is not reachable",
                config.endpoint
            )));
        }

        info!("⚡ Starting inference server ({} serve)...", config.server_command);
        let child = Command::new(&config.server_command)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProviderError::ConnectionError(format!(
                    "Failed to start '{} serve': {}",
                    config.server_command, e
                ))
            })?;

        let mut guard = Self { child: Some(child) };

        let deadline = Instant::now() + Duration::from_secs(config.startup_timeout_secs);
        while Instant::now() < deadline {
            if backend.is_serving().await {
                info!("✅ Inference server is ready.");
                return Ok(guard);
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        guard.shutdown().await;
        Err(ProviderError::Timeout(format!(
            "Inference server did not become ready within {} seconds",
            config.startup_timeout_secs
        )))
    }

    /// Stop the process this guard started: graceful first, then forceful
    pub async fn shutdown(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        info!("🛑 Stopping inference server...");
        request_graceful_stop(&child).await;

        match tokio::time::timeout(GRACEFUL_STOP_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => info!("Inference server exited ({})", status),
            Ok(Err(e)) => warn!("Failed to wait for inference server: {}", e),
            Err(_) => {
                warn!("Inference server did not stop in time, killing it");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill inference server: {}", e);
                }
            }
        }
    }
}

#[cfg(unix)]
async fn request_graceful_stop(child: &Child) {
    if let Some(pid) = child.id() {
        let result = Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .status()
            .await;
        if let Err(e) = result {
            warn!("Failed to signal inference server: {}", e);
        }
    }
}

#[cfg(not(unix))]
async fn request_graceful_stop(_child: &Child) {}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}
