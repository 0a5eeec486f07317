/*!
 * Debounced hot reload of glossary.json and echo.json.
 *
 * A background task polls the files' modification time and size. Once a
 * change has been quiet for the debounce period the file is parsed, the
 * shared snapshot is swapped, and newly added glossary terms are patched into
 * the language caches. A file that fails to parse, or that has been deleted,
 * leaves the previous snapshot in place.
 */

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::task::JoinHandle;

use crate::errors::ConfigError;
use super::cache::CacheRegistry;
use super::glossary::{self, SharedSnapshot};

/// How often watched files are checked
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Observable state of a file; `None` when it does not exist
type Fingerprint = Option<(SystemTime, u64)>;

async fn fingerprint(path: &Path) -> Fingerprint {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

/// Change tracking for one file
#[derive(Debug)]
struct Debouncer {
    last_seen: Fingerprint,
    pending_since: Option<Instant>,
    quiet_period: Duration,
}

impl Debouncer {
    fn new(initial: Fingerprint, quiet_period: Duration) -> Self {
        Self {
            last_seen: initial,
            pending_since: None,
            quiet_period,
        }
    }

    /// Feed the current fingerprint; true once a change has settled
    fn observe(&mut self, current: Fingerprint, now: Instant) -> bool {
        if current != self.last_seen {
            self.last_seen = current;
            self.pending_since = Some(now);
            return false;
        }

        match self.pending_since {
            Some(since) if now.duration_since(since) >= self.quiet_period => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

/// A watched file removed mid-run is a failed reload, not an empty table
fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    Err(ConfigError::NotFound {
        path: path.display().to_string(),
    })
}

/// Reload glossary.json, swap it in and patch caches with new terms
///
/// Returns the number of cache entries patched.
pub async fn reload_glossary(
    path: &Path,
    snapshot: &SharedSnapshot,
    registry: &CacheRegistry,
) -> Result<usize, ConfigError> {
    require_file(path)?;
    let table = glossary::load_glossary(path)?;
    let previous = snapshot.replace_glossary(table.clone());

    let new_terms = table.new_terms_since(&previous.glossary);
    if new_terms.is_empty() {
        return Ok(0);
    }

    debug!(
        "New glossary terms: {}",
        new_terms.values().map(Vec::len).sum::<usize>()
    );
    Ok(registry.apply_glossary_patch(&new_terms).await)
}

/// Reload echo.json and swap it in
pub fn reload_exclusions(path: &Path, snapshot: &SharedSnapshot) -> Result<(), ConfigError> {
    require_file(path)?;
    let exclusions = glossary::load_exclusions(path)?;
    snapshot.replace_exclusions(exclusions);
    Ok(())
}

/// Running watcher task; stopped on drop
#[derive(Debug)]
pub struct ConfigWatcher {
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching the glossary and exclusion files
    pub async fn spawn(
        glossary_path: PathBuf,
        echo_path: PathBuf,
        snapshot: SharedSnapshot,
        registry: CacheRegistry,
        debounce: Duration,
    ) -> Self {
        let mut glossary_changes = Debouncer::new(fingerprint(&glossary_path).await, debounce);
        let mut echo_changes = Debouncer::new(fingerprint(&echo_path).await, debounce);
        info!("👀 glossary.json hot-reload enabled.");
        info!("👀 echo.json hot-reload enabled.");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                let now = Instant::now();

                if glossary_changes.observe(fingerprint(&glossary_path).await, now) {
                    match reload_glossary(&glossary_path, &snapshot, &registry).await {
                        Ok(patched) => info!("♻ glossary.json changed, reloaded ({} cache entries patched).", patched),
                        Err(e) => warn!("⚠ glossary.json reload failed, keeping previous glossary: {}", e),
                    }
                }

                if echo_changes.observe(fingerprint(&echo_path).await, now) {
                    match reload_exclusions(&echo_path, &snapshot) {
                        Ok(()) => info!("♻ echo.json changed, reloaded."),
                        Err(e) => warn!("⚠ echo.json reload failed, keeping previous exclusions: {}", e),
                    }
                }
            }
        });

        Self { task }
    }

    /// Stop watching
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
