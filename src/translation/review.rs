/*!
 * Review artifacts.
 *
 * Flagged translations are appended to a review log as they happen; every
 * resolved entry is also collected into a summary written once at the end
 * of the run.
 */

use log::warn;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

const SEPARATOR_WIDTH: usize = 60;

/// A translation the heuristics flagged
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewEntry {
    /// Page (base file stem) the entry belongs to
    pub page: String,
    /// Target language
    pub language: String,
    /// Resource key
    pub key: String,
    /// Source text
    pub source: String,
    /// Accepted translation
    pub output: String,
}

impl ReviewEntry {
    /// Header line shared by the review log and the summary
    pub fn header(&self) -> String {
        format!("⚠ {} [{} {}]", self.page, self.language, self.key)
    }

    fn render(&self) -> String {
        format!(
            "{}\nSource: {}\nOutput: {}\n{}\n",
            self.header(),
            self.source,
            self.output,
            "-".repeat(SEPARATOR_WIDTH)
        )
    }
}

/// Append-only review log with per-page suppression
#[derive(Debug, Clone)]
pub struct ReviewLog {
    path: PathBuf,
    excluded_pages: Arc<HashSet<String>>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ReviewLog {
    /// Review log at `path`; entries from `excluded_pages` are never written
    pub fn new(path: impl Into<PathBuf>, excluded_pages: &[String]) -> Self {
        Self {
            path: path.into(),
            excluded_pages: Arc::new(
                excluded_pages
                    .iter()
                    .filter(|p| !p.trim().is_empty())
                    .map(|p| p.to_lowercase())
                    .collect(),
            ),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Log file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether flagged entries from `page` are suppressed
    pub fn is_suppressed(&self, page: &str) -> bool {
        self.excluded_pages.contains(&page.to_lowercase())
    }

    /// Append a flagged entry unless its page is suppressed
    ///
    /// Returns whether the entry was recorded. Write failures are logged and
    /// otherwise ignored.
    pub async fn record(&self, entry: &ReviewEntry) -> bool {
        if self.is_suppressed(&entry.page) {
            return false;
        }

        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.append(&entry.render()).await {
            warn!("⚠ Failed to write review log: {}", e);
        }
        true
    }

    async fn append(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }
}

/// End-of-run record of every resolved entry
#[derive(Debug, Clone, Default)]
pub struct SummaryLog {
    buffer: Arc<Mutex<String>>,
}

impl SummaryLog {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved translation
    pub fn record(&self, language: &str, key: &str, translation: &str) {
        let mut buffer = self.buffer.lock();
        buffer.push_str(&format!("{} {} | {}\n\n", language, key, translation));
    }

    /// Record a flagged translation
    pub fn record_flag(&self, entry: &ReviewEntry) {
        let mut buffer = self.buffer.lock();
        buffer.push_str(&format!(
            "{}\nSource: {}\nOutput: {}\n\n",
            entry.header(),
            entry.source,
            entry.output
        ));
    }

    /// Summary text collected so far
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Write the summary to `<dir>/<name>.log`
    pub async fn write(&self, dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.log", name));
        tokio::fs::write(&path, self.contents()).await?;
        Ok(path)
    }
}

/// Summary file stem for a run
///
/// Page filters joined with '_', else the single selected directory, else
/// "FullTranslation".
pub fn summary_name(pages: &[String], dirs: &[String]) -> String {
    if !pages.is_empty() {
        return pages.join("_");
    }
    if let [dir] = dirs {
        return dir.clone();
    }
    "FullTranslation".to_string()
}
