/*!
 * Translation caching functionality.
 *
 * Each target language owns one flat JSON table (`cache_<lang>.json`) mapping
 * `"<lang>||<normalized source>"` to the accepted translation. Tables are
 * loaded once per run and rewritten in full after every mutation, through a
 * temporary file so a crash never leaves a half-written table behind.
 */

use log::{debug, info, warn};
use regex::{NoExpand, RegexBuilder};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::errors::CacheError;

/// Separator between language and source text in persisted keys
const KEY_SEPARATOR: &str = "||";

/// Normalize source text for cache lookups
///
/// Carriage returns are dropped, line breaks become spaces and the result is trimmed.
pub fn normalize_source(text: &str) -> String {
    text.replace('\r', "").replace('\n', " ").trim().to_string()
}

/// Persisted key for a source string in a language
pub fn cache_key(language: &str, source_text: &str) -> String {
    format!("{}{}{}", language, KEY_SEPARATOR, normalize_source(source_text))
}

/// File holding the table for a language
pub fn cache_file_path(cache_dir: &Path, language: &str) -> PathBuf {
    cache_dir.join(format!("cache_{}.json", language))
}

/// Translation cache for one target language
#[derive(Debug)]
pub struct LanguageCache {
    /// Target language code
    language: String,

    /// Backing JSON file
    path: PathBuf,

    /// Persisted key -> translation
    entries: BTreeMap<String, String>,

    /// Cache hit counter
    hits: usize,

    /// Cache miss counter
    misses: usize,
}

impl LanguageCache {
    /// Empty cache backed by `cache_<language>.json` in `cache_dir`
    pub fn new(cache_dir: &Path, language: &str) -> Self {
        Self {
            language: language.to_string(),
            path: cache_file_path(cache_dir, language),
            entries: BTreeMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Load the table for a language
    ///
    /// A missing file yields an empty cache. A file that cannot be read or
    /// parsed is logged and also yields an empty cache; the run continues.
    pub async fn load(cache_dir: &Path, language: &str) -> Self {
        let mut cache = Self::new(cache_dir, language);

        match tokio::fs::read_to_string(&cache.path).await {
            Ok(json) => match serde_json::from_str::<BTreeMap<String, String>>(&json) {
                Ok(entries) => {
                    debug!("Loaded {} cached entries for {}", entries.len(), language);
                    cache.entries = entries;
                }
                Err(e) => warn!(
                    "⚠ Cache file {} is corrupt ({}), starting fresh",
                    cache.path.display(),
                    e
                ),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file for {}, starting empty", language);
            }
            Err(e) => warn!(
                "⚠ Failed to read cache file {} ({}), starting fresh",
                cache.path.display(),
                e
            ),
        }

        cache
    }

    /// Target language of this cache
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a translation from the cache
    pub fn get(&mut self, source_text: &str) -> Option<String> {
        let key = cache_key(&self.language, source_text);

        match self.entries.get(&key) {
            Some(translation) => {
                self.hits += 1;
                Some(translation.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Peek at a translation without touching the hit/miss counters
    pub fn peek(&self, source_text: &str) -> Option<&str> {
        self.entries
            .get(&cache_key(&self.language, source_text))
            .map(String::as_str)
    }

    /// Store a translation and persist the table
    pub async fn insert(&mut self, source_text: &str, translation: &str) -> Result<(), CacheError> {
        self.entries
            .insert(cache_key(&self.language, source_text), translation.to_string());
        self.persist().await
    }

    /// Drop a translation and persist the table if it existed
    pub async fn remove(&mut self, source_text: &str) -> Result<bool, CacheError> {
        let removed = self
            .entries
            .remove(&cache_key(&self.language, source_text))
            .is_some();
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Remove every entry whose translation matches `predicate`
    ///
    /// Returns the number of purged entries; the table is persisted only if
    /// something was removed.
    pub async fn purge_where<F>(&mut self, mut predicate: F) -> Result<usize, CacheError>
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|_, translation| !predicate(translation));
        let purged = before - self.entries.len();

        if purged > 0 {
            self.persist().await?;
        }
        Ok(purged)
    }

    /// Rewrite cached translations that still contain glossary terms
    ///
    /// Every case-insensitive occurrence of a term is replaced by its forced
    /// translation, leaving the rest of the sentence untouched. Returns the
    /// number of changed entries; the table is persisted only if one changed.
    pub async fn apply_glossary_patch(&mut self, terms: &[(String, String)]) -> Result<usize, CacheError> {
        let patterns: Vec<_> = terms
            .iter()
            .filter(|(term, _)| !term.trim().is_empty())
            .filter_map(|(term, forced)| {
                RegexBuilder::new(&regex::escape(term))
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|pattern| (pattern, forced.as_str()))
            })
            .collect();

        let mut changed = 0;
        for translation in self.entries.values_mut() {
            let mut patched = translation.clone();
            for (pattern, forced) in &patterns {
                patched = pattern.replace_all(&patched, NoExpand(forced)).into_owned();
            }
            if patched != *translation {
                *translation = patched;
                changed += 1;
            }
        }

        if changed > 0 {
            self.persist().await?;
            info!("🩹 Patched {} cached {} entries with new glossary terms", changed, self.language);
        }
        Ok(changed)
    }

    /// Cached (persisted key, translation) pairs
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Get cache statistics
    pub fn stats(&self) -> (usize, usize, f64) {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };

        (self.hits, self.misses, hit_rate)
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the backing file with the full table
    pub async fn persist(&self) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, json.as_bytes()))
            .await
            .map_err(|e| CacheError::Io {
                path: self.path.display().to_string(),
                source: std::io::Error::other(e),
            })?
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let io_error = |source: std::io::Error| CacheError::Io {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_error)?;

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    file.flush().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;

    Ok(())
}

/// Shared handle to one language's cache
pub type CacheHandle = Arc<Mutex<LanguageCache>>;

/// Per-run registry of language caches
///
/// A language's table is loaded the first time it is opened and the same
/// handle is returned afterwards, so the glossary reloader patches the copy
/// a running language task is reading from.
#[derive(Debug, Clone)]
pub struct CacheRegistry {
    cache_dir: PathBuf,
    caches: Arc<Mutex<HashMap<String, CacheHandle>>>,
}

impl CacheRegistry {
    /// Create a registry over a cache directory
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            caches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Directory the tables live in
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Handle for a language, loading its table on first use
    pub async fn open(&self, language: &str) -> CacheHandle {
        let mut caches = self.caches.lock().await;
        if let Some(handle) = caches.get(language) {
            return handle.clone();
        }

        let handle = Arc::new(Mutex::new(LanguageCache::load(&self.cache_dir, language).await));
        caches.insert(language.to_string(), handle.clone());
        handle
    }

    /// Languages opened so far
    pub async fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.caches.lock().await.keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Apply newly added glossary terms to every affected language's cache
    ///
    /// Failures to persist one language are logged and do not stop the others.
    /// Returns the total number of patched entries.
    pub async fn apply_glossary_patch(&self, new_terms: &HashMap<String, Vec<(String, String)>>) -> usize {
        let mut total = 0;

        for (language, terms) in new_terms {
            let handle = self.open(language).await;
            let mut cache = handle.lock().await;
            match cache.apply_glossary_patch(terms).await {
                Ok(changed) => total += changed,
                Err(e) => warn!("⚠ Failed to patch {} cache: {}", language, e),
            }
        }

        total
    }
}
