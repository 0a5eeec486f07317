/*!
 * Core translation pipeline.
 *
 * `TranslationPipeline::translate` resolves one resource string for one
 * language. Resolution order is fixed: key override, glossary entry for the
 * resource key, cached translation, then a fresh inference call whose output
 * is sanitized, restored, checked and cached.
 */

use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::BackendConfig;
use crate::language_utils;
use crate::providers::{GenerationRequest, InferenceBackend};
use super::cache::CacheHandle;
use super::glossary::{ConfigSnapshot, SharedSnapshot};
use super::numeric;
use super::prompts;
use super::quality::QualityReport;
use super::review::{ReviewEntry, ReviewLog, SummaryLog};
use super::sanitizer;

/// One resource string to translate into one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Source text
    pub source_text: String,
    /// Target language code
    pub target_language: String,
    /// Resource key, used for overrides, glossary lookups and logging
    pub entry_key: String,
    /// Page (base file stem), used for review suppression
    pub page_name: String,
}

impl TranslationRequest {
    /// Create a new request
    pub fn new(
        source_text: impl Into<String>,
        target_language: impl Into<String>,
        entry_key: impl Into<String>,
        page_name: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            target_language: target_language.into(),
            entry_key: entry_key.into(),
            page_name: page_name.into(),
        }
    }
}

/// How a request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Fixed translation for the resource key (not cached)
    Override,
    /// Glossary entry for the resource key (cached)
    GlossaryExact,
    /// Served from the cache
    CacheHit,
    /// Fresh inference result stored in the cache
    Translated,
    /// Fresh inference result that replaced a cached value
    Rewritten,
    /// Inference failed or timed out; nothing was stored
    Failed,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Resolution::Override => "override",
            Resolution::GlossaryExact => "glossary",
            Resolution::CacheHit => "cache hit",
            Resolution::Translated => "translated",
            Resolution::Rewritten => "rewritten",
            Resolution::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    /// Resolved translation, `None` when inference failed
    pub text: Option<String>,
    /// Which stage produced it
    pub resolution: Resolution,
    /// Heuristic flags for fresh translations
    pub quality: QualityReport,
}

impl TranslationOutcome {
    fn resolved(text: String, resolution: Resolution) -> Self {
        Self {
            text: Some(text),
            resolution,
            quality: QualityReport::default(),
        }
    }

    fn failed() -> Self {
        Self {
            text: None,
            resolution: Resolution::Failed,
            quality: QualityReport::default(),
        }
    }
}

/// Per-language working state owned by one language task
#[derive(Debug, Clone)]
pub struct LanguageSession {
    /// Target language code
    pub language: String,
    /// English display name used in prompts
    pub language_name: String,
    /// Model variant serving this language
    pub model: String,
    /// Ignore cache hits and regenerate
    pub force_overwrite: bool,
    /// The language's cache
    pub cache: CacheHandle,
}

impl LanguageSession {
    /// Session for a language, resolving its display name from the rule table
    pub fn new(language: &str, model: impl Into<String>, force_overwrite: bool, cache: CacheHandle) -> Self {
        let language_name =
            language_utils::get_language_name(language).unwrap_or_else(|_| language.to_string());

        Self {
            language: language.to_string(),
            language_name,
            model: model.into(),
            force_overwrite,
            cache,
        }
    }
}

/// Translation pipeline shared by every language task
#[derive(Clone)]
pub struct TranslationPipeline {
    /// Inference backend
    backend: Arc<dyn InferenceBackend>,

    /// Sampling options, keep-alive and timeout
    backend_config: BackendConfig,

    /// Reloadable glossary, exclusions and overrides
    snapshot: SharedSnapshot,

    /// Sink for flagged translations
    review_log: Option<ReviewLog>,

    /// End-of-run record of every resolved entry
    summary: SummaryLog,
}

impl fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("backend", &self.backend)
            .field("endpoint", &self.backend_config.endpoint)
            .finish()
    }
}

impl TranslationPipeline {
    /// Create a pipeline over a backend and a shared configuration snapshot
    pub fn new(backend: Arc<dyn InferenceBackend>, backend_config: BackendConfig, snapshot: SharedSnapshot) -> Self {
        Self {
            backend,
            backend_config,
            snapshot,
            review_log: None,
            summary: SummaryLog::new(),
        }
    }

    /// Write flagged translations to a review log
    pub fn with_review_log(mut self, review_log: ReviewLog) -> Self {
        self.review_log = Some(review_log);
        self
    }

    /// Collect resolved entries into the given summary
    pub fn with_summary(mut self, summary: SummaryLog) -> Self {
        self.summary = summary;
        self
    }

    /// Summary collected so far
    pub fn summary(&self) -> &SummaryLog {
        &self.summary
    }

    /// Shared configuration snapshot
    pub fn snapshot(&self) -> &SharedSnapshot {
        &self.snapshot
    }

    /// Inference backend
    pub fn backend(&self) -> &Arc<dyn InferenceBackend> {
        &self.backend
    }

    /// Translate one request, returning `None` when inference failed
    pub async fn translate(&self, request: &TranslationRequest, session: &LanguageSession) -> Option<String> {
        self.translate_with_outcome(request, session).await.text
    }

    /// Translate one request and report how it was resolved
    pub async fn translate_with_outcome(
        &self,
        request: &TranslationRequest,
        session: &LanguageSession,
    ) -> TranslationOutcome {
        let snapshot = self.snapshot.current();
        let lang = session.language.as_str();
        let key = request.entry_key.as_str();
        let source = request.source_text.as_str();

        if let Some(fixed) = snapshot.overrides.get(lang, key) {
            info!("🔒 [Override {} {}] {}\n➡️ {}", lang, key, source, fixed);
            self.summary.record(lang, key, fixed);
            return TranslationOutcome::resolved(fixed.to_string(), Resolution::Override);
        }

        if let Some(forced) = snapshot.glossary.exact(lang, key) {
            info!("📘 [Glossary {} {}] {}\n➡️ {}", lang, key, source, forced);
            if let Err(e) = session.cache.lock().await.insert(source, forced).await {
                warn!("⚠ Failed to cache glossary entry [{} {}]: {}", lang, key, e);
            }
            self.summary.record(lang, key, forced);
            return TranslationOutcome::resolved(forced.to_string(), Resolution::GlossaryExact);
        }

        let cached = session.cache.lock().await.get(source);
        if let Some(cached) = cached.as_ref().filter(|_| !session.force_overwrite) {
            info!("[Cache hit {} {}] {}\n➡️ {}", lang, key, source, cached);
            self.summary.record(lang, key, cached);
            return TranslationOutcome::resolved(cached.clone(), Resolution::CacheHit);
        }

        let Some(translated) = self.infer(request, session, &snapshot).await else {
            return TranslationOutcome::failed();
        };

        let quality = QualityReport::assess(lang, source, &translated, &snapshot.exclusions);
        let residue = numeric::has_placeholder_residue(&translated);
        if residue {
            warn!("⚠ Unrestored number placeholder [{} {}]: {}", lang, key, translated);
        }
        if quality.is_flagged() || residue {
            self.flag(request, lang, &translated).await;
        }

        // Flagged output is cached too
        if let Err(e) = session.cache.lock().await.insert(source, &translated).await {
            warn!("⚠ Failed to persist cache entry [{} {}]: {}", lang, key, e);
        }

        let resolution = if session.force_overwrite && cached.is_some() {
            info!("♻️ [Rewrite {} {}] {}\n➡️ {}", lang, key, source, translated);
            Resolution::Rewritten
        } else {
            info!("[Cached {} {}] {}\n➡️ {}", lang, key, source, translated);
            Resolution::Translated
        };
        self.summary.record(lang, key, &translated);

        TranslationOutcome {
            text: Some(translated),
            resolution,
            quality,
        }
    }

    /// Numeric protection, prompt, inference and output cleanup
    async fn infer(
        &self,
        request: &TranslationRequest,
        session: &LanguageSession,
        snapshot: &ConfigSnapshot,
    ) -> Option<String> {
        let lang = session.language.as_str();
        let key = request.entry_key.as_str();

        let (processed, context) = numeric::preprocess(&request.source_text, lang);
        let prompt = prompts::build_prompt_for_source(
            &processed,
            &request.source_text,
            lang,
            &session.language_name,
            snapshot.glossary.for_language(lang),
        );
        let generation = GenerationRequest::new(&session.model, prompt).with_backend_config(&self.backend_config);

        let timeout = Duration::from_secs(self.backend_config.timeout_secs);
        let raw = match tokio::time::timeout(timeout, self.backend.generate(generation)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("⚠ Translation failed [{} {}]: {}", lang, key, e);
                return None;
            }
            Err(_) => {
                warn!("⚠ Translation timed out after {}s [{} {}]", timeout.as_secs(), lang, key);
                return None;
            }
        };

        let cleaned = sanitizer::sanitize(&raw);
        let cleaned = sanitizer::align_terminal_punctuation(&request.source_text, &cleaned);
        if cleaned.is_empty() {
            warn!("⚠ Translation failed [{} {}]: empty model output", lang, key);
            return None;
        }

        let missing = context.missing_in(&cleaned);
        if !missing.is_empty() {
            debug!("Model dropped placeholders {:?} [{} {}]", missing, lang, key);
        }

        Some(numeric::postprocess(&cleaned, &context, lang))
    }

    async fn flag(&self, request: &TranslationRequest, lang: &str, translated: &str) {
        let entry = ReviewEntry {
            page: request.page_name.clone(),
            language: lang.to_string(),
            key: request.entry_key.clone(),
            source: request.source_text.clone(),
            output: translated.to_string(),
        };

        let suppressed = self
            .review_log
            .as_ref()
            .is_some_and(|log| log.is_suppressed(&entry.page));
        if suppressed {
            return;
        }

        warn!("{}\n   Source: {}\n   Output: {}", entry.header(), entry.source, entry.output);
        if let Some(log) = &self.review_log {
            log.record(&entry).await;
        }
        self.summary.record_flag(&entry);
    }
}
