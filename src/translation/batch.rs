/*!
 * Batch translation processing.
 *
 * The orchestrator drives the pipeline over a run's documents for many target
 * languages. Languages sharing a model variant run concurrently up to a limit,
 * each working through every document in order. Variants run one after
 * another and the previous variant is evicted from the backend before the
 * next group starts, so each variant is loaded once per run.
 */

use futures::stream::{self, StreamExt};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

use crate::app_config::BackendConfig;
use super::cache::CacheRegistry;
use super::core::{LanguageSession, TranslationPipeline, TranslationRequest};
use super::quality;

/// Default number of languages translated at the same time
pub const DEFAULT_MAX_CONCURRENT_LANGUAGES: usize = 3;

/// One target language of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePlan {
    /// Target language code
    pub language: String,
    /// Ignore cache hits for this language
    pub force_overwrite: bool,
}

impl LanguagePlan {
    /// Create a plan for a language
    pub fn new(language: impl Into<String>, force_overwrite: bool) -> Self {
        Self {
            language: language.into(),
            force_overwrite,
        }
    }
}

/// One document's entries, ready for translation
#[derive(Debug, Clone, Default)]
pub struct DocumentBatch {
    /// Page name used for review-log grouping
    pub page_name: String,
    /// (entry key, source text) in document order
    pub entries: Vec<(String, String)>,
}

impl DocumentBatch {
    /// Create a batch for a page
    pub fn new(page_name: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        Self {
            page_name: page_name.into(),
            entries,
        }
    }
}

/// Translations of one document into one language
#[derive(Debug, Clone)]
pub struct LanguageResult {
    /// Target language code
    pub language: String,
    /// Model variant that served the language
    pub model: String,
    /// (entry key, translation) in document order; `None` marks a failed entry
    pub translations: Vec<(String, Option<String>)>,
    /// Wall time spent on the language
    pub elapsed: Duration,
    /// Cached entries purged by the leakage audit; set on the language's last document
    pub purged: usize,
    /// The run was interrupted before every entry was processed
    pub interrupted: bool,
}

impl LanguageResult {
    /// Number of entries without a translation
    pub fn failed_count(&self) -> usize {
        self.translations.iter().filter(|(_, t)| t.is_none()).count()
    }
}

/// Drives the translation pipeline across languages
pub struct BatchOrchestrator {
    /// Per-entry pipeline
    pipeline: TranslationPipeline,

    /// Language caches for this run
    registry: CacheRegistry,

    /// Language -> model variant table
    backend_config: BackendConfig,

    /// Admission limit for concurrent languages
    semaphore: Arc<Semaphore>,

    /// Maximum number of concurrent languages
    max_concurrent_languages: usize,

    /// Purge leaked cache entries after each language
    audit_leakage: bool,

    /// Model variant currently resident in the backend
    active_model: Mutex<Option<String>>,

    /// Set when the run should stop at the next entry
    shutdown: Arc<AtomicBool>,
}

impl BatchOrchestrator {
    /// Create an orchestrator with the default concurrency limit
    pub fn new(pipeline: TranslationPipeline, registry: CacheRegistry, backend_config: BackendConfig) -> Self {
        Self {
            pipeline,
            registry,
            backend_config,
            semaphore: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_LANGUAGES)),
            max_concurrent_languages: DEFAULT_MAX_CONCURRENT_LANGUAGES,
            audit_leakage: false,
            active_model: Mutex::new(None),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set how many languages may be translated at once
    pub fn with_max_concurrent_languages(mut self, max: usize) -> Self {
        let max = max.max(1);
        self.max_concurrent_languages = max;
        self.semaphore = Arc::new(Semaphore::new(max));
        self
    }

    /// Purge cached entries with script leakage after each language
    pub fn with_audit_leakage(mut self, audit_leakage: bool) -> Self {
        self.audit_leakage = audit_leakage;
        self
    }

    /// Share a shutdown flag owned by the caller
    pub fn with_shutdown_flag(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Flag that stops the run at the next entry when set
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Whether a shutdown was requested
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// The per-entry pipeline
    pub fn pipeline(&self) -> &TranslationPipeline {
        &self.pipeline
    }

    /// Group plans by model variant, in order of first appearance
    pub fn model_groups(&self, plans: &[LanguagePlan]) -> Vec<(String, Vec<(usize, LanguagePlan)>)> {
        let mut groups: Vec<(String, Vec<(usize, LanguagePlan)>)> = Vec::new();

        for (index, plan) in plans.iter().enumerate() {
            let model = self.backend_config.model_for(&plan.language);
            match groups.iter_mut().find(|(m, _)| *m == model) {
                Some((_, members)) => members.push((index, plan.clone())),
                None => groups.push((model, vec![(index, plan.clone())])),
            }
        }

        groups
    }

    /// Translate one document's entries into every planned language
    ///
    /// `entries` are (key, source text) pairs in document order. Results come
    /// back in plan order; `progress_callback` receives (completed, total)
    /// languages as they finish.
    pub async fn translate_document(
        &self,
        page_name: &str,
        entries: &[(String, String)],
        plans: &[LanguagePlan],
        progress_callback: impl Fn(usize, usize) + Clone + Send + Sync,
    ) -> Vec<LanguageResult> {
        let document = DocumentBatch::new(page_name, entries.to_vec());
        self.translate_documents(std::slice::from_ref(&document), plans, progress_callback)
            .await
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Translate every document into every planned language
    ///
    /// The returned vector has one slot per document, each holding results in
    /// plan order. A language stopped by shutdown has no result for the
    /// documents it never reached. `progress_callback` receives (completed,
    /// total) languages as they finish.
    pub async fn translate_documents(
        &self,
        documents: &[DocumentBatch],
        plans: &[LanguagePlan],
        progress_callback: impl Fn(usize, usize) + Clone + Send + Sync,
    ) -> Vec<Vec<LanguageResult>> {
        let total = plans.len();
        let completed = AtomicUsize::new(0);
        let mut per_language = Vec::with_capacity(total);

        for (model, group) in self.model_groups(plans) {
            if self.is_shutting_down() {
                break;
            }
            self.switch_model(&model).await;

            let group_results = stream::iter(group)
                .map(|(index, plan)| {
                    let semaphore = self.semaphore.clone();
                    let model = model.clone();
                    let completed = &completed;
                    let progress_callback = progress_callback.clone();

                    async move {
                        let _permit = semaphore.acquire_owned().await.ok();
                        let results = self.translate_language(documents, &plan, &model).await;

                        let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        progress_callback(current, total);

                        (index, results)
                    }
                })
                .buffer_unordered(self.max_concurrent_languages)
                .collect::<Vec<_>>()
                .await;

            per_language.extend(group_results);
        }

        // Sort results by plan index to restore the caller's order
        per_language.sort_by_key(|(index, _)| *index);

        let mut by_document: Vec<Vec<LanguageResult>> =
            documents.iter().map(|_| Vec::with_capacity(total)).collect();
        for (_, results) in per_language {
            for (slot, result) in by_document.iter_mut().zip(results) {
                slot.push(result);
            }
        }
        by_document
    }

    /// Evict the resident model when the next group needs a different one
    async fn switch_model(&self, model: &str) {
        let mut active = self.active_model.lock().await;

        match active.as_deref() {
            Some(current) if current == model => return,
            Some(current) => {
                info!("🔄 Switching model {} -> {}", current, model);
                if let Err(e) = self.pipeline.backend().unload(current).await {
                    warn!("⚠ Failed to unload {}: {}", current, e);
                }
            }
            None => info!("🔧 Using model: {}", model),
        }

        *active = Some(model.to_string());
    }

    async fn translate_language(
        &self,
        documents: &[DocumentBatch],
        plan: &LanguagePlan,
        model: &str,
    ) -> Vec<LanguageResult> {
        let cache = self.registry.open(&plan.language).await;
        let session = LanguageSession::new(&plan.language, model, plan.force_overwrite, cache);
        info!("🌍 {} ({} document(s))", plan.language, documents.len());

        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            let result = self.translate_entries(document, &session, model).await;
            let interrupted = result.interrupted;
            results.push(result);
            if interrupted {
                break;
            }
        }

        let finished = results.len() == documents.len() && !results.last().is_some_and(|r| r.interrupted);
        if self.audit_leakage && finished {
            let purged = self.purge_leaked(&session).await;
            if let Some(last) = results.last_mut() {
                last.purged = purged;
            }
        }

        results
    }

    async fn translate_entries(
        &self,
        document: &DocumentBatch,
        session: &LanguageSession,
        model: &str,
    ) -> LanguageResult {
        let start = Instant::now();
        let language = session.language.as_str();

        let mut translations = Vec::with_capacity(document.entries.len());
        let mut interrupted = false;

        for (key, text) in &document.entries {
            if self.is_shutting_down() {
                interrupted = true;
                break;
            }

            let request = TranslationRequest::new(text, language, key, &document.page_name);
            let translation = self.pipeline.translate(&request, session).await;
            translations.push((key.clone(), translation));
        }

        LanguageResult {
            language: language.to_string(),
            model: model.to_string(),
            translations,
            elapsed: start.elapsed(),
            purged: 0,
            interrupted,
        }
    }

    async fn purge_leaked(&self, session: &LanguageSession) -> usize {
        let snapshot = self.pipeline.snapshot().current();
        let language = session.language.as_str();

        let result = session
            .cache
            .lock()
            .await
            .purge_where(|translation| quality::has_script_leakage(language, translation, &snapshot.exclusions))
            .await;

        match result {
            Ok(0) => 0,
            Ok(purged) => {
                info!("🧹 Purged {} leaked {} cache entries", purged, language);
                purged
            }
            Err(e) => {
                warn!("⚠ Leakage audit for {} failed: {}", language, e);
                0
            }
        }
    }
}
