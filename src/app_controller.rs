use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::file_utils::{FileManager, ResourceFilter};
use crate::language_utils;
use crate::providers::server::ServerGuard;
use crate::providers::{InferenceBackend, Ollama};
use crate::resx::ResxDocument;
use crate::translation::glossary::{self, ConfigSnapshot, KeyOverrides, SharedSnapshot};
use crate::translation::review::summary_name;
use crate::translation::{
    BatchOrchestrator, CacheRegistry, ConfigWatcher, DocumentBatch, EchoExclusions, GlossaryTable, LanguagePlan,
    ReviewLog, SummaryLog, TranslationPipeline,
};

// @module: Application controller for resource translation runs

/// Command-line choices that shape one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Model variant override (`-m`)
    pub model: Option<String>,
    /// Target language filter (`-l`)
    pub languages: Vec<String>,
    /// Base file stems to translate (`-p`)
    pub pages: Vec<String>,
    /// Sub-directories of the resources root (`-d`)
    pub dirs: Vec<String>,
    /// Ignore cache hits
    pub force_overwrite: bool,
    /// Purge cached entries with script leakage after each language
    pub audit_leakage: bool,
}

impl RunOptions {
    // @applies: CLI overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.backend.override_model(model);
            info!("🔧 Model override: {}", config.backend.default_model);
        }
        config.target_languages = select_languages(&config.target_languages, &self.languages);
    }
}

/// Restrict the configured targets to the requested codes
///
/// Unknown codes are warned about and skipped; when nothing valid remains
/// every configured language is kept.
pub fn select_languages(configured: &[String], requested: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();

    for code in requested {
        let code = code.trim().to_lowercase();
        if !language_utils::is_supported(&code) {
            warn!("⚠ Unknown language '{}'. Skipping.", code);
            continue;
        }
        if !selected.contains(&code) {
            selected.push(code);
        }
    }

    if selected.is_empty() {
        configured.to_vec()
    } else {
        selected
    }
}

/// What a run produced
#[derive(Debug, Default)]
pub struct RunReport {
    /// Translated files written, in completion order
    pub written: Vec<PathBuf>,
    /// Entries left untranslated across all files and languages
    pub failed_entries: usize,
    /// Cache entries removed by the leakage audit
    pub purged_entries: usize,
    /// Where the summary log went, if anything was recorded
    pub summary_path: Option<PathBuf>,
    /// The run stopped on an interrupt
    pub interrupted: bool,
}

/// Main application controller for resource translation
pub struct Controller {
    // @field: App configuration, CLI overrides applied
    config: Config,
    // @field: Run-level switches
    options: RunOptions,
    // @field: Set on Ctrl-C, checked before every entry
    shutdown: Arc<AtomicBool>,
}

impl Controller {
    // @method: Create a controller, applying and validating CLI overrides
    pub fn with_config(mut config: Config, options: RunOptions) -> Result<Self> {
        options.apply_to(&mut config);
        config.validate().context("Configuration validation failed")?;

        Ok(Self {
            config,
            options,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Effective configuration of the run
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag that stops the run at the next entry
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Run against the configured Ollama endpoint
    ///
    /// Starts the server when needed and fails before any language is
    /// processed if the server or a required model variant is unavailable.
    pub async fn run(&self) -> Result<RunReport> {
        let backend: Arc<dyn InferenceBackend> = Arc::new(Ollama::from_config(&self.config.backend));

        let mut guard = ServerGuard::acquire(backend.as_ref(), &self.config.backend)
            .await
            .context("No usable inference backend")?;

        let required = self.config.backend.required_models(&self.config.target_languages);
        if let Err(e) = backend.ensure_models(&required).await {
            guard.shutdown().await;
            if let ProviderError::ModelMissing(missing) = &e {
                for model in missing {
                    error!("Missing model {} (install it with: ollama pull {})", model, model);
                }
            }
            return Err(anyhow!(e)).context("Required model variants are not available");
        }

        let run = self.run_with_backend(backend);
        tokio::pin!(run);

        let finished = tokio::select! {
            result = &mut run => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };

        let result = match finished {
            Some(result) => result,
            None => {
                warn!("🛑 Interrupt received, shutting down...");
                self.shutdown.store(true, Ordering::SeqCst);
                guard.shutdown().await;
                run.await
            }
        };

        guard.shutdown().await;
        result
    }

    /// Run every selected document through the given backend
    pub async fn run_with_backend(&self, backend: Arc<dyn InferenceBackend>) -> Result<RunReport> {
        let start_time = Instant::now();
        let config = &self.config;

        FileManager::ensure_dir(&config.cache_dir)?;
        FileManager::ensure_dir(&config.config_dir)?;

        let snapshot = SharedSnapshot::new(self.load_snapshot());
        let registry = CacheRegistry::new(&config.cache_dir);

        let watcher = ConfigWatcher::spawn(
            config.glossary_path(),
            config.echo_path(),
            snapshot.clone(),
            registry.clone(),
            Duration::from_millis(config.reload_debounce_ms),
        )
        .await;

        let summary = SummaryLog::new();
        let pipeline = TranslationPipeline::new(backend, config.backend.clone(), snapshot)
            .with_review_log(ReviewLog::new(config.review_log_path(), &config.review_excluded_pages))
            .with_summary(summary.clone());

        let orchestrator = BatchOrchestrator::new(pipeline, registry, config.backend.clone())
            .with_max_concurrent_languages(config.concurrency.max_concurrent_languages)
            .with_audit_leakage(self.options.audit_leakage)
            .with_shutdown_flag(self.shutdown.clone());

        let plans: Vec<LanguagePlan> = config
            .target_languages
            .iter()
            .map(|lang| LanguagePlan::new(lang.clone(), self.options.force_overwrite))
            .collect();

        let files = self.discover_files()?;
        if files.is_empty() {
            warn!("No base .resx files found under {}", config.resources_dir.display());
        } else {
            info!(
                "🚀 ResxForge: {} file(s) x {} language(s) - {}",
                files.len(),
                plans.len(),
                config.backend.default_model
            );
        }

        let mut report = RunReport::default();
        let multi_progress = MultiProgress::new();
        let mut documents = Vec::with_capacity(files.len());
        let mut batches = Vec::with_capacity(files.len());

        for path in &files {
            let document = match ResxDocument::load(path) {
                Ok(document) => document,
                Err(e) => {
                    error!("Failed to read {}: {}", path.display(), e);
                    continue;
                }
            };

            let entries = document.pairs();
            if entries.is_empty() {
                info!("Skipping {} (no translatable entries)", path.display());
                continue;
            }

            info!("📄 {} ({} entries)", document.page_name(), entries.len());
            batches.push(DocumentBatch::new(document.page_name(), entries));
            documents.push(document);
        }

        // Every document goes through one orchestrator call so each model
        // variant is loaded once for the whole run
        let results = if batches.is_empty() {
            Vec::new()
        } else {
            let languages_bar = multi_progress.add(ProgressBar::new(plans.len() as u64));
            languages_bar.set_style(Self::progress_style("languages"));
            let pb = languages_bar.clone();

            let results = orchestrator
                .translate_documents(&batches, &plans, move |completed, _total| {
                    pb.set_position(completed as u64);
                })
                .await;
            languages_bar.finish_and_clear();
            results
        };
        if orchestrator.is_shutting_down() {
            report.interrupted = true;
        }

        let files_bar = multi_progress.add(ProgressBar::new(documents.len() as u64));
        files_bar.set_style(Self::progress_style("files"));

        for (document, results) in documents.iter().zip(results) {
            for result in results {
                report.purged_entries += result.purged;

                if result.interrupted {
                    warn!("Skipping write of {} for {} (interrupted)", document.page_name(), result.language);
                    report.interrupted = true;
                    continue;
                }

                report.failed_entries += result.failed_count();
                let translations: Vec<Option<String>> =
                    result.translations.into_iter().map(|(_, t)| t).collect();

                match document.write_translated(&result.language, &translations) {
                    Ok(out_path) => {
                        info!(
                            "✅ Written {} ({:.2} sec)",
                            out_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                            result.elapsed.as_secs_f64()
                        );
                        report.written.push(out_path);
                    }
                    Err(e) => error!(
                        "Failed to write {} translation of {}: {}",
                        result.language,
                        document.path().display(),
                        e
                    ),
                }
            }

            files_bar.inc(1);
        }
        files_bar.finish_and_clear();

        if !summary.is_empty() {
            let name = summary_name(&self.options.pages, &self.options.dirs);
            match summary.write(&config.summary_log_dir(), &name).await {
                Ok(summary_path) => {
                    info!("📝 Summary written to {}", summary_path.display());
                    report.summary_path = Some(summary_path);
                }
                Err(e) => warn!("Failed to write summary log: {}", e),
            }
        }

        watcher.stop();

        info!(
            "Run complete in {}: {} file(s) written, {} untranslated entries.",
            Self::format_duration(start_time.elapsed()),
            report.written.len(),
            report.failed_entries
        );

        Ok(report)
    }

    // @returns: Base resource files selected by the -d and -p filters
    fn discover_files(&self) -> Result<Vec<PathBuf>> {
        let dirs = FileManager::resolve_working_dirs(&self.config.resources_dir, &self.options.dirs);
        let filter = ResourceFilter {
            pages: self.options.pages.clone(),
            excluded_dir: self.config.excluded_dir.clone(),
            languages: language_utils::supported_codes()
                .into_iter()
                .map(String::from)
                .collect(),
        };

        FileManager::find_base_resources(&dirs, &filter)
    }

    /// Initial glossary, exclusions and key overrides
    ///
    /// A file that fails to parse is reported and treated as empty; the
    /// watcher picks it up once it is fixed.
    fn load_snapshot(&self) -> ConfigSnapshot {
        let glossary = glossary::load_glossary(&self.config.glossary_path()).unwrap_or_else(|e| {
            warn!("⚠ {}; starting with an empty glossary", e);
            GlossaryTable::default()
        });
        let exclusions = glossary::load_exclusions(&self.config.echo_path()).unwrap_or_else(|e| {
            warn!("⚠ {}; starting without echo exclusions", e);
            EchoExclusions::default()
        });

        ConfigSnapshot {
            glossary,
            exclusions,
            overrides: KeyOverrides::new(&self.config.key_overrides),
        }
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%)",
            unit
        );
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // @formats: Duration as "1h 2m 3s" / "2m 3s" / "3.4s"
    fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{:.1}s", duration.as_secs_f64())
        }
    }
}
