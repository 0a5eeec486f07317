use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code of the base resource files
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language codes, in processing order
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    /// Root directory holding the base .resx files
    #[serde(default = "default_resources_dir")]
    pub resources_dir: PathBuf,

    /// Directory holding one cache file per target language
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory holding the hot-reloadable glossary.json and echo.json
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Directory name skipped during base-file discovery (empty disables)
    #[serde(default)]
    pub excluded_dir: String,

    /// Review log location (defaults to review.log on the desktop)
    #[serde(default)]
    pub review_log_path: Option<PathBuf>,

    /// Directory the end-of-run summary log is written to (defaults to the desktop)
    #[serde(default)]
    pub summary_log_dir: Option<PathBuf>,

    /// Pages whose flagged entries are not written to the review log
    #[serde(default)]
    pub review_excluded_pages: Vec<String>,

    /// Inference backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Concurrency settings
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Quiet period before a changed glossary/echo file is reloaded
    #[serde(default = "default_reload_debounce_ms")]
    pub reload_debounce_ms: u64,

    /// Fixed translations for exact resource keys, per language
    #[serde(default)]
    pub key_overrides: HashMap<String, HashMap<String, String>>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Inference backend (Ollama) configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: Service URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    // @field: Model variant used when a language has no override
    #[serde(default = "default_ollama_model")]
    pub default_model: String,

    // @field: Language -> model variant overrides
    #[serde(default)]
    pub language_models: HashMap<String, String>,

    /// Temperature parameter for text generation
    #[serde(default)]
    pub temperature: f32,

    // @field: Context window passed as num_ctx
    #[serde(default = "default_context_size")]
    pub context_size: u32,

    // @field: Thread count passed as num_thread
    #[serde(default)]
    pub thread_count: Option<u32>,

    // @field: How long the backend keeps a model loaded between requests
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,

    // @field: Per-request timeout; local large models are slow
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: How long to wait for a freshly started server
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // @field: Start the server when the endpoint is not serving
    #[serde(default = "default_true")]
    pub manage_server: bool,

    // @field: Executable launched with `serve`
    #[serde(default = "default_server_command")]
    pub server_command: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            default_model: default_ollama_model(),
            language_models: HashMap::new(),
            temperature: 0.0,
            context_size: default_context_size(),
            thread_count: None,
            keep_alive: default_keep_alive(),
            timeout_secs: default_timeout_secs(),
            startup_timeout_secs: default_startup_timeout_secs(),
            manage_server: true,
            server_command: default_server_command(),
        }
    }
}

impl BackendConfig {
    /// Model variant serving a target language
    pub fn model_for(&self, language: &str) -> String {
        self.language_models
            .iter()
            .find(|(lang, _)| lang.eq_ignore_ascii_case(language))
            .map(|(_, model)| model.clone())
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Every distinct model variant needed for the given languages
    pub fn required_models(&self, languages: &[String]) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        for language in languages {
            let model = self.model_for(language);
            if !models.contains(&model) {
                models.push(model);
            }
        }
        models
    }

    /// Apply a `-m` override: a bare size such as `4b` keeps the model family
    pub fn override_model(&mut self, model: &str) {
        let model = model.trim();
        if model.contains(':') || !self.default_model.contains(':') {
            self.default_model = model.to_string();
        } else if let Some((family, _)) = self.default_model.split_once(':') {
            self.default_model = format!("{}:{}", family, model);
        }
    }
}

/// Concurrency settings for a run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConcurrencyConfig {
    /// Languages translated at the same time
    #[serde(default = "default_max_concurrent_languages")]
    pub max_concurrent_languages: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_languages: default_max_concurrent_languages(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_languages() -> Vec<String> {
    crate::language_utils::supported_codes()
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_resources_dir() -> PathBuf {
    PathBuf::from("Resources")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

fn default_reload_debounce_ms() -> u64 {
    300
}

fn default_max_concurrent_languages() -> usize {
    3
}

fn default_context_size() -> u32 {
    4096
}

fn default_keep_alive() -> String {
    "5m".to_string()
}

fn default_timeout_secs() -> u64 {
    900 // 15 minutes, large local models are slow
}

fn default_startup_timeout_secs() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_ollama_endpoint() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ollama_model() -> String {
    "translategemma:27b".to_string()
}

fn default_server_command() -> String {
    "ollama".to_string()
}

impl Config {
    /// Load the configuration file, writing a default one when it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()));
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));
        let check_code = |code: &str| {
            crate::language_utils::validate_language_code(code).map_err(|e| ConfigError::Invalid(e.to_string()))
        };

        check_code(&self.source_language)?;

        if self.target_languages.is_empty() {
            return invalid("At least one target language is required".to_string());
        }

        for language in &self.target_languages {
            check_code(language)?;
            if language.eq_ignore_ascii_case(&self.source_language) {
                return invalid(format!(
                    "Target language '{}' is the same as the source language",
                    language
                ));
            }
        }

        if self.concurrency.max_concurrent_languages == 0 {
            return invalid("max_concurrent_languages must be at least 1".to_string());
        }

        if self.backend.default_model.trim().is_empty() {
            return invalid("backend.default_model cannot be empty".to_string());
        }

        if self.backend.timeout_secs == 0 {
            return invalid("backend.timeout_secs must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Path of glossary.json
    pub fn glossary_path(&self) -> PathBuf {
        self.config_dir.join("glossary.json")
    }

    /// Path of echo.json
    pub fn echo_path(&self) -> PathBuf {
        self.config_dir.join("echo.json")
    }

    /// Review log location, defaulting to the desktop
    pub fn review_log_path(&self) -> PathBuf {
        self.review_log_path
            .clone()
            .unwrap_or_else(|| desktop_dir().join("review.log"))
    }

    /// Summary log directory, defaulting to the desktop
    pub fn summary_log_dir(&self) -> PathBuf {
        self.summary_log_dir.clone().unwrap_or_else(desktop_dir)
    }
}

fn desktop_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_languages: default_target_languages(),
            resources_dir: default_resources_dir(),
            cache_dir: default_cache_dir(),
            config_dir: default_config_dir(),
            excluded_dir: String::new(),
            review_log_path: None,
            summary_log_dir: None,
            review_excluded_pages: Vec::new(),
            backend: BackendConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            reload_debounce_ms: default_reload_debounce_ms(),
            key_overrides: HashMap::new(),
            log_level: LogLevel::default(),
        }
    }
}
