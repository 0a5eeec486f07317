/*!
 * Translation engine for resource strings.
 *
 * This module contains the per-string pipeline and everything it consults.
 * It is split into several submodules:
 *
 * - `core`: the per-request pipeline (override, glossary, cache, inference)
 * - `batch`: concurrent processing of documents across languages
 * - `cache`: persistent per-language translation caches
 * - `glossary`: glossary, key overrides and the shared config snapshot
 * - `hot_reload`: debounced reload of glossary.json and echo.json
 * - `numeric`: placeholder protection for numeric literals
 * - `prompts`: prompt construction
 * - `sanitizer`: cleanup of raw model output
 * - `quality`: echo and script leakage heuristics
 * - `review`: review and summary logs
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOrchestrator, DocumentBatch, LanguagePlan, LanguageResult};
pub use self::cache::{CacheRegistry, LanguageCache};
pub use self::core::{LanguageSession, Resolution, TranslationOutcome, TranslationPipeline, TranslationRequest};
pub use self::glossary::{ConfigSnapshot, GlossaryTable, KeyOverrides, SharedSnapshot};
pub use self::hot_reload::ConfigWatcher;
pub use self::quality::{EchoExclusions, QualityReport};
pub use self::review::{ReviewLog, SummaryLog};

// Submodules
pub mod batch;
pub mod cache;
pub mod core;
pub mod glossary;
pub mod hot_reload;
pub mod numeric;
pub mod prompts;
pub mod quality;
pub mod review;
pub mod sanitizer;
