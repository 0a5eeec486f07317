/*!
 * # ResxForge
 *
 * A Rust library for translating .resx UI resources into many languages
 * with a locally hosted model.
 *
 * ## Features
 *
 * - Persistent per-language translation caches with write-through saves
 * - Numeric literal protection and per-language digit/era rendering
 * - Glossary terms and fixed per-key overrides, reloaded while running
 * - Live patching of cached translations when glossary terms are added
 * - Echo and script-leakage heuristics feeding a review log
 * - Concurrent languages grouped by model variant
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `resx`: Reading and writing .resx documents
 * - `translation`: The translation engine:
 *   - `translation::core`: Per-entry pipeline
 *   - `translation::batch`: Concurrent processing across languages
 *   - `translation::cache`: Per-language translation caches
 *   - `translation::hot_reload`: Glossary and exclusion file watching
 * - `file_utils`: Resource discovery
 * - `app_controller`: Main application controller
 * - `language_utils`: Per-language rules and names
 * - `providers`: Inference backend clients:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::server`: Managed `ollama serve` process
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod resx;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{CacheError, ConfigError, ProviderError, ResxError};
pub use language_utils::get_language_name;
pub use resx::ResxDocument;
pub use translation::{BatchOrchestrator, TranslationPipeline};
