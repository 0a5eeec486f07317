/*!
 * Common test utilities for the resxforge test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use resxforge::app_config::BackendConfig;
use resxforge::providers::mock::MockBackend;
use resxforge::translation::cache::CacheRegistry;
use resxforge::translation::glossary::{ConfigSnapshot, GlossaryTable, KeyOverrides, SharedSnapshot};
use resxforge::translation::{LanguageSession, TranslationPipeline, TranslationRequest};

/// Route library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, creating parent directories
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Builds a .resx document holding the given (key, value) pairs
pub fn resx_content(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<root>
  <resheader name="resmimetype">
    <value>text/microsoft-resx</value>
  </resheader>
"#,
    );
    for (key, value) in entries {
        xml.push_str(&format!(
            "  <data name=\"{}\" xml:space=\"preserve\">\n    <value>{}</value>\n  </data>\n",
            key, value
        ));
    }
    xml.push_str("</root>\n");
    xml
}

/// Backend that wraps the text at the end of the prompt: "T(<text>)"
pub fn echo_backend() -> MockBackend {
    MockBackend::new(|request| {
        let prompt = request.prompt.clone().unwrap_or_default();
        let text = prompt.rsplit("\n\n\n").next().unwrap_or_default().trim().to_string();
        Ok(format!("T({})", text))
    })
}

/// Snapshot with the given glossary JSON and key overrides
pub fn snapshot(glossary_json: &str, overrides: &[(&str, &str, &str)]) -> SharedSnapshot {
    let mut table: HashMap<String, HashMap<String, String>> = HashMap::new();
    for (lang, key, value) in overrides {
        table
            .entry(lang.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    SharedSnapshot::new(ConfigSnapshot {
        glossary: GlossaryTable::from_json(glossary_json).unwrap_or_default(),
        exclusions: Default::default(),
        overrides: KeyOverrides::new(&table),
    })
}

/// Pipeline over a mock backend
pub fn pipeline(backend: &MockBackend, snapshot: SharedSnapshot) -> TranslationPipeline {
    TranslationPipeline::new(Arc::new(backend.clone()), BackendConfig::default(), snapshot)
}

/// Session for a language backed by the registry's cache
pub async fn session(registry: &CacheRegistry, lang: &str, force_overwrite: bool) -> LanguageSession {
    LanguageSession::new(lang, "translategemma:27b", force_overwrite, registry.open(lang).await)
}

/// Request on a fixed test page
pub fn request(text: &str, lang: &str, key: &str) -> TranslationRequest {
    TranslationRequest::new(text, lang, key, "Home")
}
