/*!
 * Integration tests for the per-entry pipeline and the batch orchestrator
 */

use resxforge::app_config::BackendConfig;
use resxforge::providers::mock::MockBackend;
use resxforge::translation::cache::CacheRegistry;
use resxforge::translation::{BatchOrchestrator, LanguagePlan, Resolution, ReviewLog, TranslationPipeline};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::common;

#[tokio::test]
async fn test_translate_withRepeatedRequest_shouldCallBackendOnce() {
    let dir = common::create_temp_dir().unwrap();
    let backend = MockBackend::fixed("Enregistrer");
    let pipeline = common::pipeline(&backend, common::snapshot("{}", &[]));
    let registry = CacheRegistry::new(dir.path());
    let session = common::session(&registry, "fr", false).await;

    let first = pipeline.translate(&common::request("Save", "fr", "Save"), &session).await;
    let second = pipeline.translate_with_outcome(&common::request("Save", "fr", "Save"), &session).await;

    assert_eq!(first.as_deref(), Some("Enregistrer"));
    assert_eq!(second.text, first);
    assert_eq!(second.resolution, Resolution::CacheHit);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_translate_withKeyOverride_shouldWinOverCachedValue() {
    let dir = common::create_temp_dir().unwrap();
    let backend = MockBackend::fixed("unused");
    let pipeline = common::pipeline(&backend, common::snapshot("{}", &[("km", "Language", "ភាសា")]));
    let registry = CacheRegistry::new(dir.path());
    let session = common::session(&registry, "km", false).await;
    session.cache.lock().await.insert("Language", "ភាសាចាស់").await.unwrap();

    let outcome = pipeline
        .translate_with_outcome(&common::request("Language", "km", "Language"), &session)
        .await;

    assert_eq!(outcome.text.as_deref(), Some("ភាសា"));
    assert_eq!(outcome.resolution, Resolution::Override);
    assert_eq!(backend.call_count(), 0);
    // Overrides are never written to the cache
    assert_eq!(session.cache.lock().await.peek("Language"), Some("ភាសាចាស់"));
}

#[tokio::test]
async fn test_translate_withGlossaryKey_shouldCacheForcedValue() {
    let dir = common::create_temp_dir().unwrap();
    let backend = MockBackend::fixed("unused");
    let pipeline = common::pipeline(&backend, common::snapshot(r#"{"de": {"NavHome": "Startseite"}}"#, &[]));
    let registry = CacheRegistry::new(dir.path());
    let session = common::session(&registry, "de", false).await;

    let outcome = pipeline
        .translate_with_outcome(&common::request("Home", "de", "NavHome"), &session)
        .await;

    assert_eq!(outcome.resolution, Resolution::GlossaryExact);
    assert_eq!(session.cache.lock().await.peek("Home"), Some("Startseite"));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withForceOverwrite_shouldReplaceCachedValue() {
    let dir = common::create_temp_dir().unwrap();
    let backend = MockBackend::fixed("Annuler");
    let pipeline = common::pipeline(&backend, common::snapshot("{}", &[]));
    let registry = CacheRegistry::new(dir.path());
    let session = common::session(&registry, "fr", true).await;
    session.cache.lock().await.insert("Cancel", "Abandonner").await.unwrap();

    let outcome = pipeline
        .translate_with_outcome(&common::request("Cancel", "fr", "Cancel"), &session)
        .await;

    assert_eq!(outcome.text.as_deref(), Some("Annuler"));
    assert_eq!(outcome.resolution, Resolution::Rewritten);
    assert_eq!(backend.call_count(), 1);
    assert_eq!(session.cache.lock().await.peek("Cancel"), Some("Annuler"));
}

#[tokio::test]
async fn test_translate_withFailingBackend_shouldReturnNoneAndNotCache() {
    let dir = common::create_temp_dir().unwrap();
    let backend = MockBackend::failing();
    let pipeline = common::pipeline(&backend, common::snapshot("{}", &[]));
    let registry = CacheRegistry::new(dir.path());
    let session = common::session(&registry, "es", false).await;

    let result = pipeline.translate(&common::request("Delete", "es", "Delete"), &session).await;

    assert!(result.is_none());
    assert!(session.cache.lock().await.is_empty());
}

#[tokio::test]
async fn test_translate_withSlowBackend_shouldTimeOutWithoutCaching() {
    let dir = common::create_temp_dir().unwrap();
    let backend = MockBackend::fixed("Supprimer").with_delay(Duration::from_secs(3));
    let config = BackendConfig {
        timeout_secs: 1,
        ..BackendConfig::default()
    };
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), config, common::snapshot("{}", &[]));
    let registry = CacheRegistry::new(dir.path());
    let session = common::session(&registry, "fr", false).await;

    let outcome = pipeline
        .translate_with_outcome(&common::request("Delete", "fr", "Delete"), &session)
        .await;

    assert!(outcome.text.is_none());
    assert_eq!(outcome.resolution, Resolution::Failed);
    assert!(session.cache.lock().await.is_empty());

    // The next entry is still attempted
    let next = pipeline.translate(&common::request("Rename", "fr", "Rename"), &session).await;
    assert!(next.is_none());
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_translate_withNumberInGlossaryTerm_shouldListTermInPrompt() {
    let dir = common::create_temp_dir().unwrap();
    let backend = MockBackend::fixed("Nehmen Sie die Bundesstraße 66");
    let pipeline = common::pipeline(&backend, common::snapshot(r#"{"de": {"Route 66": "Bundesstraße 66"}}"#, &[]));
    let registry = CacheRegistry::new(dir.path());
    let session = common::session(&registry, "de", false).await;

    pipeline
        .translate(&common::request("Take Route 66", "de", "Directions"), &session)
        .await;

    let prompt = backend.requests()[0].prompt.clone().unwrap_or_default();
    assert!(prompt.contains("- Route 66 -> Bundesstraße 66"));
    assert!(prompt.ends_with("Take Route {{NUM_A}}"));
}

#[tokio::test]
async fn test_translate_withEchoedOutput_shouldFlagButStillCache() {
    let dir = common::create_temp_dir().unwrap();
    let review_path = dir.path().join("review.log");
    let backend = MockBackend::fixed("Dashboard");
    let pipeline = common::pipeline(&backend, common::snapshot("{}", &[]))
        .with_review_log(ReviewLog::new(&review_path, &[]));
    let registry = CacheRegistry::new(dir.path().join("cache"));
    let session = common::session(&registry, "it", false).await;

    let outcome = pipeline
        .translate_with_outcome(&common::request("Dashboard", "it", "Title"), &session)
        .await;

    assert!(outcome.quality.echo);
    assert_eq!(session.cache.lock().await.peek("Dashboard"), Some("Dashboard"));

    let review = std::fs::read_to_string(&review_path).unwrap();
    assert!(review.contains("⚠ Home [it Title]"));
    assert!(pipeline.summary().contents().contains("it Title | Dashboard"));
}

#[tokio::test]
async fn test_translateDocument_withForceOnOneLanguage_shouldLeaveOtherCacheAlone() {
    let dir = common::create_temp_dir().unwrap();
    let registry = CacheRegistry::new(dir.path());
    {
        let fr = registry.open("fr").await;
        fr.lock().await.insert("Open", "Ouvrir (ancien)").await.unwrap();
        let de = registry.open("de").await;
        de.lock().await.insert("Open", "Öffnen (alt)").await.unwrap();
    }

    let backend = common::echo_backend().with_delay(Duration::from_millis(10));
    let config = BackendConfig::default();
    let pipeline = common::pipeline(&backend, common::snapshot("{}", &[]));
    let orchestrator = BatchOrchestrator::new(pipeline, registry.clone(), config);

    let entries = vec![("Open".to_string(), "Open".to_string())];
    let plans = vec![LanguagePlan::new("fr", true), LanguagePlan::new("de", false)];
    let results = orchestrator.translate_document("Home", &entries, &plans, |_, _| {}).await;

    assert_eq!(results[0].translations[0].1.as_deref(), Some("T(Open)"));
    assert_eq!(results[1].translations[0].1.as_deref(), Some("Öffnen (alt)"));
    assert_eq!(registry.open("de").await.lock().await.peek("Open"), Some("Öffnen (alt)"));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_translateDocument_withTwoModelVariants_shouldUnloadBetweenGroups() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = BackendConfig::default();
    config.language_models.insert("km".to_string(), "translategemma:12b".to_string());

    let backend = common::echo_backend();
    let pipeline = common::pipeline(&backend, common::snapshot("{}", &[]));
    let orchestrator = BatchOrchestrator::new(pipeline, CacheRegistry::new(dir.path()), config)
        .with_max_concurrent_languages(2);

    let progress = Arc::new(AtomicUsize::new(0));
    let seen = progress.clone();
    let entries = vec![("Title".to_string(), "Welcome".to_string())];
    let plans = vec![
        LanguagePlan::new("km", false),
        LanguagePlan::new("fr", false),
        LanguagePlan::new("de", false),
    ];

    let results = orchestrator
        .translate_document("Home", &entries, &plans, move |completed, _| {
            seen.fetch_max(completed, Ordering::SeqCst);
        })
        .await;

    let languages: Vec<&str> = results.iter().map(|r| r.language.as_str()).collect();
    assert_eq!(languages, vec!["km", "fr", "de"]);
    assert_eq!(results[0].model, "translategemma:12b");
    assert_eq!(results[1].model, "translategemma:27b");
    assert_eq!(backend.unloaded(), vec!["translategemma:12b".to_string()]);
    assert_eq!(progress.load(Ordering::SeqCst), 3);
}
