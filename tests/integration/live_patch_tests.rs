/*!
 * Integration tests for glossary reloads patching live caches
 */

use resxforge::providers::mock::MockBackend;
use resxforge::translation::cache::{CacheRegistry, cache_file_path};
use resxforge::translation::hot_reload::{reload_exclusions, reload_glossary};
use resxforge::translation::{ConfigWatcher, Resolution};
use std::time::Duration;

use crate::common;

#[tokio::test]
async fn test_reloadGlossary_withNewTerm_shouldPatchCacheAndServeWithoutBackend() {
    let dir = common::create_temp_dir().unwrap();
    let glossary_path = dir.path().join("glossary.json");
    std::fs::write(&glossary_path, "{}").unwrap();

    let backend = MockBackend::fixed("unused");
    let snapshot = common::snapshot("{}", &[]);
    let pipeline = common::pipeline(&backend, snapshot.clone());
    let registry = CacheRegistry::new(dir.path().join("cache"));
    let session = common::session(&registry, "de", false).await;
    session
        .cache
        .lock()
        .await
        .insert("Go to the harbor", "Gehen Sie zum Harbor")
        .await
        .unwrap();

    std::fs::write(&glossary_path, r#"{"de": {"harbor": "Hafen"}}"#).unwrap();
    let patched = reload_glossary(&glossary_path, &snapshot, &registry).await.unwrap();

    assert_eq!(patched, 1);
    let outcome = pipeline
        .translate_with_outcome(&common::request("Go to the harbor", "de", "Directions"), &session)
        .await;
    assert_eq!(outcome.text.as_deref(), Some("Gehen Sie zum Hafen"));
    assert_eq!(outcome.resolution, Resolution::CacheHit);
    assert_eq!(backend.call_count(), 0);

    let on_disk = std::fs::read_to_string(cache_file_path(&dir.path().join("cache"), "de")).unwrap();
    assert!(on_disk.contains("Gehen Sie zum Hafen"));
}

#[tokio::test]
async fn test_reloadGlossary_withUnchangedTerms_shouldNotRewriteCache() {
    let dir = common::create_temp_dir().unwrap();
    let glossary_path = common::create_test_file(dir.path(), "glossary.json", r#"{"fr": {"Harbor": "Port"}}"#).unwrap();

    let snapshot = common::snapshot("{}", &[]);
    let registry = CacheRegistry::new(dir.path().join("cache"));
    let cache = registry.open("fr").await;
    cache.lock().await.insert("Dock", "Quai").await.unwrap();

    assert_eq!(reload_glossary(&glossary_path, &snapshot, &registry).await.unwrap(), 0);
    assert_eq!(reload_glossary(&glossary_path, &snapshot, &registry).await.unwrap(), 0);
    assert_eq!(cache.lock().await.peek("Dock"), Some("Quai"));
}

#[tokio::test]
async fn test_reloadExclusions_withBrokenFile_shouldKeepPrevious() {
    let dir = common::create_temp_dir().unwrap();
    let echo_path = common::create_test_file(dir.path(), "echo.json", r#"{"Global": ["Angkor"]}"#).unwrap();
    let snapshot = common::snapshot("{}", &[]);

    reload_exclusions(&echo_path, &snapshot).unwrap();
    std::fs::write(&echo_path, "[").unwrap();

    assert!(reload_exclusions(&echo_path, &snapshot).is_err());
    assert!(snapshot.current().exclusions.contains("km", "Angkor"));
}

#[tokio::test]
async fn test_configWatcher_withEditedGlossary_shouldSwapSnapshot() {
    let dir = common::create_temp_dir().unwrap();
    let glossary_path = common::create_test_file(dir.path(), "glossary.json", "{}").unwrap();
    let echo_path = dir.path().join("echo.json");
    let snapshot = common::snapshot("{}", &[]);
    let registry = CacheRegistry::new(dir.path().join("cache"));

    let watcher = ConfigWatcher::spawn(
        glossary_path.clone(),
        echo_path,
        snapshot.clone(),
        registry,
        Duration::from_millis(50),
    )
    .await;

    // Different size, so the change is visible even with coarse mtimes
    std::fs::write(&glossary_path, r#"{"ko": {"Harbor": "항구"}}"#).unwrap();

    let mut swapped = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if snapshot.current().glossary.exact("ko", "Harbor") == Some("항구") {
            swapped = true;
            break;
        }
    }
    watcher.stop();

    assert!(swapped, "watcher did not reload the glossary");
}

#[tokio::test]
async fn test_configWatcher_withDeletedGlossary_shouldKeepPreviousTerms() {
    let dir = common::create_temp_dir().unwrap();
    let glossary_path = common::create_test_file(dir.path(), "glossary.json", r#"{"fr": {"Harbor": "Port"}}"#).unwrap();
    let snapshot = common::snapshot(r#"{"fr": {"Harbor": "Port"}}"#, &[]);
    let registry = CacheRegistry::new(dir.path().join("cache"));

    let watcher = ConfigWatcher::spawn(
        glossary_path.clone(),
        dir.path().join("echo.json"),
        snapshot.clone(),
        registry,
        Duration::from_millis(50),
    )
    .await;

    std::fs::remove_file(&glossary_path).unwrap();
    // Long enough for several polls past the debounce window
    tokio::time::sleep(Duration::from_millis(600)).await;
    watcher.stop();

    assert_eq!(snapshot.current().glossary.exact("fr", "Harbor"), Some("Port"));
}
