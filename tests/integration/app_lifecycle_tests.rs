/*!
 * End-to-end tests: base .resx files in, translated files and logs out
 */

use resxforge::app_config::Config;
use resxforge::app_controller::{Controller, RunOptions};
use resxforge::providers::mock::MockBackend;
use resxforge::resx::{ResxDocument, read_entries};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::common;

fn test_config(root: &Path, languages: &[&str]) -> Config {
    Config {
        target_languages: languages.iter().map(|l| l.to_string()).collect(),
        resources_dir: root.join("Resources"),
        cache_dir: root.join("cache"),
        config_dir: root.join("config"),
        review_log_path: Some(root.join("review.log")),
        summary_log_dir: Some(root.join("logs")),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_run_withTwoLanguages_shouldWriteTranslatedFiles() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let resources = dir.path().join("Resources");
    common::create_test_file(
        &resources,
        "Home.resx",
        &common::resx_content(&[("Save", "Save"), ("Blank", " "), ("Year", "Since 1999")]),
    )
    .unwrap();

    let backend = common::echo_backend();
    let controller = Controller::with_config(test_config(dir.path(), &["fr", "de"]), RunOptions::default()).unwrap();
    let report = controller.run_with_backend(Arc::new(backend.clone())).await.unwrap();

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failed_entries, 0);
    assert!(!report.interrupted);

    let fr = std::fs::read_to_string(resources.join("Home.fr.resx")).unwrap();
    let entries = read_entries(&fr).unwrap();
    assert_eq!(entries[0].value, "T(Save)");
    assert_eq!(entries[1].value, "T(Since 1999)");
    assert!(resources.join("Home.de.resx").exists());
    assert_eq!(backend.call_count(), 4);

    let summary = std::fs::read_to_string(dir.path().join("logs").join("FullTranslation.log")).unwrap();
    assert!(summary.contains("fr Save | T(Save)"));
}

#[tokio::test]
async fn test_run_twice_shouldServeSecondRunFromCache() {
    let dir = common::create_temp_dir().unwrap();
    let resources = dir.path().join("Resources");
    common::create_test_file(&resources, "Login.resx", &common::resx_content(&[("Title", "Sign in")])).unwrap();

    let backend = common::echo_backend();
    for _ in 0..2 {
        let controller = Controller::with_config(test_config(dir.path(), &["ja"]), RunOptions::default()).unwrap();
        controller.run_with_backend(Arc::new(backend.clone())).await.unwrap();
    }

    assert_eq!(backend.call_count(), 1);
    assert!(dir.path().join("cache").join("cache_ja.json").exists());
}

#[tokio::test]
async fn test_run_withPageFilter_shouldSkipOtherFilesAndTranslations() {
    let dir = common::create_temp_dir().unwrap();
    let resources = dir.path().join("Resources");
    common::create_test_file(&resources, "Home.resx", &common::resx_content(&[("A", "Home")])).unwrap();
    common::create_test_file(&resources, "About.resx", &common::resx_content(&[("B", "About us")])).unwrap();
    common::create_test_file(&resources, "Home.es.resx", &common::resx_content(&[("A", "Inicio")])).unwrap();

    let options = RunOptions {
        pages: vec!["home".to_string()],
        ..RunOptions::default()
    };
    let controller = Controller::with_config(test_config(dir.path(), &["es"]), options).unwrap();
    let report = controller.run_with_backend(Arc::new(common::echo_backend())).await.unwrap();

    assert_eq!(report.written, vec![resources.join("Home.es.resx")]);
    assert!(!resources.join("About.es.resx").exists());
    assert!(dir.path().join("logs").join("home.log").exists());
}

#[tokio::test]
async fn test_run_withKeyOverrideAndFailingBackend_shouldKeepSourceForFailures() {
    let dir = common::create_temp_dir().unwrap();
    let resources = dir.path().join("Resources");
    let base = common::create_test_file(
        &resources,
        "Settings.resx",
        &common::resx_content(&[("Language", "Language"), ("Theme", "Theme")]),
    )
    .unwrap();

    let mut config = test_config(dir.path(), &["km"]);
    config.key_overrides = HashMap::from([(
        "km".to_string(),
        HashMap::from([("Language".to_string(), "ភាសា".to_string())]),
    )]);

    let controller = Controller::with_config(config, RunOptions::default()).unwrap();
    let report = controller.run_with_backend(Arc::new(MockBackend::failing())).await.unwrap();

    assert_eq!(report.failed_entries, 1);
    let translated = ResxDocument::load(base.with_file_name("Settings.km.resx")).unwrap();
    let values: Vec<&str> = translated.entries().iter().map(|e| e.value.as_str()).collect();
    assert_eq!(values, vec!["ភាសា", "Theme"]);
}

#[tokio::test]
async fn test_run_withShutdownRequested_shouldWriteNothing() {
    let dir = common::create_temp_dir().unwrap();
    let resources = dir.path().join("Resources");
    common::create_test_file(&resources, "Home.resx", &common::resx_content(&[("Save", "Save")])).unwrap();

    let backend = common::echo_backend();
    let controller = Controller::with_config(test_config(dir.path(), &["fr"]), RunOptions::default()).unwrap();
    controller.shutdown_flag().store(true, Ordering::SeqCst);

    let report = controller.run_with_backend(Arc::new(backend.clone())).await.unwrap();

    assert!(report.interrupted);
    assert!(report.written.is_empty());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_run_withMixedModelVariants_shouldLoadEachVariantOncePerRun() {
    let dir = common::create_temp_dir().unwrap();
    let resources = dir.path().join("Resources");
    for page in ["Home", "About", "Login"] {
        common::create_test_file(&resources, &format!("{}.resx", page), &common::resx_content(&[("Title", page)]))
            .unwrap();
    }

    let mut config = test_config(dir.path(), &["fr", "km"]);
    config
        .backend
        .language_models
        .insert("km".to_string(), "translategemma:4b".to_string());

    let backend = common::echo_backend();
    let controller = Controller::with_config(config, RunOptions::default()).unwrap();
    let report = controller.run_with_backend(Arc::new(backend.clone())).await.unwrap();

    assert_eq!(report.written.len(), 6);
    assert_eq!(backend.unloaded(), vec!["translategemma:27b".to_string()]);
    assert!(resources.join("Login.km.resx").exists());
}
