/*!
 * Tests for echo and script leakage heuristics
 */

use resxforge::translation::quality::{
    EchoExclusions, QualityReport, has_script_leakage, is_echo, is_echo_excluded,
};
use std::collections::HashMap;

fn exclusions(global: &[&str], local: &[(&str, &[&str])]) -> EchoExclusions {
    let languages: HashMap<String, Vec<&str>> = local
        .iter()
        .map(|(lang, terms)| (lang.to_string(), terms.to_vec()))
        .collect();
    EchoExclusions::new(global.iter().copied(), languages)
}

#[test]
fn test_isEcho_withIdenticalText_shouldBeTrue() {
    assert!(is_echo("OK", "OK"));
    assert!(is_echo("Hello   World", "hello world"));
}

#[test]
fn test_isEcho_withRealTranslation_shouldBeFalse() {
    assert!(!is_echo("Hello world", "Hola mundo"));
}

#[test]
fn test_isEcho_withInsertedLeadingCharacter_shouldMissByPosition() {
    // Shifted by one position, so almost nothing lines up
    assert!(!is_echo("Settings", "xSettings"));
}

#[test]
fn test_hasScriptLeakage_withLatinInChinese_shouldBeTrue() {
    let none = EchoExclusions::default();
    assert!(has_script_leakage("zh", "你好 Hello", &none));
    assert!(!has_script_leakage("zh", "你好", &none));
}

#[test]
fn test_hasScriptLeakage_withExcludedTerm_shouldBeFalse() {
    let excl = exclusions(&["Hello"], &[]);
    assert!(!has_script_leakage("zh", "你好 Hello", &excl));
    assert!(!has_script_leakage("zh", "你好 HELLO", &excl));
}

#[test]
fn test_hasScriptLeakage_withAmpersand_shouldBeTrue() {
    assert!(has_script_leakage("th", "บันทึก & ปิด", &EchoExclusions::default()));
}

#[test]
fn test_hasScriptLeakage_withLatinTarget_shouldBeFalse() {
    assert!(!has_script_leakage("fr", "Bonjour & merci", &EchoExclusions::default()));
}

#[test]
fn test_isEchoExcluded_withLanguageExclusion_shouldOnlyApplyToThatLanguage() {
    let excl = exclusions(&[], &[("de", &["Email"])]);
    assert!(is_echo_excluded("de", " Email ", "email", &excl));
    assert!(!is_echo_excluded("fr", "Email", "Email", &excl));
    assert!(!is_echo_excluded("de", "Email", "E-Mail", &excl));
}

#[test]
fn test_qualityReport_assess_withExcludedEcho_shouldNotFlag() {
    let excl = exclusions(&["OK"], &[]);
    assert!(!QualityReport::assess("fr", "OK", "OK", &excl).is_flagged());

    let report = QualityReport::assess("fr", "Cancel", "Cancel", &EchoExclusions::default());
    assert!(report.echo);
    assert!(report.is_flagged());
}

#[test]
fn test_fromJson_withCapitalizedKeys_shouldLoadBothScopes() {
    let excl = EchoExclusions::from_json(r#"{"Global": ["PDF"], "Languages": {"km": ["Angkor"]}}"#).unwrap();
    assert!(excl.contains("km", "pdf"));
    assert!(excl.contains("KM", "angkor"));
    assert!(!excl.contains("lo", "angkor"));
}
