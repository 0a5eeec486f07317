use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for target-language handling
///
/// This module holds the static per-language rule table the translation
/// engine consults: display names, expected script, native numerals and the
/// numeric/style rules baked into prompts.

/// Writing system a target language is expected to be rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Latin alphabet, Latin letters in output are normal
    Latin,
    /// Any non-Latin script, Latin letters in output indicate leakage
    NonLatin,
}

/// Numeric formatting convention requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberRule {
    /// Khmer numerals, Gregorian years
    KhmerDigits,
    /// Arabic numerals for years with native year suffix
    CjkYears,
    /// Thai numerals, years already shifted to Buddhist Era
    ThaiDigits,
    /// Lao numerals
    LaoDigits,
    /// Arabic numerals with European separators
    European,
    /// Dot thousands, comma decimals, years prefixed with "năm"
    Vietnamese,
    /// Arabic numerals rather than Devanagari
    ArabicOverNative,
    /// Keep the source formatting
    Standard,
}

/// Static formatting profile for a target language
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    /// ISO 639-1 code
    pub code: &'static str,
    /// English display name used in prompts
    pub name: &'static str,
    /// Expected script of translated output
    pub script: Script,
    /// Native digit glyphs 0-9 substituted when numbers are restored
    pub native_digits: Option<&'static str>,
    /// Years in [1000, 2099] are shifted by +543 before inference
    pub buddhist_era: bool,
    /// Prompt numeric rule
    pub number_rule: NumberRule,
    /// Hyphen-joined noun compounds are unidiomatic in this language
    pub avoid_hyphen_compounds: bool,
    /// Symbols such as '&' and '+' should be spelled out
    pub symbols_to_words: bool,
}

const KHMER_DIGITS: &str = "០១២៣៤៥៦៧៨៩";
const THAI_DIGITS: &str = "๐๑๒๓๔๕๖๗๘๙";
const LAO_DIGITS: &str = "໐໑໒໓໔໕໖໗໘໙";

const fn latin(code: &'static str, name: &'static str, number_rule: NumberRule) -> LanguageProfile {
    LanguageProfile {
        code,
        name,
        script: Script::Latin,
        native_digits: None,
        buddhist_era: false,
        number_rule,
        avoid_hyphen_compounds: false,
        symbols_to_words: false,
    }
}

const fn non_latin(code: &'static str, name: &'static str, number_rule: NumberRule) -> LanguageProfile {
    LanguageProfile {
        code,
        name,
        script: Script::NonLatin,
        native_digits: None,
        buddhist_era: false,
        number_rule,
        avoid_hyphen_compounds: false,
        symbols_to_words: true,
    }
}

/// Every target language the tool knows formatting rules for
pub static LANGUAGE_PROFILES: &[LanguageProfile] = &[
    LanguageProfile {
        native_digits: Some(KHMER_DIGITS),
        ..non_latin("km", "Khmer", NumberRule::KhmerDigits)
    },
    non_latin("zh", "Simplified Chinese", NumberRule::CjkYears),
    latin("vi", "Vietnamese", NumberRule::Vietnamese),
    LanguageProfile {
        native_digits: Some(THAI_DIGITS),
        buddhist_era: true,
        ..non_latin("th", "Thai", NumberRule::ThaiDigits)
    },
    LanguageProfile {
        avoid_hyphen_compounds: true,
        ..latin("de", "German", NumberRule::European)
    },
    non_latin("ja", "Japanese", NumberRule::CjkYears),
    latin("fr", "French", NumberRule::European),
    latin("id", "Indonesian", NumberRule::Standard),
    latin("ms", "Malay", NumberRule::Standard),
    non_latin("ko", "Korean", NumberRule::Standard),
    LanguageProfile {
        avoid_hyphen_compounds: true,
        ..latin("nl", "Dutch", NumberRule::European)
    },
    latin("it", "Italian", NumberRule::European),
    latin("es", "Spanish", NumberRule::European),
    non_latin("hi", "Hindi", NumberRule::ArabicOverNative),
    non_latin("ru", "Russian", NumberRule::European),
    latin("pt", "Portuguese", NumberRule::European),
    latin("cs", "Czech", NumberRule::European),
    LanguageProfile {
        native_digits: Some(LAO_DIGITS),
        ..non_latin("lo", "Lao", NumberRule::LaoDigits)
    },
    LanguageProfile {
        avoid_hyphen_compounds: true,
        ..latin("sv", "Swedish", NumberRule::European)
    },
];

/// Look up the static profile for a language code (case-insensitive)
pub fn profile(code: &str) -> Option<&'static LanguageProfile> {
    let code = code.trim();
    LANGUAGE_PROFILES
        .iter()
        .find(|p| p.code.eq_ignore_ascii_case(code))
}

/// Profile for a language, falling back to a plain Latin profile for unknown codes
pub fn profile_or_default(code: &str) -> LanguageProfile {
    profile(code)
        .copied()
        .unwrap_or_else(|| latin("", "", NumberRule::Standard))
}

/// Check whether a code has a profile in the rule table
pub fn is_supported(code: &str) -> bool {
    profile(code).is_some()
}

/// Codes of all supported target languages, in table order
pub fn supported_codes() -> Vec<&'static str> {
    LANGUAGE_PROFILES.iter().map(|p| p.code).collect()
}

/// Validate that a code is a known ISO 639-1 code
pub fn validate_language_code(code: &str) -> Result<()> {
    let normalized_code = code.trim().to_lowercase();
    if is_supported(&normalized_code) || Language::from_639_1(&normalized_code).is_some() {
        return Ok(());
    }
    Err(anyhow!("Invalid language code: {}", code))
}

/// Get the English display name for a language code
///
/// The rule table wins (it carries prompt-specific names such as
/// "Simplified Chinese"); other ISO 639-1 codes fall back to isolang.
pub fn get_language_name(code: &str) -> Result<String> {
    if let Some(profile) = profile(code) {
        return Ok(profile.name.to_string());
    }

    let normalized_code = code.trim().to_lowercase();
    Language::from_639_1(&normalized_code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Replace ASCII digits with the given ten native digit glyphs
pub fn convert_digits(input: &str, native_digits: &str) -> String {
    let glyphs: Vec<char> = native_digits.chars().collect();
    if glyphs.len() != 10 {
        return input.to_string();
    }

    input
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if c.is_ascii_digit() => glyphs[d as usize],
            _ => c,
        })
        .collect()
}
