/*!
 * Heuristics that flag translations for human review.
 *
 * Two signals are computed for every fresh translation: an echo check (the
 * output is the source again) and a script leakage check (Latin letters left
 * in a non-Latin target). Neither blocks caching; they only feed the review log.
 */

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use crate::language_utils::{self, Script};

/// Similarity above which two strings count as an echo
pub const ECHO_SIMILARITY_THRESHOLD: f64 = 0.9;

static LATIN_OR_AMPERSAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z&]").expect("valid leakage regex"));

/// Strings allowed to come back untranslated (brand names, units, ...)
///
/// Entries are compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchoExclusions {
    global: HashSet<String>,
    languages: HashMap<String, HashSet<String>>,
}

/// On-disk shape of the exclusion file
#[derive(Debug, Default, Deserialize)]
struct EchoExclusionsFile {
    #[serde(default, rename = "Global", alias = "global")]
    global: Vec<String>,
    #[serde(default, rename = "Languages", alias = "languages")]
    languages: HashMap<String, Vec<String>>,
}

impl EchoExclusions {
    /// Build from a global list and per-language lists
    pub fn new<G, S>(global: G, languages: HashMap<String, Vec<S>>) -> Self
    where
        G: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            global: global.into_iter().map(|s| fold(s.as_ref())).collect(),
            languages: languages
                .into_iter()
                .map(|(lang, terms)| {
                    (
                        lang.to_lowercase(),
                        terms.iter().map(|s| fold(s.as_ref())).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Parse the JSON exclusion document (`{"Global": [...], "Languages": {...}}`)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: EchoExclusionsFile = serde_json::from_str(json)?;
        Ok(Self::new(file.global, file.languages))
    }

    /// Whether `term` is excluded globally or for `lang`
    pub fn contains(&self, lang: &str, term: &str) -> bool {
        let term = fold(term);
        self.global.contains(&term)
            || self
                .languages
                .get(&lang.to_lowercase())
                .is_some_and(|set| set.contains(&term))
    }

    /// Global terms followed by the terms for `lang`
    pub fn terms_for<'a>(&'a self, lang: &str) -> impl Iterator<Item = &'a str> + 'a {
        let local = self.languages.get(&lang.to_lowercase());
        self.global
            .iter()
            .chain(local.into_iter().flatten())
            .map(String::as_str)
    }

    /// Number of exclusion terms across all scopes
    pub fn len(&self) -> usize {
        self.global.len() + self.languages.values().map(HashSet::len).sum::<usize>()
    }

    /// Whether no exclusion is configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fold(term: &str) -> String {
    term.trim().to_lowercase()
}

fn normalize_for_echo(text: &str) -> Vec<char> {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect()
}

/// Whether `translated` is (nearly) the source again
///
/// Both strings are lowercased and whitespace-collapsed. Beyond equality the
/// check counts characters that match at the same position and divides by the
/// longer length. This positional ratio misjudges strings that differ by an
/// inserted character; it is kept as is for compatibility with existing review logs.
pub fn is_echo(source: &str, translated: &str) -> bool {
    let source = normalize_for_echo(source);
    let translated = normalize_for_echo(translated);

    if source == translated {
        return true;
    }

    let longest = source.len().max(translated.len());
    let same = source
        .iter()
        .zip(translated.iter())
        .filter(|(a, b)| a == b)
        .count();

    (same as f64 / longest as f64) > ECHO_SIMILARITY_THRESHOLD
}

/// Whether Latin letters or '&' survive in output for a non-Latin target
///
/// Excluded terms are removed (case-insensitively) before the check.
pub fn has_script_leakage(lang: &str, text: &str, exclusions: &EchoExclusions) -> bool {
    if language_utils::profile_or_default(lang).script != Script::NonLatin {
        return false;
    }

    let mut scrubbed = text.to_string();
    for term in exclusions.terms_for(lang) {
        if term.is_empty() {
            continue;
        }
        if let Ok(pattern) = RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build() {
            scrubbed = pattern.replace_all(&scrubbed, NoExpand("")).into_owned();
        }
    }

    LATIN_OR_AMPERSAND.is_match(&scrubbed)
}

/// Whether an apparent echo is explicitly allowed
///
/// Only true when source and output are equal ignoring case and the trimmed
/// source is in the global or per-language exclusion set.
pub fn is_echo_excluded(lang: &str, source: &str, translated: &str, exclusions: &EchoExclusions) -> bool {
    let source = source.trim();
    let translated = translated.trim();

    if source.to_lowercase() != translated.to_lowercase() {
        return false;
    }

    exclusions.contains(lang, source)
}

/// Outcome of the heuristics for one translation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityReport {
    /// Output looks like the untranslated source and is not excused
    pub echo: bool,
    /// Latin script leaked into a non-Latin target
    pub leakage: bool,
}

impl QualityReport {
    /// Run all heuristics for a translation
    pub fn assess(lang: &str, source: &str, translated: &str, exclusions: &EchoExclusions) -> Self {
        Self {
            echo: is_echo(source, translated) && !is_echo_excluded(lang, source, translated, exclusions),
            leakage: has_script_leakage(lang, translated, exclusions),
        }
    }

    /// Whether the translation should be reviewed
    pub fn is_flagged(&self) -> bool {
        self.echo || self.leakage
    }
}
