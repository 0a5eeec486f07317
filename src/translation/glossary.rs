/*!
 * Operator-supplied terminology and the shared configuration snapshot.
 *
 * Translation tasks read glossary terms, key overrides and echo exclusions
 * through `SharedSnapshot`. The hot reloader builds a fresh
 * `ConfigSnapshot` and swaps it in whole, so a reader sees either the old or
 * the new tables, never a mix.
 */

use log::warn;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::errors::ConfigError;
use super::quality::EchoExclusions;

/// Forced translations for one language: term or resource key -> translation
pub type LanguageGlossary = BTreeMap<String, String>;

/// Glossary terms for every language (language codes compared case-insensitively)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlossaryTable {
    languages: HashMap<String, LanguageGlossary>,
}

impl GlossaryTable {
    /// Build from a language -> terms map
    pub fn new(languages: HashMap<String, LanguageGlossary>) -> Self {
        let mut table = Self::default();
        for (lang, terms) in languages {
            table
                .languages
                .entry(lang.trim().to_lowercase())
                .or_default()
                .extend(terms);
        }
        table
    }

    /// Parse glossary.json (`{"de": {"Roundabout": "Kreisverkehr"}}`)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, LanguageGlossary> = serde_json::from_str(json)?;
        Ok(Self::new(raw))
    }

    /// Terms for a language
    pub fn for_language(&self, lang: &str) -> Option<&LanguageGlossary> {
        self.languages.get(&lang.trim().to_lowercase())
    }

    /// Direct mapping for a resource key, exact match first, then ignoring case
    pub fn exact(&self, lang: &str, key: &str) -> Option<&str> {
        let terms = self.for_language(lang)?;
        terms
            .get(key)
            .or_else(|| {
                let wanted = key.to_lowercase();
                terms
                    .iter()
                    .find(|(term, _)| term.to_lowercase() == wanted)
                    .map(|(_, forced)| forced)
            })
            .map(String::as_str)
    }

    /// Languages with at least one term
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Total number of terms across languages
    pub fn len(&self) -> usize {
        self.languages.values().map(BTreeMap::len).sum()
    }

    /// Whether no term is configured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Terms that are new in `self` compared to `previous`, per language
    ///
    /// A term counts as new when it was absent before or now maps to a
    /// different translation. Removed terms are ignored.
    pub fn new_terms_since(&self, previous: &GlossaryTable) -> HashMap<String, Vec<(String, String)>> {
        let mut added = HashMap::new();

        for (lang, terms) in &self.languages {
            let before = previous.languages.get(lang);
            let fresh: Vec<(String, String)> = terms
                .iter()
                .filter(|(term, forced)| before.and_then(|b| b.get(*term)) != Some(*forced))
                .map(|(term, forced)| (term.clone(), forced.clone()))
                .collect();

            if !fresh.is_empty() {
                added.insert(lang.clone(), fresh);
            }
        }

        added
    }
}

/// Fixed translations for exact resource keys, per language
///
/// These come from the static configuration and are never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyOverrides {
    languages: HashMap<String, HashMap<String, String>>,
}

impl KeyOverrides {
    /// Build from the configuration table
    pub fn new(languages: &HashMap<String, HashMap<String, String>>) -> Self {
        Self {
            languages: languages
                .iter()
                .map(|(lang, keys)| (lang.trim().to_lowercase(), keys.clone()))
                .collect(),
        }
    }

    /// Override for a resource key in a language
    pub fn get(&self, lang: &str, key: &str) -> Option<&str> {
        self.languages
            .get(&lang.trim().to_lowercase())?
            .get(key)
            .map(String::as_str)
    }
}

/// Immutable view of every reloadable table
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    /// Glossary terms
    pub glossary: GlossaryTable,
    /// Strings allowed to echo or stay in Latin script
    pub exclusions: EchoExclusions,
    /// Fixed per-key translations
    pub overrides: KeyOverrides,
}

/// Atomically swappable handle to the current `ConfigSnapshot`
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Arc<ConfigSnapshot>>>,
}

impl SharedSnapshot {
    /// Wrap an initial snapshot
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The snapshot current at the time of the call
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.inner.read().clone()
    }

    /// Replace the snapshot, returning the one it replaced
    pub fn replace(&self, snapshot: ConfigSnapshot) -> Arc<ConfigSnapshot> {
        let mut guard = self.inner.write();
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }

    /// Swap in a new glossary, keeping the other tables
    pub fn replace_glossary(&self, glossary: GlossaryTable) -> Arc<ConfigSnapshot> {
        let mut guard = self.inner.write();
        let next = ConfigSnapshot {
            glossary,
            ..(**guard).clone()
        };
        std::mem::replace(&mut *guard, Arc::new(next))
    }

    /// Swap in new echo exclusions, keeping the other tables
    pub fn replace_exclusions(&self, exclusions: EchoExclusions) -> Arc<ConfigSnapshot> {
        let mut guard = self.inner.write();
        let next = ConfigSnapshot {
            exclusions,
            ..(**guard).clone()
        };
        std::mem::replace(&mut *guard, Arc::new(next))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        warn!("⚠ {} not found.", path.display());
        return Ok(None);
    }

    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// Load glossary.json; a missing file yields an empty table
pub fn load_glossary(path: &Path) -> Result<GlossaryTable, ConfigError> {
    match read_optional(path)? {
        Some(json) => GlossaryTable::from_json(&json).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
        None => Ok(GlossaryTable::default()),
    }
}

/// Load echo.json; a missing file yields no exclusions
pub fn load_exclusions(path: &Path) -> Result<EchoExclusions, ConfigError> {
    match read_optional(path)? {
        Some(json) => EchoExclusions::from_json(&json).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
        None => Ok(EchoExclusions::default()),
    }
}
