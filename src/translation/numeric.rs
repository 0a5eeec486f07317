/*!
 * Numeric literal protection.
 *
 * Numbers are swapped for opaque placeholders before the text reaches the
 * model and restored afterwards, so the model cannot reformat, translate or
 * miscalculate them. Calendar shifts and native digit sets are applied here
 * rather than requested from the model.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::language_utils::{self, convert_digits};

/// Decade form ("1990s") or a number with optional thousands groups and decimals
static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{4}s|[0-9]+(?:,[0-9]{3})*(?:\.[0-9]+)?").expect("valid number regex"));

/// Placeholder tokens as they may come back from the model (any case, loose spacing)
static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\{\{\s*NUM_([A-Z]+)\s*\}\}").expect("valid placeholder regex"));

const BUDDHIST_ERA_OFFSET: i64 = 543;

/// Placeholder-to-literal mapping for a single translation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericContext {
    placeholders: Vec<(String, String)>,
}

impl NumericContext {
    /// Number of protected literals
    pub fn len(&self) -> usize {
        self.placeholders.len()
    }

    /// Whether no literal was protected
    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }

    /// Stored literal for a placeholder token (case-insensitive)
    pub fn literal(&self, placeholder: &str) -> Option<&str> {
        let wanted = placeholder_id(placeholder)?;
        self.placeholders
            .iter()
            .find(|(token, _)| placeholder_id(token).as_deref() == Some(wanted.as_str()))
            .map(|(_, literal)| literal.as_str())
    }

    /// Placeholders and their literals in source order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.placeholders.iter().map(|(t, l)| (t.as_str(), l.as_str()))
    }

    /// Placeholders that do not appear in the model output
    pub fn missing_in(&self, translated: &str) -> Vec<String> {
        let present: Vec<String> = PLACEHOLDER_PATTERN
            .captures_iter(translated)
            .map(|caps| caps[1].to_ascii_uppercase())
            .collect();

        self.placeholders
            .iter()
            .filter(|(token, _)| {
                placeholder_id(token).map(|id| !present.contains(&id)).unwrap_or(true)
            })
            .map(|(token, _)| token.clone())
            .collect()
    }
}

/// Whether text still contains placeholder tokens
pub fn has_placeholder_residue(text: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(text)
}

/// Replace numeric literals with placeholders
///
/// Decade suffixes are dropped from the stored literal. For languages using
/// the Buddhist Era, integers in [1000, 2099] are shifted by 543 before they
/// are stored.
pub fn preprocess(text: &str, lang: &str) -> (String, NumericContext) {
    let profile = language_utils::profile_or_default(lang);
    let mut context = NumericContext::default();

    let processed = NUMBER_PATTERN.replace_all(text, |caps: &Captures| {
        let matched = &caps[0];
        let mut literal = matched.strip_suffix('s').unwrap_or(matched).to_string();

        if profile.buddhist_era {
            if let Ok(number) = literal.replace(',', "").parse::<i64>() {
                if (1000..=2099).contains(&number) {
                    literal = (number + BUDDHIST_ERA_OFFSET).to_string();
                }
            }
        }

        let token = placeholder_token(context.placeholders.len());
        context.placeholders.push((token.clone(), literal));
        token
    });

    (processed.into_owned(), context)
}

/// Restore placeholders in model output
///
/// Tokens are matched case-insensitively. Literals are rendered in the
/// language's native digits where it has them. Tokens unknown to the context
/// are left untouched.
pub fn postprocess(translated: &str, context: &NumericContext, lang: &str) -> String {
    if context.is_empty() {
        return translated.to_string();
    }

    let profile = language_utils::profile_or_default(lang);

    PLACEHOLDER_PATTERN
        .replace_all(translated, |caps: &Captures| match context.literal(&caps[0]) {
            Some(literal) => match profile.native_digits {
                Some(digits) => convert_digits(literal, digits),
                None => literal.to_string(),
            },
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Sequential letter-only token: 0 -> {{NUM_A}}, 25 -> {{NUM_Z}}, 26 -> {{NUM_AA}}
fn placeholder_token(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{{{{NUM_{}}}}}", letters.into_iter().collect::<String>())
}

fn placeholder_id(token: &str) -> Option<String> {
    PLACEHOLDER_PATTERN
        .captures(token)
        .map(|caps| caps[1].to_ascii_uppercase())
}
