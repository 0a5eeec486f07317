/*!
 * Cleanup of raw model output.
 *
 * Models wrap answers in quotes, prepend arrows copied from the prompt, or
 * append bracketed notes. `sanitize` removes those artifacts without touching
 * the translated words or placeholder tokens.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Bracketed meta annotations such as "[Note: formal register]"
static BRACKETED_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("valid bracket regex"));

const INVISIBLE_CHARS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

const ARROW_MARKERS: [&str; 3] = ["➡️", "➡", "->"];

const WRAPPING_CHARS: [char; 11] = [' ', '"', '\'', '„', '“', '”', '「', '」', '\n', '\r', '\t'];

const TERMINAL_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Strip invisible characters, bracketed annotations, arrow markers and
/// wrapping quotes from model output
pub fn sanitize(raw: &str) -> String {
    let visible: String = raw.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect();

    let mut cleaned = BRACKETED_SPAN.replace_all(&visible, "").into_owned();
    for marker in ARROW_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }

    cleaned.trim_matches(&WRAPPING_CHARS[..]).to_string()
}

/// Drop trailing sentence punctuation the source did not have
pub fn align_terminal_punctuation(source: &str, translated: &str) -> String {
    if source.trim_end().ends_with(&TERMINAL_PUNCTUATION[..]) {
        translated.to_string()
    } else {
        translated.trim_end_matches(&TERMINAL_PUNCTUATION[..]).to_string()
    }
}
