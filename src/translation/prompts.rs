/*!
 * Prompt construction for UI string translation.
 *
 * `build_prompt` is a pure function of its inputs and the static language
 * rule table: framing, optional glossary clause, numeric rule, compound-word
 * rule, closing constraints, then the source text itself.
 */

use std::collections::BTreeMap;

use crate::language_utils::{self, LanguageProfile, NumberRule};

/// Build the full instruction block for one source string
pub fn build_prompt(
    text: &str,
    lang: &str,
    lang_name: &str,
    glossary: Option<&BTreeMap<String, String>>,
) -> String {
    build_prompt_for_source(text, text, lang, lang_name, glossary)
}

/// Build the prompt for `text`, selecting glossary terms from `source_text`
///
/// `text` is what the model sees, usually with numbers already replaced by
/// placeholders. Terms such as "Route 66" only match the untouched source.
pub fn build_prompt_for_source(
    text: &str,
    source_text: &str,
    lang: &str,
    lang_name: &str,
    glossary: Option<&BTreeMap<String, String>>,
) -> String {
    let profile = language_utils::profile_or_default(lang);

    let mut rules = Vec::new();
    rules.push(format!("- {}", number_instruction(profile.number_rule, lang_name)));
    rules.push("- Keep every placeholder such as {{NUM_A}} exactly as written.".to_string());
    if profile.symbols_to_words {
        rules.push(format!(
            "- Translate symbols like '&' or '+' into the equivalent words in {}.",
            lang_name
        ));
    }
    if let Some(style) = style_instruction(&profile, lang_name) {
        rules.push(style);
    }
    rules.push("- Keep translations concise to fit UI elements.".to_string());
    rules.push("- Produce ONLY the translation. No explanations or [meta] tags.".to_string());
    rules.push("- NO conversational filler (e.g., \"Sure\", \"Here is the translation\").".to_string());
    rules.push("- NO quotation marks.".to_string());
    rules.push(
        "- Do NOT include any English words in the output unless they are proper nouns or a glossary translation above requires them."
            .to_string(),
    );
    rules.push(format!("- The output must be fully written in {}.", lang_name));

    let glossary_clause = glossary_instruction(source_text, glossary);

    let mut prompt = String::new();
    prompt.push_str("[INST]\n");
    prompt.push_str(&format!(
        "You are a professional English translator to {} specializing in Software Resource Files (.resx).\n",
        lang_name
    ));
    prompt.push_str("Translate UI strings and labels accurately, maintaining the original meaning and technical style.\n");
    if let Some(clause) = glossary_clause {
        prompt.push('\n');
        prompt.push_str(&clause);
    }
    prompt.push_str("\nRULES:\n");
    prompt.push_str(&rules.join("\n"));
    prompt.push_str("\n[/INST]\n\n\n");
    prompt.push_str(text);
    prompt
}

/// Glossary clause listing only the terms that occur in `text` (case-insensitive)
pub fn glossary_instruction(text: &str, glossary: Option<&BTreeMap<String, String>>) -> Option<String> {
    let glossary = glossary?;
    let haystack = text.to_lowercase();

    let relevant: Vec<String> = glossary
        .iter()
        .filter(|(term, _)| !term.trim().is_empty() && haystack.contains(&term.to_lowercase()))
        .map(|(term, forced)| format!("- {} -> {}", term, forced))
        .collect();

    if relevant.is_empty() {
        return None;
    }

    Some(format!(
        "CRITICAL GLOSSARY (Use these exact terms):\n{}\n",
        relevant.join("\n")
    ))
}

/// Numeric formatting instruction for a rule
pub fn number_instruction(rule: NumberRule, lang_name: &str) -> String {
    match rule {
        NumberRule::KhmerDigits => "Preserve all numeric values exactly. Display digits using Khmer numerals (០-៩), including years in AD format (e.g., '2024' becomes '២០២៤').".to_string(),
        NumberRule::CjkYears => "Use Arabic numerals for years (e.g., '2024年'). For other numbers, use native characters if appropriate for formal context, otherwise maintain Arabic numerals.".to_string(),
        NumberRule::ThaiDigits => "Preserve all numeric values exactly. Do NOT perform arithmetic or convert calendar systems. Display digits using Thai numerals (๐-๙).".to_string(),
        NumberRule::LaoDigits => "Preserve all numeric values exactly. Do NOT perform arithmetic or convert calendar systems. Display digits using Lao numerals (໐-໙).".to_string(),
        NumberRule::European => format!(
            "For {}: Use Arabic numerals. Use a space or dot for thousands and a comma for decimals (European style).",
            lang_name
        ),
        NumberRule::Vietnamese => "Use Arabic numerals: use a dot (.) for thousands and a comma (,) for decimals. For years, always include the word 'năm' (e.g., 'năm 2024').".to_string(),
        NumberRule::ArabicOverNative => "Use standard Arabic numerals (0-9). Devanagari numerals are not required for this modern UI context.".to_string(),
        NumberRule::Standard => "Maintain standard Arabic numerals and original numeric formatting.".to_string(),
    }
}

fn style_instruction(profile: &LanguageProfile, lang_name: &str) -> Option<String> {
    if !profile.avoid_hyphen_compounds {
        return None;
    }

    Some(format!(
        "- CRITICAL: Do NOT use hyphens (-) to join nouns. {} prefers compound words. \
         Examples of WRONG: 'Bus-Station', 'Durian-Frucht'. \
         Examples of CORRECT: 'Bus Station', 'Durianfrucht'. \
         If unsure, use a single space, NEVER a hyphen.",
        lang_name
    ))
}
