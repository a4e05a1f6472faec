use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Transcripts report their language as ISO 639-1 or ISO 639-2 codes, or as
/// `auto` when detection is left to the recognizer. Everything downstream
/// (joiner, tokenizer, prompt wording) keys off the normalized 2-letter code.

/// Value meaning "use the detected language"
pub const AUTO: &str = "auto";

/// ISO 639-2/B codes that differ from their ISO 639-2/T form
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    let mapped = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(mapped)
}

fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    // Region subtags such as `pt-BR` or `zh_CN` do not change the language
    let primary = normalized.split(['-', '_']).next().unwrap_or("");

    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => Language::from_639_3(part2b_to_part2t(primary).unwrap_or(primary)),
        _ => None,
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-3 if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(match lang.to_639_1() {
        Some(part1) => part1.to_string(),
        None => lang.to_639_3().to_string(),
    })
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Language name for prompts, falling back to the raw code
pub fn display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// Pick the effective transcript language from the configured value and the detected one
pub fn resolve_language(configured: &str, detected: Option<&str>) -> Result<String> {
    let code = if configured.trim().eq_ignore_ascii_case(AUTO) {
        detected
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| anyhow!("Language is set to '{}' but no detected language is available", AUTO))?
    } else {
        configured
    };
    normalize_to_part1_or_part2t(code)
}
