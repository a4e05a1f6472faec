/*!
 * Text normalization used before any comparison.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static PUNCTUATION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Languages written without spaces between words
const UNSPACED_LANGUAGES: &[&str] = &["zh", "ja"];

/// Collapse whitespace, drop every non-word non-space character, trim
pub fn remove_punctuation(text: &str) -> String {
    let collapsed = WHITESPACE_REGEX.replace_all(text, " ");
    PUNCTUATION_REGEX.replace_all(&collapsed, "").trim().to_string()
}

/// Lowercase and strip punctuation
pub fn normalize(text: &str) -> String {
    remove_punctuation(&text.to_lowercase())
}

/// Separator placed between words when rebuilding text in a given language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joiner {
    Space,
    Empty,
}

impl Joiner {
    /// Pick the joiner for an ISO 639-1 language code
    pub fn for_language(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        let primary = code.split(['-', '_']).next().unwrap_or("");
        if UNSPACED_LANGUAGES.contains(&primary) {
            Joiner::Empty
        } else {
            Joiner::Space
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Joiner::Space => " ",
            Joiner::Empty => "",
        }
    }

    /// Join parts with this joiner
    pub fn join<S: AsRef<str>>(&self, parts: &[S]) -> String {
        parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(self.as_str())
    }
}
