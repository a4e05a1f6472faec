/*!
 * Token counting.
 *
 * Sentence splitting decides how many parts a sentence needs by counting
 * tokens. What counts as a token depends on the script: words for
 * space-delimited languages, characters for Chinese and Japanese.
 */

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Splits text into countable tokens
pub trait Tokenizer: Send + Sync {
    /// Tokens of `text`, in order
    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str>;

    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize {
        self.tokens(text).len()
    }
}

/// Unicode word boundaries (UAX #29), punctuation excluded
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWords;

impl Tokenizer for UnicodeWords {
    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.unicode_words().collect()
    }
}

/// Plain whitespace splitting
#[derive(Debug, Clone, Copy, Default)]
pub struct Whitespace;

impl Tokenizer for Whitespace {
    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_whitespace().collect()
    }
}

/// One token per grapheme, skipping whitespace and punctuation
#[derive(Debug, Clone, Copy, Default)]
pub struct Characters;

impl Tokenizer for Characters {
    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.graphemes(true)
            .filter(|g| g.chars().any(|c| c.is_alphanumeric()))
            .collect()
    }
}

/// Configured tokenizer choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerBackend {
    /// Decide from the transcript language
    #[default]
    Auto,
    Unicode,
    Whitespace,
    Characters,
}

impl TokenizerBackend {
    /// Backend suited to a language code
    pub fn for_language(code: &str) -> Self {
        let primary = code.trim().to_lowercase();
        let primary = primary.split(['-', '_']).next().unwrap_or("").to_string();
        match primary.as_str() {
            "zh" | "ja" => TokenizerBackend::Characters,
            _ => TokenizerBackend::Unicode,
        }
    }

    /// Replace `Auto` with the backend for `language`
    pub fn resolve(self, language: &str) -> Self {
        match self {
            TokenizerBackend::Auto => Self::for_language(language),
            other => other,
        }
    }
}

impl Tokenizer for TokenizerBackend {
    fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            TokenizerBackend::Auto | TokenizerBackend::Unicode => UnicodeWords.tokens(text),
            TokenizerBackend::Whitespace => Whitespace.tokens(text),
            TokenizerBackend::Characters => Characters.tokens(text),
        }
    }
}
