/*!
 * Length metrics for subtitle text.
 *
 * Two measures are used throughout the engine: the visual width of a line
 * (how much horizontal space it takes on screen, with wide scripts weighted
 * heavier) and the estimated time it takes to speak a line aloud.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Latin (including common accented letters) and Cyrillic words
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[a-zA-ZàâçéèêëîïôûùüÿñæœáíóúÁÉÍÓÚÜÑÀÈÌÎÒÙäößÄÖа-яА-Я]+\b").unwrap()
});

/// Punctuation marks that cost speaking time when something follows them
const PAUSE_MARKS: &[char] = &[',', '.', '!', '?', ';', ':', '，', '。', '！', '？', '；', '：'];

/// Speaking speed multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedFactor {
    /// Base speaking speed
    #[serde(default = "default_speed")]
    pub normal: f64,

    /// Upper speed-up allowed on top of `normal`
    #[serde(default = "default_speed")]
    pub max: f64,
}

impl SpeedFactor {
    pub fn multiplier(&self) -> f64 {
        self.normal * self.max
    }
}

impl Default for SpeedFactor {
    fn default() -> Self {
        Self {
            normal: default_speed(),
            max: default_speed(),
        }
    }
}

fn default_speed() -> f64 {
    1.0
}

/// Base speaking rates before the speed multiplier is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechRates {
    /// CJK characters per second
    #[serde(default = "default_cjk_rate")]
    pub cjk_chars_per_sec: f64,

    /// Words per second for space-delimited scripts
    #[serde(default = "default_word_rate")]
    pub words_per_sec: f64,

    /// Pause marks per second
    #[serde(default = "default_punctuation_rate")]
    pub punctuation_per_sec: f64,
}

impl Default for SpeechRates {
    fn default() -> Self {
        Self {
            cjk_chars_per_sec: default_cjk_rate(),
            words_per_sec: default_word_rate(),
            punctuation_per_sec: default_punctuation_rate(),
        }
    }
}

fn default_cjk_rate() -> f64 {
    4.0
}

fn default_word_rate() -> f64 {
    5.0
}

fn default_punctuation_rate() -> f64 {
    4.0
}

/// Breakdown of a spoken-duration estimate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeechEstimate {
    pub cjk_chars: usize,
    pub words: usize,
    pub punctuation: usize,
    /// Estimated seconds
    pub seconds: f64,
}

/// Visual width of one character
fn char_width(c: char) -> f64 {
    match c as u32 {
        0x4E00..=0x9FFF | 0x3040..=0x30FF => 1.75,
        0xAC00..=0xD7A3 | 0x1100..=0x11FF => 1.5,
        0x0E00..=0x0E7F => 1.0,
        0xFF01..=0xFF5E => 1.75,
        _ => 1.0,
    }
}

/// Weighted on-screen width of a line
pub fn visual_width(text: &str) -> f64 {
    text.chars().map(char_width).sum()
}

fn is_cjk_speech_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x3400..=0x4DBF | 0xF900..=0xFAFF | 0xFF66..=0xFF9F)
}

/// Count pause marks that are followed by at least one more character on the same line
fn count_pause_marks(text: &str) -> usize {
    let mut count = 0;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if PAUSE_MARKS.contains(&c) {
            if let Some(&next) = chars.peek() {
                if next != '\n' {
                    count += 1;
                }
            }
        }
    }
    count
}

/// Estimate how long `text` takes to speak
pub fn estimate_speech(text: &str, rates: &SpeechRates, speed: &SpeedFactor) -> SpeechEstimate {
    let multiplier = speed.multiplier();
    let cjk_chars = text.chars().filter(|c| is_cjk_speech_char(*c)).count();
    let words = WORD_REGEX.find_iter(text).count();
    let punctuation = count_pause_marks(text);

    let seconds = cjk_chars as f64 / (rates.cjk_chars_per_sec * multiplier)
        + words as f64 / (rates.words_per_sec * multiplier)
        + punctuation as f64 / (rates.punctuation_per_sec * multiplier);

    debug!(
        "Speech estimate: {} CJK chars, {} words, {} marks -> {:.2}s",
        cjk_chars, words, punctuation, seconds
    );

    SpeechEstimate {
        cjk_chars,
        words,
        punctuation,
        seconds,
    }
}

/// Shorthand for the total of [`estimate_speech`]
pub fn estimate_speech_seconds(text: &str, rates: &SpeechRates, speed: &SpeedFactor) -> f64 {
    estimate_speech(text, rates, speed).seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visualWidth_wideScript_shouldExceedLatin() {
        assert!(visual_width("日本語") > visual_width("abc"));
        assert_eq!(visual_width(""), 0.0);
        assert_eq!(visual_width("日本語"), 5.25);
        assert_eq!(visual_width("한국"), 3.0);
    }

    #[test]
    fn test_estimateSpeech_mixedText_shouldCountEachClass() {
        let estimate = estimate_speech("Hello, world. 你好", &SpeechRates::default(), &SpeedFactor::default());
        assert_eq!(estimate.words, 2);
        assert_eq!(estimate.cjk_chars, 2);
        assert_eq!(estimate.punctuation, 2);
        assert!((estimate.seconds - (2.0 / 4.0 + 2.0 / 5.0 + 2.0 / 4.0)).abs() < 1e-9);
    }

    #[test]
    fn test_estimateSpeech_trailingMark_shouldNotCount() {
        let estimate = estimate_speech("Done.", &SpeechRates::default(), &SpeedFactor::default());
        assert_eq!(estimate.punctuation, 0);
        assert_eq!(estimate.words, 1);
    }

    #[test]
    fn test_estimateSpeech_fasterSpeed_shouldShorten() {
        let text = "one two three four five";
        let slow = estimate_speech_seconds(text, &SpeechRates::default(), &SpeedFactor::default());
        let fast = estimate_speech_seconds(text, &SpeechRates::default(), &SpeedFactor { normal: 1.0, max: 2.0 });
        assert!((slow - 1.0).abs() < 1e-9);
        assert!((fast - 0.5).abs() < 1e-9);
    }
}
