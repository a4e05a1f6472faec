/*!
 * Text utilities shared by the aligner, splitter and trimmer.
 *
 * - `metrics`: visual width and spoken duration estimates
 * - `normalize`: punctuation stripping and joiner selection
 * - `tokenizer`: pluggable token counting
 * - `matcher`: matching-block similarity and diff rendering
 */

pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod tokenizer;

pub use matcher::{Opcode, OpcodeTag, SequenceMatcher, render_diff, similarity};
pub use metrics::{SpeechEstimate, SpeechRates, SpeedFactor, estimate_speech, estimate_speech_seconds, visual_width};
pub use normalize::{Joiner, normalize, remove_punctuation};
pub use tokenizer::{Tokenizer, TokenizerBackend};

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
