/*!
 * Sentence to timestamp alignment.
 *
 * Each sentence is located in the word transcript by a forward-only scan:
 * the search for sentence `i + 1` starts where the match for sentence `i`
 * ended. Exact search works on the space-stripped, punctuation-free text of
 * the transcript; fuzzy search slides a window of words and scores it with
 * the matcher in `text::matcher`.
 */

use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::AlignError;
use crate::file_utils::FileManager;
use crate::subtitle::model::{Cue, Sentence, Word};
use crate::text::{Joiner, normalize, render_diff, similarity, truncate_text};

/// How sentences are located in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlignStrategy {
    /// Substring search on normalized text
    #[default]
    Exact,
    /// Sliding-window similarity search
    Fuzzy,
}

/// Aligner settings
#[derive(Debug, Clone)]
pub struct AlignOptions {
    pub strategy: AlignStrategy,
    /// Retry an exact miss with fuzzy search
    pub fuzzy_fallback: bool,
    /// Fail on the first sentence that cannot be located
    pub strict: bool,
    /// Minimum fuzzy score for a confident match
    pub accept_score: f64,
    /// Number of window positions examined past the cursor
    pub search_span: usize,
    /// Separator used when rebuilding a window of words
    pub joiner: Joiner,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            strategy: AlignStrategy::Exact,
            fuzzy_fallback: true,
            strict: false,
            accept_score: 0.8,
            search_span: 300,
            joiner: Joiner::Space,
        }
    }
}

/// Rules applied between consecutive cues once they are aligned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPolicy {
    /// Space left before the next cue when an overlap is clamped
    #[serde(default = "default_overlap_margin")]
    pub overlap_margin: f64,

    /// Gaps shorter than this are closed by extending the earlier cue
    #[serde(default = "default_bridge_gap_below")]
    pub bridge_gap_below: f64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            overlap_margin: default_overlap_margin(),
            bridge_gap_below: default_bridge_gap_below(),
        }
    }
}

fn default_overlap_margin() -> f64 {
    0.1
}

fn default_bridge_gap_below() -> f64 {
    1.0
}

/// A sentence that could not be located
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedSentence {
    /// Position in the input sentence list
    pub index: usize,
    /// Normalized sentence text
    pub expected: String,
    /// Best window found, normalized
    pub nearest: String,
    pub score: f64,
    /// `[-expected only-]{+nearest only+}` rendering
    pub diff: String,
}

/// Outcome of aligning one sentence
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    Matched { start: f64, end: f64, score: f64 },
    Missed(UnmatchedSentence),
}

/// Timed cues plus the sentences that were skipped
#[derive(Debug, Clone, Default)]
pub struct AlignmentReport {
    pub cues: Vec<Cue>,
    pub unmatched: Vec<UnmatchedSentence>,
}

impl AlignmentReport {
    /// Dump unmatched sentences as a JSON array
    pub fn write_diagnostics<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.unmatched)
            .context("Failed to serialize alignment diagnostics")?;
        FileManager::write_to_file(path, &json)
            .with_context(|| format!("Failed to write diagnostics: {:?}", path))
    }
}

/// Normalized view of the transcript
struct TranscriptIndex {
    /// Normalized text of each word with inner spaces removed
    tokens: Vec<String>,
    /// All tokens concatenated
    concat: String,
    /// Word index owning each byte of `concat`
    owner: Vec<usize>,
    /// Byte offset in `concat` where each word starts
    word_offset: Vec<usize>,
}

impl TranscriptIndex {
    fn build(words: &[Word]) -> Self {
        let mut tokens = Vec::with_capacity(words.len());
        let mut concat = String::new();
        let mut owner = Vec::new();
        let mut word_offset = Vec::with_capacity(words.len() + 1);

        for (i, word) in words.iter().enumerate() {
            let token: String = normalize(&word.text).split_whitespace().collect();
            word_offset.push(concat.len());
            concat.push_str(&token);
            owner.extend(std::iter::repeat_n(i, token.len()));
            tokens.push(token);
        }
        word_offset.push(concat.len());

        Self {
            tokens,
            concat,
            owner,
            word_offset,
        }
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Find `needle` at or after word `cursor`; returns the first and last word covered
    fn find_exact(&self, needle: &str, cursor: usize) -> Option<(usize, usize)> {
        if needle.is_empty() || cursor >= self.len() {
            return None;
        }
        let from = self.word_offset[cursor];
        let pos = self.concat[from..].find(needle)? + from;
        let first = self.owner[pos];
        let last = self.owner[pos + needle.len() - 1];
        Some((first, last))
    }

    fn phrase(&self, start: usize, end: usize, joiner: Joiner) -> String {
        let parts: Vec<&str> = self.tokens[start..end]
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.as_str())
            .collect();
        joiner.join(&parts)
    }
}

/// Best window found by fuzzy search
struct WindowMatch {
    start: usize,
    size: usize,
    score: f64,
    phrase: String,
}

/// Sentence to timestamp aligner
#[derive(Debug, Clone, Default)]
pub struct Aligner {
    options: AlignOptions,
    policy: TimingPolicy,
}

impl Aligner {
    pub fn new(options: AlignOptions, policy: TimingPolicy) -> Self {
        Self { options, policy }
    }

    pub fn options(&self) -> &AlignOptions {
        &self.options
    }

    pub fn policy(&self) -> &TimingPolicy {
        &self.policy
    }

    /// Align every sentence and resolve overlaps between the resulting cues
    pub fn align(&self, words: &[Word], sentences: &[Sentence]) -> Result<AlignmentReport, AlignError> {
        let located = self.locate_all(words, sentences)?;
        let mut report = AlignmentReport::default();

        for (sentence, outcome) in sentences.iter().zip(located) {
            match outcome {
                Located::Matched { start, end, .. } => {
                    let index = report.cues.len() + 1;
                    report.cues.push(Cue::new(index, start, end, &sentence.source, &sentence.translation));
                }
                Located::Missed(unmatched) => report.unmatched.push(unmatched),
            }
        }

        resolve_timing(&mut report.cues, &self.policy);

        info!(
            "Aligned {} of {} sentences ({} skipped)",
            report.cues.len(),
            sentences.len(),
            report.unmatched.len()
        );

        Ok(report)
    }

    /// Locate each sentence in order without building cues.
    ///
    /// In strict mode the first miss is returned as an error.
    pub fn locate_all(&self, words: &[Word], sentences: &[Sentence]) -> Result<Vec<Located>, AlignError> {
        if words.is_empty() {
            if sentences.is_empty() {
                return Ok(Vec::new());
            }
            return Err(AlignError::EmptyTranscript);
        }

        let index = TranscriptIndex::build(words);
        let mut cursor = 0usize;
        let mut results = Vec::with_capacity(sentences.len());

        for (i, sentence) in sentences.iter().enumerate() {
            let expected = normalize(&sentence.source);

            // Single characters cannot be searched for meaningfully
            if expected.chars().count() <= 1 {
                let word = &words[cursor.min(words.len() - 1)];
                results.push(Located::Matched {
                    start: word.start,
                    end: word.end,
                    score: 1.0,
                });
                continue;
            }

            let located = match self.options.strategy {
                AlignStrategy::Exact => {
                    let needle: String = expected.split_whitespace().collect();
                    match index.find_exact(&needle, cursor) {
                        Some((first, last)) => {
                            debug!("Exact match for sentence {}: words {}..={}", i, first, last);
                            cursor = last + 1;
                            Some((words[first].start, words[last].end, 1.0))
                        }
                        None if self.options.fuzzy_fallback => {
                            debug!("No exact match for sentence {}, trying fuzzy search", i);
                            self.fuzzy_step(&index, words, &expected, &mut cursor, i, true)
                        }
                        None => None,
                    }
                }
                AlignStrategy::Fuzzy => self.fuzzy_step(&index, words, &expected, &mut cursor, i, false),
            };

            match located {
                Some((start, end, score)) => results.push(Located::Matched { start, end, score }),
                None => {
                    let unmatched = self.describe_miss(&index, &expected, cursor, i);
                    warn!(
                        "Could not align sentence {}: '{}' (nearest '{}', score {:.2}) diff: {}",
                        i,
                        truncate_text(&unmatched.expected, 60),
                        truncate_text(&unmatched.nearest, 60),
                        unmatched.score,
                        unmatched.diff
                    );
                    if self.options.strict {
                        return Err(AlignError::Unmatched {
                            index: i,
                            sentence: sentence.source.clone(),
                            score: unmatched.score,
                        });
                    }
                    results.push(Located::Missed(unmatched));
                }
            }
        }

        Ok(results)
    }

    /// Fuzzy-locate one sentence and advance the cursor on success.
    ///
    /// As a fallback for an exact miss only confident windows are taken, so a
    /// sentence absent from the transcript leaves the cursor where it was.
    fn fuzzy_step(
        &self,
        index: &TranscriptIndex,
        words: &[Word],
        expected: &str,
        cursor: &mut usize,
        sentence_index: usize,
        fallback: bool,
    ) -> Option<(f64, f64, f64)> {
        let best = self.best_window(index, expected, *cursor)?;
        let rejected = if fallback {
            best.score < self.options.accept_score
        } else {
            best.score <= 0.0
        };
        if rejected {
            debug!(
                "Best window for sentence {} scores {:.2}, not accepted",
                sentence_index, best.score
            );
            return None;
        }

        if best.score >= self.options.accept_score {
            debug!(
                "Fuzzy match for sentence {}: '{}' score {:.2}",
                sentence_index,
                truncate_text(&best.phrase, 60),
                best.score
            );
        } else {
            warn!(
                "Low-confidence match for sentence {}: '{}' vs '{}' score {:.2}",
                sentence_index,
                truncate_text(expected, 60),
                truncate_text(&best.phrase, 60),
                best.score
            );
        }

        let word_count = expected.split_whitespace().count().max(1);
        *cursor = (best.start + word_count).min(words.len());
        Some((words[best.start].start, words[best.start + best.size - 1].end, best.score))
    }

    /// Highest-scoring window of words at or after `cursor`
    fn best_window(&self, index: &TranscriptIndex, expected: &str, cursor: usize) -> Option<WindowMatch> {
        let remaining = index.len().saturating_sub(cursor);
        if remaining == 0 {
            return None;
        }

        let word_count = expected.split_whitespace().count();
        let size = (word_count + 1).max(3).min(remaining);
        let last_start = (index.len() - size).min(cursor + self.options.search_span);
        let expected_len = expected.chars().count() as f64;

        let mut best: Option<WindowMatch> = None;
        for start in cursor..=last_start {
            let phrase = index.phrase(start, start + size, self.options.joiner);
            let phrase_len = phrase.chars().count();
            let score = if phrase_len == 0 {
                0.0
            } else {
                similarity(expected, &phrase) * (expected_len / phrase_len as f64).min(1.0)
            };
            let better = match &best {
                Some(current) => score > current.score,
                None => true,
            };
            if better {
                best = Some(WindowMatch {
                    start,
                    size,
                    score,
                    phrase,
                });
            }
        }

        best
    }

    fn describe_miss(&self, index: &TranscriptIndex, expected: &str, cursor: usize, sentence_index: usize) -> UnmatchedSentence {
        let (nearest, score) = match self.best_window(index, expected, cursor) {
            Some(window) => (window.phrase, window.score),
            None => (String::new(), 0.0),
        };
        UnmatchedSentence {
            index: sentence_index,
            expected: expected.to_string(),
            diff: render_diff(expected, &nearest),
            nearest,
            score,
        }
    }
}

/// Clamp overlaps and bridge short gaps between consecutive cues
pub fn resolve_timing(cues: &mut [Cue], policy: &TimingPolicy) {
    for i in 0..cues.len().saturating_sub(1) {
        let next_start = cues[i + 1].start;
        let cue = &mut cues[i];

        if cue.end > next_start {
            let margin = policy.overlap_margin;
            let mut end = next_start - margin;
            if end <= cue.start {
                end = if margin > 0.0 { cue.start + margin } else { next_start };
            }
            debug!("Cue {} overlaps the next one, end {:.3} -> {:.3}", cue.index, cue.end, end);
            cue.end = end;
        } else {
            let gap = next_start - cue.end;
            if gap > 0.0 && gap < policy.bridge_gap_below {
                cue.end = next_start;
            }
        }
    }
}
