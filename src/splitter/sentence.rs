/*!
 * Meaning-preserving sentence splitting.
 *
 * The model marks break points with `[br]` in its own copy of the sentence.
 * That copy may differ slightly from the input (spacing, punctuation), so the
 * breaks are mapped back onto the untouched input by similarity search and
 * the returned text is always the input with newlines inserted.
 */

use log::{debug, info, warn};

use crate::app_config::SplitConfig;
use crate::concurrency::WorkerPool;
use crate::errors::SplitError;
use crate::language_utils;
use crate::llm::LlmClient;
use crate::llm::prompts::split_prompt;
use crate::llm::schema::{ResponseSchema, best_choice};
use crate::text::{Joiner, Tokenizer, TokenizerBackend, similarity, truncate_text};

/// Break marker used in split prompts
pub const BREAK_MARKER: &str = "[br]";

/// Request log title for split requests
const LOG_TITLE: &str = "sentence_splitbymeaning";

/// Similarity below which a recovered split point is reported
const LOW_SIMILARITY: f64 = 0.9;

/// Byte offsets in `original` where the `[br]` breaks of `modified` belong.
///
/// Each boundary is searched forward from the previous one; boundaries with
/// no similar prefix at all are skipped.
pub fn find_split_positions(original: &str, modified: &str, joiner: Joiner) -> Vec<usize> {
    let parts: Vec<&str> = modified.split(BREAK_MARKER).collect();
    let char_starts: Vec<usize> = original.char_indices().map(|(i, _)| i).collect();
    let mut positions = Vec::with_capacity(parts.len().saturating_sub(1));
    let mut start = 0usize;

    for (i, part) in parts.iter().take(parts.len().saturating_sub(1)).enumerate() {
        let words: Vec<&str> = part.split_whitespace().collect();
        let target = joiner.join(&words);

        let mut best: Option<(usize, f64)> = None;
        for &j in char_starts.iter().filter(|&&j| j >= start) {
            let score = similarity(&original[start..j], &target);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((j, score));
            }
        }

        match best {
            Some((j, score)) => {
                if score < LOW_SIMILARITY {
                    warn!("Low similarity {:.2} at the best split point for part {}", score, i + 1);
                }
                positions.push(j);
                start = j;
            }
            None => warn!("Unable to find a split point for part {}", i + 1),
        }
    }

    positions
}

/// Insert a newline at each offset; offsets must be non-decreasing char boundaries
pub fn insert_breaks(original: &str, positions: &[usize]) -> String {
    let mut result = String::with_capacity(original.len() + positions.len());
    let mut last = 0usize;
    for &pos in positions {
        result.push_str(&original[last..pos]);
        result.push('\n');
        last = pos;
    }
    result.push_str(&original[last..]);
    result
}

/// Non-empty trimmed lines of a split result
pub fn split_lines(split: &str) -> Vec<String> {
    split
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result of splitting a sentence list by meaning
#[derive(Debug, Clone, Default)]
pub struct MeaningSplitOutcome {
    pub sentences: Vec<String>,
    /// Over-long sentences that were kept whole after the last pass
    pub unsplit: Vec<String>,
}

/// Splits sentences into meaningful parts with the completion service
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    client: LlmClient,
    pool: WorkerPool,
    settings: SplitConfig,
    tokenizer: TokenizerBackend,
    joiner: Joiner,
    /// Language name used in prompts
    language: String,
}

impl SentenceSplitter {
    pub fn new(client: LlmClient, pool: WorkerPool, settings: SplitConfig, language: &str, tokenizer: TokenizerBackend) -> Self {
        Self {
            client,
            pool,
            settings,
            tokenizer: tokenizer.resolve(language),
            joiner: Joiner::for_language(language),
            language: language_utils::display_name(language),
        }
    }

    pub fn settings(&self) -> &SplitConfig {
        &self.settings
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    pub fn joiner(&self) -> Joiner {
        self.joiner
    }

    /// Split `sentence` into `parts` parts; returns the sentence with newlines at the breaks.
    ///
    /// `attempt` pads the prompt so repeated calls are not served from the request log.
    pub async fn split_sentence(&self, sentence: &str, parts: usize, word_limit: usize, attempt: usize) -> Result<String, SplitError> {
        let prompt = format!(
            "{}{}",
            split_prompt(sentence, parts, word_limit, &self.language),
            " ".repeat(attempt)
        );
        let response = self
            .client
            .ask_with_attempts(&prompt, ResponseSchema::Split, LOG_TITLE, self.settings.max_attempts)
            .await?;

        let best = match best_choice(&response["best"]) {
            Some(best @ (1 | 2)) => best,
            _ => {
                warn!("Could not determine the best split, defaulting to 1");
                1
            }
        };
        let candidate = response[format!("split_{}", best)].as_str().unwrap_or_default();

        let positions = find_split_positions(sentence, candidate, self.joiner);
        if positions.is_empty() {
            return Err(SplitError::NoSplitPoint(sentence.to_string()));
        }

        let split = insert_breaks(sentence, &positions);
        debug!("Split '{}' into: {}", truncate_text(sentence, 40), split.replace('\n', " || "));
        Ok(split)
    }

    /// [`split_sentence`](Self::split_sentence) returned as trimmed lines
    pub async fn split_into_parts(&self, sentence: &str, parts: usize, attempt: usize) -> Result<Vec<String>, SplitError> {
        let split = self.split_sentence(sentence, parts, self.settings.word_limit, attempt).await?;
        Ok(split_lines(&split))
    }

    /// Parts needed for a sentence, or `None` when it is short enough
    fn parts_needed(&self, sentence: &str) -> Option<usize> {
        let max = self.settings.max_split_length.max(1);
        let tokens = self.tokenizer.count(sentence);
        (tokens > max).then(|| tokens.div_ceil(max))
    }

    /// Split every over-long sentence, in several passes.
    ///
    /// Sentences that cannot be split are kept as they are.
    pub async fn split_sentences_by_meaning(&self, sentences: Vec<String>) -> MeaningSplitOutcome {
        let passes = self.settings.passes.max(1);
        let mut sentences = sentences;
        let mut unsplit = Vec::new();

        for pass in 0..passes {
            let pending = sentences.iter().filter(|s| self.parts_needed(s).is_some()).count();
            if pending == 0 {
                break;
            }
            info!("Splitting {} long sentences by meaning (pass {}/{})", pending, pass + 1, passes);

            let results = self
                .pool
                .map_ordered(sentences, |index, sentence| async move {
                    let Some(parts) = self.parts_needed(&sentence) else {
                        return (vec![sentence], None);
                    };
                    match self.split_sentence(&sentence, parts, self.settings.word_limit, pass).await {
                        Ok(split) => (split_lines(&split), None),
                        Err(e) => {
                            warn!("Keeping sentence {} unsplit: {}", index, e);
                            (vec![sentence.clone()], Some(sentence))
                        }
                    }
                })
                .await;

            unsplit.clear();
            sentences = Vec::with_capacity(results.len());
            for (lines, failed) in results {
                sentences.extend(lines);
                unsplit.extend(failed);
            }
        }

        info!("Sentence splitting finished: {} sentences, {} kept unsplit", sentences.len(), unsplit.len());
        MeaningSplitOutcome { sentences, unsplit }
    }
}
