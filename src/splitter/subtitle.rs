/*!
 * Subtitle-line splitting.
 *
 * Cues whose source or translation is too wide for the screen are split in
 * two. The source is split by meaning, the translation is split along the
 * source parts by the completion service, and the children are timed by
 * aligning their source text against the words of the parent cue.
 */

use log::{debug, info, warn};

use crate::app_config::SubtitleConfig;
use crate::concurrency::WorkerPool;
use crate::errors::SplitError;
use crate::language_utils;
use crate::llm::prompts::align_prompt;
use crate::llm::schema::{ResponseSchema, best_choice};
use crate::splitter::sentence::SentenceSplitter;
use crate::subtitle::aligner::{Aligner, Located};
use crate::subtitle::model::{Cue, Sentence, Word, renumber};
use crate::text::{truncate_text, visual_width};

/// Request log title for translation alignment
const LOG_TITLE: &str = "align_subs";

/// Tolerance used when selecting the words of a cue
const WORD_EPSILON: f64 = 0.001;

/// Result of splitting over-long cues
#[derive(Debug, Clone, Default)]
pub struct SubtitleSplitOutcome {
    pub cues: Vec<Cue>,
    /// Cues still too long after the last round
    pub too_long: usize,
}

/// Splits cues that do not fit on screen
#[derive(Debug, Clone)]
pub struct SubtitleSplitter {
    sentences: SentenceSplitter,
    aligner: Aligner,
    pool: WorkerPool,
    limits: SubtitleConfig,
    max_rounds: usize,
    source_language: String,
    target_language: String,
}

impl SubtitleSplitter {
    pub fn new(
        sentences: SentenceSplitter,
        aligner: Aligner,
        pool: WorkerPool,
        limits: SubtitleConfig,
        source_language: &str,
        target_language: &str,
    ) -> Self {
        let max_rounds = sentences.settings().max_split_rounds.max(1);
        Self {
            sentences,
            aligner,
            pool,
            limits,
            max_rounds,
            source_language: language_utils::display_name(source_language),
            target_language: language_utils::display_name(target_language),
        }
    }

    /// Whether a cue is too wide to display
    pub fn needs_split(&self, cue: &Cue) -> bool {
        let max = self.limits.max_length as f64;
        cue.source.chars().count() as f64 > max || visual_width(&cue.translation) * self.limits.target_multiplier > max
    }

    /// Split over-long cues until every cue fits or the rounds run out
    pub async fn split_long_cues(&self, cues: Vec<Cue>, words: &[Word]) -> SubtitleSplitOutcome {
        let mut cues = cues;

        for round in 0..self.max_rounds {
            let pending = cues.iter().filter(|c| self.needs_split(c)).count();
            if pending == 0 {
                break;
            }
            info!("Split round {}/{}: {} cues are too long", round + 1, self.max_rounds, pending);

            let results = self
                .pool
                .map_ordered(cues, |_, cue| async move {
                    if !self.needs_split(&cue) {
                        return vec![cue];
                    }
                    debug!("Cue {} needs splitting: '{}'", cue.index, truncate_text(&cue.source, 60));
                    match self.split_cue(&cue, words, round).await {
                        Ok(children) => children,
                        Err(e) => {
                            warn!("Keeping cue {} whole: {}", cue.index, e);
                            vec![cue]
                        }
                    }
                })
                .await;

            cues = results.into_iter().flatten().collect();
            renumber(&mut cues);
        }

        let too_long = cues.iter().filter(|c| self.needs_split(c)).count();
        if too_long > 0 {
            warn!("{} cues are still too long after {} rounds", too_long, self.max_rounds);
        }
        SubtitleSplitOutcome { cues, too_long }
    }

    /// Split one cue into timed children
    async fn split_cue(&self, cue: &Cue, words: &[Word], attempt: usize) -> Result<Vec<Cue>, SplitError> {
        let source_parts = self.sentences.split_into_parts(&cue.source, 2, attempt).await?;
        if source_parts.len() < 2 {
            return Err(SplitError::NoSplitPoint(cue.source.clone()));
        }
        let translation_parts = self.align_translation(&cue.source, &cue.translation, &source_parts).await?;

        let parts: Vec<Sentence> = source_parts
            .into_iter()
            .zip(translation_parts)
            .map(|(source, translation)| Sentence::new(source, translation))
            .collect();
        Ok(self.time_children(cue, words, &parts))
    }

    /// Split `translation` along `source_parts`; missing parts get the full translation
    async fn align_translation(&self, source: &str, translation: &str, source_parts: &[String]) -> Result<Vec<String>, SplitError> {
        if translation.trim().is_empty() {
            return Ok(vec![String::new(); source_parts.len()]);
        }

        let prompt = align_prompt(source, translation, source_parts, &self.source_language, &self.target_language);
        let response = self
            .sentences
            .client()
            .ask_with_retry(&prompt, ResponseSchema::Align { parts: source_parts.len() }, LOG_TITLE)
            .await?;

        let best = best_choice(&response["best"]).unwrap_or(1);
        let alignment = &response[format!("align_{}", best)];
        let parts = (1..=source_parts.len())
            .map(|k| match alignment[format!("target_part_{}", k)].as_str() {
                Some(part) => part.trim().to_string(),
                None => {
                    warn!("Missing target_part_{}, using the full translation", k);
                    translation.to_string()
                }
            })
            .collect();
        Ok(parts)
    }

    /// Time children by aligning them against the parent's words, or proportionally
    fn time_children(&self, parent: &Cue, words: &[Word], parts: &[Sentence]) -> Vec<Cue> {
        let parent_words: Vec<Word> = words
            .iter()
            .filter(|w| w.start >= parent.start - WORD_EPSILON && w.end <= parent.end + WORD_EPSILON)
            .cloned()
            .collect();

        let aligned = match self.aligner.locate_all(&parent_words, parts) {
            Ok(located) => aligned_bounds(parent, &located),
            Err(e) => {
                debug!("Cannot align children of cue {}: {}", parent.index, e);
                None
            }
        };
        let bounds = aligned.unwrap_or_else(|| {
            debug!("Timing children of cue {} proportionally", parent.index);
            proportional_bounds(parent, parts)
        });

        parts
            .iter()
            .zip(bounds)
            .map(|(part, (start, end))| Cue::new(parent.index, start, end, &part.source, &part.translation))
            .collect()
    }
}

/// Child intervals from alignment, covering the parent from start to end.
///
/// `None` when a child was not found or the intervals are not increasing.
fn aligned_bounds(parent: &Cue, located: &[Located]) -> Option<Vec<(f64, f64)>> {
    let mut bounds = Vec::with_capacity(located.len());
    for outcome in located {
        match outcome {
            Located::Matched { start, end, .. } => bounds.push((start.max(parent.start), end.min(parent.end))),
            Located::Missed(_) => return None,
        }
    }

    if bounds.is_empty() {
        return None;
    }
    let last = bounds.len() - 1;
    bounds[0].0 = parent.start;
    bounds[last].1 = parent.end;

    let increasing = bounds.iter().all(|(s, e)| s < e) && bounds.windows(2).all(|pair| pair[0].1 <= pair[1].0);
    increasing.then_some(bounds)
}

/// Child intervals proportional to the visual width of each source part
fn proportional_bounds(parent: &Cue, parts: &[Sentence]) -> Vec<(f64, f64)> {
    let widths: Vec<f64> = parts.iter().map(|p| visual_width(&p.source).max(1.0)).collect();
    let total: f64 = widths.iter().sum();
    let duration = parent.duration().max(0.0);

    let mut bounds = Vec::with_capacity(parts.len());
    let mut start = parent.start;
    let mut consumed = 0.0;
    for (i, width) in widths.iter().enumerate() {
        consumed += width;
        let end = if i + 1 == widths.len() {
            parent.end
        } else {
            parent.start + duration * consumed / total
        };
        bounds.push((start, end));
        start = end;
    }
    bounds
}
