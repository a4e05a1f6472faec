/*!
 * Cue post-processing.
 *
 * Pure steps (anomaly removal, short-cue merging, overlap removal) plus the
 * asynchronous full pass used for speech synthesis, which also trims each
 * translation so it can be spoken within its cue.
 */

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::splitter::trim::Trimmer;
use crate::subtitle::model::{Cue, renumber};

/// Cues longer than this are considered broken
const MAX_CUE_SECONDS: f64 = 20.0;

/// A start this much later than both neighbours marks a misplaced cue
const OUTLIER_START_GAP: f64 = 10.0;

static PAREN_ASIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static FULLWIDTH_PAREN_ASIDE: Lazy<Regex> = Lazy::new(|| Regex::new(r"（[^）]*）").unwrap());

/// Which cues survive anomaly removal; neighbours are always the original ones
pub fn anomaly_mask(cues: &[Cue]) -> Vec<bool> {
    let n = cues.len();
    let mut keep = vec![true; n];
    if n < 3 {
        return keep;
    }

    for i in 0..n {
        let cue = &cues[i];
        let duration = cue.duration();
        if duration < 0.0 {
            warn!("Dropping cue {}: ends before it starts", cue.index);
            keep[i] = false;
            continue;
        }
        if duration > MAX_CUE_SECONDS {
            warn!("Dropping cue {}: lasts {:.1}s", cue.index, duration);
            keep[i] = false;
            continue;
        }

        let later_than = |other: &Cue| cue.start - other.start > OUTLIER_START_GAP;
        let misplaced = if i == 0 {
            later_than(&cues[1])
        } else if i == n - 1 {
            later_than(&cues[n - 2])
        } else {
            later_than(&cues[i - 1]) && later_than(&cues[i + 1])
        };
        if misplaced {
            warn!("Dropping cue {}: start {:.2}s is out of sequence", cue.index, cue.start);
            keep[i] = false;
        }
    }

    keep
}

/// Remove cues with impossible or out-of-sequence timing
pub fn drop_anomalies(cues: Vec<Cue>) -> Vec<Cue> {
    let keep = anomaly_mask(&cues);
    cues.into_iter()
        .zip(keep)
        .filter_map(|(cue, keep)| keep.then_some(cue))
        .collect()
}

/// Remove cues starting before the cue kept ahead of them
pub fn drop_out_of_order(cues: Vec<Cue>) -> Vec<Cue> {
    let mut kept: Vec<Cue> = Vec::with_capacity(cues.len());
    for cue in cues {
        if let Some(previous) = kept.last() {
            if cue.start < previous.start {
                warn!(
                    "Dropping cue {}: starts at {:.2}s, before cue {} at {:.2}s",
                    cue.index, cue.start, previous.index, previous.start
                );
                continue;
            }
        }
        kept.push(cue);
    }
    kept
}

/// Merge or extend cues shorter than `min_duration`.
///
/// A short cue absorbs its successor when the successor starts less than
/// `min_duration` after it, and is examined again. Otherwise it is extended to
/// `min_duration`. The last cue is only extended up to `media_end`.
pub fn merge_short_cues(mut cues: Vec<Cue>, min_duration: f64, media_end: Option<f64>) -> Vec<Cue> {
    let mut i = 0;
    while i < cues.len() {
        if cues[i].duration() >= min_duration {
            i += 1;
            continue;
        }

        if i + 1 < cues.len() {
            if cues[i + 1].start - cues[i].start < min_duration {
                debug!(
                    "Merging cue {} into cue {} ({:.2}s)",
                    cues[i + 1].index,
                    cues[i].index,
                    cues[i].duration()
                );
                let next = cues.remove(i + 1);
                cues[i].absorb(&next);
                continue;
            }
            cues[i].end = cues[i].start + min_duration;
        } else if let Some(limit) = media_end {
            let extended = (cues[i].start + min_duration).min(limit);
            if extended > cues[i].end {
                cues[i].end = extended;
            }
        } else {
            debug!("Last cue {} is shorter than {:.2}s, left as is", cues[i].index, min_duration);
        }
        i += 1;
    }
    cues
}

/// Clamp each end to the next start; cues left without duration merge forward.
///
/// Out-of-order cues are dropped first, so a merge never reaches past them.
pub fn enforce_no_overlap(cues: Vec<Cue>) -> Vec<Cue> {
    let mut cues = drop_out_of_order(cues);
    let mut i = 0;
    while i < cues.len() {
        if i + 1 < cues.len() && cues[i].end > cues[i + 1].start {
            cues[i].end = cues[i + 1].start;
        }

        if cues[i].end <= cues[i].start {
            if i + 1 < cues.len() {
                let mut merged = cues.remove(i);
                merged.absorb(&cues[i]);
                merged.index = cues[i].index;
                cues[i] = merged;
                continue;
            } else if i > 0 {
                let last = cues.remove(i);
                cues[i - 1].absorb(&last);
                cues[i - 1].end = cues[i - 1].end.max(last.start);
                break;
            }
        }
        i += 1;
    }
    cues
}

/// Drop parenthesised asides and dashes that should not be spoken
pub fn strip_asides(text: &str) -> String {
    let text = PAREN_ASIDE.replace_all(text, "");
    let text = FULLWIDTH_PAREN_ASIDE.replace_all(&text, "");
    text.replace('-', "").trim().to_string()
}

/// Result of the full post-processing pass
#[derive(Debug, Clone, Default)]
pub struct PostProcessOutcome {
    pub cues: Vec<Cue>,
    /// Cues removed for anomalous timing
    pub dropped: usize,
    /// Trims that fell back to punctuation stripping
    pub trim_fallbacks: usize,
}

/// Cue post-processor
#[derive(Debug, Clone)]
pub struct PostProcessor {
    min_duration: f64,
    media_end: Option<f64>,
    trim_passes: usize,
}

impl PostProcessor {
    pub fn new(min_duration: f64, trim_passes: usize) -> Self {
        Self {
            min_duration,
            media_end: None,
            trim_passes: trim_passes.max(1),
        }
    }

    /// Allow the last cue to be extended up to `media_end`
    pub fn with_media_end(mut self, media_end: Option<f64>) -> Self {
        self.media_end = media_end;
        self
    }

    /// Anomaly removal and short-cue merging, without trimming
    pub fn tidy(&self, cues: Vec<Cue>) -> Vec<Cue> {
        let cues = drop_out_of_order(drop_anomalies(cues));
        let mut cues = merge_short_cues(cues, self.min_duration, self.media_end);
        renumber(&mut cues);
        cues
    }

    /// Full pass: tidy, trim every translation to its duration, drop anomalies
    /// again and remove overlaps
    pub async fn run(&self, cues: Vec<Cue>, trimmer: &Trimmer) -> PostProcessOutcome {
        let before = cues.len();
        let mut cues = self.tidy(cues);
        let mut trim_fallbacks = 0;

        for pass in 0..self.trim_passes {
            debug!("Trim pass {}/{}", pass + 1, self.trim_passes);
            let outcome = trimmer.trim_cues(cues).await;
            cues = outcome.cues;
            trim_fallbacks += outcome.fallbacks;
        }

        let cues = drop_anomalies(cues);
        let mut cues = enforce_no_overlap(cues);
        renumber(&mut cues);

        let merged_or_dropped = before.saturating_sub(cues.len());
        info!(
            "Post-processing finished: {} cues ({} merged or dropped, {} trim fallbacks)",
            cues.len(),
            merged_or_dropped,
            trim_fallbacks
        );

        PostProcessOutcome {
            cues,
            dropped: merged_or_dropped,
            trim_fallbacks,
        }
    }
}
