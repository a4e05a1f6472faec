/*!
 * Duration trimming.
 *
 * A translation that takes longer to speak than its cue lasts is rewritten
 * shorter by the completion service. When that fails, pause marks are
 * replaced by spaces, which is the only shortening that needs no model.
 */

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::concurrency::WorkerPool;
use crate::llm::LlmClient;
use crate::llm::prompts::trim_prompt;
use crate::llm::schema::ResponseSchema;
use crate::subtitle::model::Cue;
use crate::text::{SpeechRates, SpeedFactor, estimate_speech, truncate_text};

static PAUSE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,.!?;:，。！？；：]").unwrap());

/// Request log title for trim requests
const LOG_TITLE: &str = "subtitle_trim";

/// Replace pause punctuation by spaces and trim
pub fn strip_pause_punctuation(text: &str) -> String {
    PAUSE_PUNCTUATION.replace_all(text, " ").trim().to_string()
}

/// Text after a trim check
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedText {
    pub text: String,
    /// The completion service failed and punctuation stripping was used
    pub fell_back: bool,
}

/// Result of trimming a cue list
#[derive(Debug, Clone, Default)]
pub struct TrimOutcome {
    pub cues: Vec<Cue>,
    pub fallbacks: usize,
}

/// Shortens translations that cannot be spoken within their cue
#[derive(Debug, Clone)]
pub struct Trimmer {
    client: LlmClient,
    pool: WorkerPool,
    rates: SpeechRates,
    speed: SpeedFactor,
}

impl Trimmer {
    pub fn new(client: LlmClient, pool: WorkerPool, rates: SpeechRates, speed: SpeedFactor) -> Self {
        Self {
            client,
            pool,
            rates,
            speed,
        }
    }

    /// Shorten `text` if it takes longer than `duration` seconds to speak
    pub async fn check_len_then_trim(&self, text: &str, duration: f64) -> String {
        self.trim_text(text, duration).await.text
    }

    /// [`check_len_then_trim`](Self::check_len_then_trim) reporting whether the fallback was used
    pub async fn trim_text(&self, text: &str, duration: f64) -> TrimmedText {
        let estimate = estimate_speech(text, &self.rates, &self.speed);
        if estimate.seconds <= duration {
            return TrimmedText {
                text: text.to_string(),
                fell_back: false,
            };
        }

        debug!(
            "'{}' needs {:.2}s but the cue lasts {:.2}s ({} CJK chars, {} words, {} marks), shortening",
            truncate_text(text, 40),
            estimate.seconds,
            duration,
            estimate.cjk_chars,
            estimate.words,
            estimate.punctuation
        );

        let prompt = trim_prompt(text, duration);
        let (shortened, fell_back) = match self.client.ask_with_retry(&prompt, ResponseSchema::Trim, LOG_TITLE).await {
            Ok(response) => match response["trans_text_processed"].as_str() {
                Some(shortened) => (shortened.trim().to_string(), false),
                None => (strip_pause_punctuation(text), true),
            },
            Err(e) => {
                warn!("Trim request failed, removing punctuation instead: {}", e);
                (strip_pause_punctuation(text), true)
            }
        };

        debug!("Shortened '{}' -> '{}'", truncate_text(text, 40), truncate_text(&shortened, 40));
        TrimmedText { text: shortened, fell_back }
    }

    /// Trim the translation of every cue to its duration
    pub async fn trim_cues(&self, cues: Vec<Cue>) -> TrimOutcome {
        let results = self
            .pool
            .map_ordered(cues, |_, mut cue| async move {
                let trimmed = self.trim_text(&cue.translation, cue.duration()).await;
                cue.translation = trimmed.text;
                (cue, trimmed.fell_back)
            })
            .await;

        let fallbacks = results.iter().filter(|(_, fell_back)| *fell_back).count();
        if fallbacks > 0 {
            info!("{} of {} trims fell back to punctuation removal", fallbacks, results.len());
        }

        TrimOutcome {
            cues: results.into_iter().map(|(cue, _)| cue).collect(),
            fallbacks,
        }
    }
}
