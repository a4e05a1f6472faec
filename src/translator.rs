/*!
 * Two-step line translation.
 *
 * Lines are translated in chunks: a literal translation first, then a free
 * translation that reflects on the literal one. Each response must carry
 * exactly one entry per line. A chunk that cannot be translated keeps its
 * source lines as the translation.
 */

use log::{debug, info, warn};
use serde_json::Value;

use crate::concurrency::WorkerPool;
use crate::errors::LlmError;
use crate::language_utils;
use crate::llm::LlmClient;
use crate::llm::prompts::{expressiveness_prompt, faithfulness_prompt};
use crate::llm::schema::ResponseSchema;
use crate::subtitle::model::Sentence;

/// Result of filling in missing translations
#[derive(Debug, Clone, Default)]
pub struct TranslationOutcome {
    pub sentences: Vec<Sentence>,
    /// Lines whose source text was used as the translation
    pub untranslated: usize,
}

/// Translates subtitle lines with the completion service
#[derive(Debug, Clone)]
pub struct Translator {
    client: LlmClient,
    pool: WorkerPool,
    chunk_lines: usize,
    source_language: String,
    target_language: String,
}

impl Translator {
    pub fn new(client: LlmClient, pool: WorkerPool, chunk_lines: usize, source_language: &str, target_language: &str) -> Self {
        Self {
            client,
            pool,
            chunk_lines: chunk_lines.max(1),
            source_language: language_utils::display_name(source_language),
            target_language: language_utils::display_name(target_language),
        }
    }

    /// Translate `lines`, returning exactly one translation per line
    pub async fn translate_lines(&self, lines: &[String]) -> Result<Vec<String>, LlmError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }
        let count = lines.len();
        // Line breaks inside a line would shift every later line
        let lines: Vec<String> = lines.iter().map(|l| l.replace('\n', " ")).collect();

        let prompt = faithfulness_prompt(&lines, &self.source_language, &self.target_language);
        let mut faithful = self
            .client
            .ask_with_retry(&prompt, ResponseSchema::Faithfulness { lines: count }, "translate_faithfulness")
            .await?;
        flatten_field(&mut faithful, "direct");

        let prompt = expressiveness_prompt(&faithful, count, &self.target_language);
        let expressive = self
            .client
            .ask_with_retry(&prompt, ResponseSchema::Expressiveness { lines: count }, "translate_expressiveness")
            .await?;

        let translations: Vec<String> = (1..=count)
            .map(|i| {
                expressive[i.to_string()]["free"]
                    .as_str()
                    .unwrap_or_default()
                    .replace('\n', " ")
                    .trim()
                    .to_string()
            })
            .collect();

        for (line, translation) in lines.iter().zip(&translations) {
            debug!("'{}' -> '{}'", line, translation);
        }
        Ok(translations)
    }

    /// Fill in every empty translation; chunks that fail keep their source text
    pub async fn translate_sentences(&self, sentences: Vec<Sentence>) -> TranslationOutcome {
        let missing: Vec<usize> = sentences
            .iter()
            .enumerate()
            .filter(|(_, s)| s.translation.trim().is_empty())
            .map(|(i, _)| i)
            .collect();
        if missing.is_empty() {
            return TranslationOutcome {
                sentences,
                untranslated: 0,
            };
        }
        info!("Translating {} lines in chunks of {}", missing.len(), self.chunk_lines);

        let chunks: Vec<Vec<usize>> = missing.chunks(self.chunk_lines).map(<[usize]>::to_vec).collect();
        let sentences_ref = &sentences;
        let results = self
            .pool
            .map_ordered(chunks, |chunk_index, chunk| async move {
                let lines: Vec<String> = chunk.iter().map(|&i| sentences_ref[i].source.clone()).collect();
                match self.translate_lines(&lines).await {
                    Ok(translations) => (chunk, translations, false),
                    Err(e) => {
                        warn!("Translation of chunk {} failed, keeping the source lines: {}", chunk_index, e);
                        (chunk, lines, true)
                    }
                }
            })
            .await;

        let mut sentences = sentences;
        let mut untranslated = 0;
        for (chunk, translations, fell_back) in results {
            if fell_back {
                untranslated += chunk.len();
            }
            for (i, translation) in chunk.into_iter().zip(translations) {
                sentences[i].translation = translation;
            }
        }

        TranslationOutcome { sentences, untranslated }
    }
}

/// Replace newlines by spaces in `field` of every numbered entry
fn flatten_field(response: &mut Value, field: &str) {
    if let Some(entries) = response.as_object_mut() {
        for entry in entries.values_mut() {
            if let Some(Value::String(text)) = entry.get_mut(field) {
                *text = text.replace('\n', " ");
            }
        }
    }
}
