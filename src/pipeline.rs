/*!
 * End-to-end processing.
 *
 * Display path: (translate missing lines) -> align -> tidy -> split
 * over-long cues -> remove overlaps -> four subtitle variants.
 * Audio path: display cues -> strip asides -> post-process with duration
 * trimming -> audio-task rows.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use crate::app_config::Config;
use crate::concurrency::{ProgressCallback, WorkerPool};
use crate::llm::{CompletionService, LlmClient, OpenAiCompatible, RequestLog};
use crate::splitter::{SentenceSplitter, SubtitleSplitter, Trimmer};
use crate::subtitle::aligner::{AlignOptions, Aligner, UnmatchedSentence};
use crate::subtitle::model::{AudioTask, Cue, Sentence, Word, renumber};
use crate::subtitle::postprocess::{PostProcessor, enforce_no_overlap, strip_asides};
use crate::subtitle::render::{SubtitleVariant, parse_srt_cues, write_audio_tasks, write_srt};
use crate::translator::Translator;

/// What a run produced and where it degraded
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Cues in the display subtitles
    pub cues: usize,
    pub audio_tasks: usize,
    /// Sentences skipped by the aligner
    pub unmatched: Vec<UnmatchedSentence>,
    /// Long sentences that could not be split
    pub unsplit_sentences: Vec<String>,
    /// Lines whose source text stands in for a translation
    pub untranslated_lines: usize,
    /// Cues still wider than the display limit
    pub too_long_cues: usize,
    /// Trims that fell back to punctuation removal
    pub trim_fallbacks: usize,
    /// Cues merged away or dropped during post-processing
    pub dropped_cues: usize,
    /// Files written
    pub files: Vec<PathBuf>,
}

impl PipelineReport {
    /// Whether any unit fell back or was skipped
    pub fn is_degraded(&self) -> bool {
        !self.unmatched.is_empty()
            || !self.unsplit_sentences.is_empty()
            || self.untranslated_lines > 0
            || self.too_long_cues > 0
            || self.trim_fallbacks > 0
    }
}

/// Build the completion client from the configured backends
pub fn build_client(config: &Config) -> Result<LlmClient> {
    let mut backends: Vec<Arc<dyn CompletionService>> = Vec::with_capacity(config.llm.backends.len());
    for backend in &config.llm.backends {
        let service = OpenAiCompatible::new(
            backend.name.clone(),
            backend.model.clone(),
            backend.api_key.clone(),
            &backend.endpoint,
            backend.timeout_secs,
            backend.supports_json,
        )
        .with_context(|| format!("Failed to create backend '{}'", backend.name))?
        .with_retries(config.llm.http_retries, config.llm.retry_backoff_ms);
        backends.push(Arc::new(service));
    }
    if backends.is_empty() {
        warn!("No completion backends configured, splitting and trimming will fall back locally");
    }

    Ok(LlmClient::new(backends, RequestLog::json_dir(&config.llm.log_dir)).with_retry_count(config.llm.retry_count))
}

/// Wires the aligner, splitters, trimmer and translator together
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    /// Normalized transcript language
    language: String,
    client: LlmClient,
    pool: WorkerPool,
}

impl Pipeline {
    pub fn new(config: Config, client: LlmClient) -> Result<Self> {
        let language = config.resolved_language()?;
        let pool = WorkerPool::new(config.max_workers);
        Ok(Self {
            config,
            language,
            client,
            pool,
        })
    }

    /// Pipeline with HTTP backends and an on-disk request log
    pub fn from_config(config: Config) -> Result<Self> {
        let client = build_client(&config)?;
        Self::new(config, client)
    }

    /// Report `(completed, total)` for every parallel stage
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.pool = self.pool.with_progress(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    fn align_options(&self) -> AlignOptions {
        self.config.alignment.options(&self.language)
    }

    pub fn aligner(&self) -> Aligner {
        Aligner::new(self.align_options(), self.config.alignment.timing_policy())
    }

    fn sentence_splitter(&self) -> SentenceSplitter {
        SentenceSplitter::new(
            self.client.clone(),
            self.pool.clone(),
            self.config.split.clone(),
            &self.language,
            self.config.tokenizer,
        )
    }

    fn subtitle_splitter(&self) -> SubtitleSplitter {
        // A child that cannot be found is timed proportionally instead
        let options = AlignOptions {
            strict: false,
            ..self.align_options()
        };
        SubtitleSplitter::new(
            self.sentence_splitter(),
            Aligner::new(options, self.config.alignment.timing_policy()),
            self.pool.clone(),
            self.config.subtitle.clone(),
            &self.language,
            &self.config.target_language,
        )
    }

    fn trimmer(&self) -> Trimmer {
        Trimmer::new(
            self.client.clone(),
            self.pool.clone(),
            self.config.speech_rates,
            self.config.speed_factor,
        )
    }

    fn translator(&self) -> Translator {
        Translator::new(
            self.client.clone(),
            self.pool.clone(),
            self.config.translation_chunk_lines,
            &self.language,
            &self.config.target_language,
        )
    }

    /// Fill in missing translations.
    ///
    /// A list with no translations at all is split by meaning first, since
    /// nothing pairs the sentences with existing translations yet.
    pub async fn prepare_sentences(&self, sentences: Vec<Sentence>, report: &mut PipelineReport) -> Vec<Sentence> {
        if sentences.iter().all(|s| !s.translation.trim().is_empty()) {
            return sentences;
        }

        let sentences = if sentences.iter().all(|s| s.translation.trim().is_empty()) {
            let sources = sentences.into_iter().map(|s| s.source).collect();
            let outcome = self.sentence_splitter().split_sentences_by_meaning(sources).await;
            report.unsplit_sentences = outcome.unsplit;
            outcome.sentences.into_iter().map(|source| Sentence::new(source, "")).collect()
        } else {
            sentences
        };

        let outcome = self.translator().translate_sentences(sentences).await;
        report.untranslated_lines = outcome.untranslated;
        outcome.sentences
    }

    /// Align sentences and record the ones that were skipped
    pub fn align(&self, words: &[Word], sentences: &[Sentence], report: &mut PipelineReport) -> Result<Vec<Cue>> {
        let alignment = self.aligner().align(words, sentences).context("Alignment failed")?;

        if let Some(path) = &self.config.alignment.diagnostics_file {
            if !alignment.unmatched.is_empty() {
                alignment.write_diagnostics(path)?;
                report.files.push(PathBuf::from(path));
            }
        }
        report.unmatched = alignment.unmatched;
        Ok(alignment.cues)
    }

    /// Cues for the display subtitles
    pub async fn display_cues(&self, words: &[Word], sentences: Vec<Sentence>, report: &mut PipelineReport) -> Result<Vec<Cue>> {
        let sentences = self.prepare_sentences(sentences, report).await;
        let cues = self.align(words, &sentences, report)?;
        if cues.is_empty() {
            return Err(anyhow!("No sentence could be aligned to the transcript"));
        }

        let post = PostProcessor::new(self.config.subtitle.min_duration, self.config.trim_passes);
        let cues = post.tidy(cues);

        let outcome = self.subtitle_splitter().split_long_cues(cues, words).await;
        report.too_long_cues = outcome.too_long;

        let mut cues = enforce_no_overlap(outcome.cues);
        renumber(&mut cues);
        report.cues = cues.len();
        Ok(cues)
    }

    /// Trimmed cues and audio tasks built from display cues
    pub async fn audio_tasks(&self, cues: &[Cue], media_end: Option<f64>, report: &mut PipelineReport) -> (Vec<Cue>, Vec<AudioTask>) {
        let cues: Vec<Cue> = cues
            .iter()
            .cloned()
            .map(|mut cue| {
                cue.translation = strip_asides(&cue.translation);
                cue
            })
            .collect();

        let post = PostProcessor::new(self.config.subtitle.min_duration, self.config.trim_passes).with_media_end(media_end);
        let outcome = post.run(cues, &self.trimmer()).await;
        report.trim_fallbacks = outcome.trim_fallbacks;
        report.dropped_cues = outcome.dropped;

        let tasks: Vec<AudioTask> = outcome.cues.iter().map(AudioTask::from_cue).collect();
        report.audio_tasks = tasks.len();
        (outcome.cues, tasks)
    }

    fn output_path(&self, dir: &str, file_name: &str) -> PathBuf {
        Path::new(dir).join(file_name)
    }

    /// Write the four display variants and the bilingual subtitle used for audio
    pub fn write_subtitles(&self, cues: &[Cue], report: &mut PipelineReport) -> Result<()> {
        let outputs = &self.config.outputs;
        let polish = self.config.subtitle.polish_translation;

        for variant in SubtitleVariant::ALL {
            let path = self.output_path(&outputs.dir, outputs.file_name(variant));
            write_srt(&path, cues, variant, polish)?;
            report.files.push(path);
        }

        let path = self.output_path(&outputs.audio_dir, &outputs.audio_subtitle);
        write_srt(&path, cues, SubtitleVariant::SourceTranslation, false)?;
        report.files.push(path);
        Ok(())
    }

    pub fn write_audio(&self, tasks: &[AudioTask], report: &mut PipelineReport) -> Result<()> {
        let outputs = &self.config.outputs;
        let path = self.output_path(&outputs.audio_dir, &outputs.audio_tasks);
        write_audio_tasks(&path, tasks)?;
        report.files.push(path);
        Ok(())
    }

    /// Full run: display subtitles, then audio tasks
    pub async fn run(&self, words: &[Word], sentences: Vec<Sentence>, media_end: Option<f64>) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        info!("Processing {} words and {} sentences ({})", words.len(), sentences.len(), self.language);

        let cues = self.display_cues(words, sentences, &mut report).await?;
        self.write_subtitles(&cues, &mut report)?;

        let (_, tasks) = self.audio_tasks(&cues, media_end, &mut report).await;
        self.write_audio(&tasks, &mut report)?;

        info!(
            "Wrote {} cues and {} audio tasks ({} files)",
            report.cues,
            report.audio_tasks,
            report.files.len()
        );
        Ok(report)
    }

    /// Alignment only: no completion calls, cues written as aligned
    pub fn run_alignment(&self, words: &[Word], sentences: &[Sentence]) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let cues = self.align(words, sentences, &mut report)?;
        report.cues = cues.len();

        let outputs = &self.config.outputs;
        for variant in SubtitleVariant::ALL {
            let path = self.output_path(&outputs.dir, outputs.file_name(variant));
            write_srt(&path, &cues, variant, self.config.subtitle.polish_translation)?;
            report.files.push(path);
        }
        Ok(report)
    }

    /// Audio tasks from a bilingual subtitle written by an earlier run
    pub async fn run_audio(&self, srt_content: &str, media_end: Option<f64>) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        let cues = parse_srt_cues(srt_content, SubtitleVariant::SourceTranslation)?;
        report.cues = cues.len();

        let (_, tasks) = self.audio_tasks(&cues, media_end, &mut report).await;
        self.write_audio(&tasks, &mut report)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockService;

    fn pipeline(service: MockService) -> Pipeline {
        let client = LlmClient::new(vec![Arc::new(service) as Arc<dyn CompletionService>], RequestLog::in_memory())
            .with_retry_count(1);
        Pipeline::new(Config::default(), client).unwrap()
    }

    #[tokio::test]
    async fn test_prepareSentences_allTranslated_shouldNotCallService() {
        let service = MockService::working();
        let pipeline = pipeline(service.clone());
        let mut report = PipelineReport::default();
        let sentences = vec![Sentence::new("Hello", "Bonjour")];
        let prepared = pipeline.prepare_sentences(sentences.clone(), &mut report).await;
        assert_eq!(prepared, sentences);
        assert_eq!(service.request_count(), 0);
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn test_audioTasks_shouldStripAsidesAndNumberFromOne() {
        let pipeline = pipeline(MockService::failing());
        let mut report = PipelineReport::default();
        let cues = vec![
            Cue::new(4, 0.0, 3.0, "Hi (laughs)", "Salut (rires)"),
            Cue::new(5, 3.0, 6.0, "Bye", "Au revoir"),
        ];
        let (_, tasks) = pipeline.audio_tasks(&cues, None, &mut report).await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].number, 1);
        assert_eq!(tasks[0].text, "Salut");
        assert_eq!(tasks[0].origin, "Hi (laughs)");
    }
}
