use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;

use crate::language_utils;
use crate::subtitle::{AlignOptions, AlignStrategy, SubtitleVariant, TimingPolicy};
use crate::text::{Joiner, SpeechRates, SpeedFactor, TokenizerBackend};

/// Application configuration module
/// This module handles the engine configuration: languages, subtitle limits,
/// alignment, splitting, completion backends and output file names.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Transcript language code (ISO), or `auto`
    #[serde(default = "default_language")]
    pub language: String,

    /// Language reported by the recognizer, used when `language` is `auto`
    #[serde(default)]
    pub detected_language: Option<String>,

    /// Language translations are written in
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Subtitle display limits
    #[serde(default)]
    pub subtitle: SubtitleConfig,

    /// Speaking speed multipliers
    #[serde(default)]
    pub speed_factor: SpeedFactor,

    /// Base speaking rates
    #[serde(default)]
    pub speech_rates: SpeechRates,

    /// Sentence alignment
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Sentence and subtitle splitting
    #[serde(default)]
    pub split: SplitConfig,

    /// Number of duration-trimming passes for audio tasks
    #[serde(default = "default_trim_passes")]
    pub trim_passes: usize,

    /// Worker pool size for splitting, trimming and translation
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Lines per translation request
    #[serde(default = "default_translation_chunk_lines")]
    pub translation_chunk_lines: usize,

    /// Token counter used for length checks
    #[serde(default)]
    pub tokenizer: TokenizerBackend,

    /// Completion backends
    #[serde(default)]
    pub llm: LlmConfig,

    /// Output file names
    #[serde(default)]
    pub outputs: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Subtitle display limits
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubtitleConfig {
    /// Longest line allowed on screen, in characters
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Weight applied to the visual width of translations
    #[serde(default = "default_target_multiplier")]
    pub target_multiplier: f64,

    /// Shortest cue duration in seconds
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,

    /// Replace full-width commas and stops by spaces in displayed translations
    #[serde(default = "default_true")]
    pub polish_translation: bool,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            target_multiplier: default_target_multiplier(),
            min_duration: default_min_duration(),
            polish_translation: true,
        }
    }
}

/// Alignment settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignmentConfig {
    #[serde(default)]
    pub strategy: AlignStrategy,

    /// Retry exact misses with fuzzy search
    #[serde(default = "default_true")]
    pub fuzzy_fallback: bool,

    /// Abort on the first sentence that cannot be aligned
    #[serde(default)]
    pub strict: bool,

    #[serde(default = "default_accept_score")]
    pub accept_score: f64,

    /// Window positions examined past the cursor in fuzzy mode
    #[serde(default = "default_search_span")]
    pub search_span: usize,

    #[serde(default = "default_overlap_margin")]
    pub overlap_margin: f64,

    #[serde(default = "default_bridge_gap_below")]
    pub bridge_gap_below: f64,

    /// Where unmatched sentences are dumped, if anywhere
    #[serde(default)]
    pub diagnostics_file: Option<String>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            strategy: AlignStrategy::default(),
            fuzzy_fallback: true,
            strict: false,
            accept_score: default_accept_score(),
            search_span: default_search_span(),
            overlap_margin: default_overlap_margin(),
            bridge_gap_below: default_bridge_gap_below(),
            diagnostics_file: None,
        }
    }
}

impl AlignmentConfig {
    /// Aligner options for a transcript language
    pub fn options(&self, language: &str) -> AlignOptions {
        AlignOptions {
            strategy: self.strategy,
            fuzzy_fallback: self.fuzzy_fallback,
            strict: self.strict,
            accept_score: self.accept_score,
            search_span: self.search_span,
            joiner: Joiner::for_language(language),
        }
    }

    pub fn timing_policy(&self) -> TimingPolicy {
        TimingPolicy {
            overlap_margin: self.overlap_margin,
            bridge_gap_below: self.bridge_gap_below,
        }
    }
}

/// Splitting settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SplitConfig {
    /// Sentences with more tokens than this are split by meaning
    #[serde(default = "default_max_split_length")]
    pub max_split_length: usize,

    /// Word budget given to the model for each part
    #[serde(default = "default_word_limit")]
    pub word_limit: usize,

    /// Prompt attempts per split request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Passes over the sentence list, each with more prompt padding
    #[serde(default = "default_passes")]
    pub passes: usize,

    /// Rounds of subtitle-line splitting
    #[serde(default = "default_max_split_rounds")]
    pub max_split_rounds: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_split_length: default_max_split_length(),
            word_limit: default_word_limit(),
            max_attempts: default_max_attempts(),
            passes: default_passes(),
            max_split_rounds: default_max_split_rounds(),
        }
    }
}

/// One OpenAI-compatible completion backend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: Name used in logs
    pub name: String,

    // @field: Model name
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Accepts `response_format: json_object`
    #[serde(default = "default_true")]
    pub supports_json: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            model: default_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            supports_json: true,
        }
    }
}

/// Completion settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    /// Backends tried in order
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    /// Directory holding the request log
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Prompt attempts for requests without their own setting
    #[serde(default = "default_retry_count")]
    pub retry_count: usize,

    /// HTTP retries per backend for transient failures
    #[serde(default = "default_http_retries")]
    pub http_retries: u32,

    /// Base backoff in milliseconds, doubled on each HTTP retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            log_dir: default_log_dir(),
            retry_count: default_retry_count(),
            http_retries: default_http_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Output file names
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory for subtitle files
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Directory for the audio task list and its subtitle
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    #[serde(default = "default_source_file")]
    pub source: String,

    #[serde(default = "default_translation_file")]
    pub translation: String,

    #[serde(default = "default_source_translation_file")]
    pub source_translation: String,

    #[serde(default = "default_translation_source_file")]
    pub translation_source: String,

    /// Bilingual subtitle the audio tasks are generated from
    #[serde(default = "default_audio_subtitle_file")]
    pub audio_subtitle: String,

    #[serde(default = "default_audio_tasks_file")]
    pub audio_tasks: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            audio_dir: default_audio_dir(),
            source: default_source_file(),
            translation: default_translation_file(),
            source_translation: default_source_translation_file(),
            translation_source: default_translation_source_file(),
            audio_subtitle: default_audio_subtitle_file(),
            audio_tasks: default_audio_tasks_file(),
        }
    }
}

impl OutputConfig {
    /// Configured file name for a subtitle variant
    pub fn file_name(&self, variant: SubtitleVariant) -> &str {
        match variant {
            SubtitleVariant::Source => &self.source,
            SubtitleVariant::Translation => &self.translation,
            SubtitleVariant::SourceTranslation => &self.source_translation,
            SubtitleVariant::TranslationSource => &self.translation_source,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_max_length() -> usize {
    75
}

fn default_target_multiplier() -> f64 {
    1.2
}

fn default_min_duration() -> f64 {
    2.5
}

fn default_accept_score() -> f64 {
    0.8
}

fn default_search_span() -> usize {
    300
}

fn default_overlap_margin() -> f64 {
    0.1
}

fn default_bridge_gap_below() -> f64 {
    1.0
}

fn default_max_split_length() -> usize {
    20
}

fn default_word_limit() -> usize {
    18
}

fn default_max_attempts() -> usize {
    3
}

fn default_passes() -> usize {
    3
}

fn default_max_split_rounds() -> usize {
    5
}

fn default_trim_passes() -> usize {
    2
}

fn default_max_workers() -> usize {
    4
}

fn default_translation_chunk_lines() -> usize {
    8
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    150
}

fn default_backends() -> Vec<BackendConfig> {
    vec![BackendConfig::default()]
}

fn default_log_dir() -> String {
    "output/gpt_log".to_string()
}

fn default_retry_count() -> usize {
    3
}

/// Upper bound for `llm.http_retries`
const MAX_HTTP_RETRIES: u32 = 10;

fn default_http_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_audio_dir() -> String {
    "output/audio".to_string()
}

fn default_source_file() -> String {
    SubtitleVariant::Source.default_file_name().to_string()
}

fn default_translation_file() -> String {
    SubtitleVariant::Translation.default_file_name().to_string()
}

fn default_source_translation_file() -> String {
    SubtitleVariant::SourceTranslation.default_file_name().to_string()
}

fn default_translation_source_file() -> String {
    SubtitleVariant::TranslationSource.default_file_name().to_string()
}

fn default_audio_subtitle_file() -> String {
    "bilingual_subs_for_audio.srt".to_string()
}

fn default_audio_tasks_file() -> String {
    "tts_tasks.json".to_string()
}

impl Config {
    /// Effective transcript language as a normalized ISO code
    pub fn resolved_language(&self) -> Result<String> {
        language_utils::resolve_language(&self.language, self.detected_language.as_deref())
    }

    /// Tokenizer for the effective language
    pub fn resolved_tokenizer(&self) -> Result<TokenizerBackend> {
        Ok(self.tokenizer.resolve(&self.resolved_language()?))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let source = self.resolved_language()?;
        let _source_name = language_utils::get_language_name(&source)?;
        let _target_name = language_utils::get_language_name(&self.target_language)?;

        if self.subtitle.max_length == 0 {
            return Err(anyhow!("subtitle.max_length must be greater than 0"));
        }
        if self.subtitle.target_multiplier <= 0.0 {
            return Err(anyhow!("subtitle.target_multiplier must be positive"));
        }
        if self.subtitle.min_duration < 0.0 {
            return Err(anyhow!("subtitle.min_duration cannot be negative"));
        }
        if self.speed_factor.multiplier() <= 0.0 {
            return Err(anyhow!("speed_factor values must be positive"));
        }
        let rates = &self.speech_rates;
        if rates.cjk_chars_per_sec <= 0.0 || rates.words_per_sec <= 0.0 || rates.punctuation_per_sec <= 0.0 {
            return Err(anyhow!("speech_rates values must be positive"));
        }
        if !(0.0..=1.0).contains(&self.alignment.accept_score) {
            return Err(anyhow!("alignment.accept_score must be between 0 and 1"));
        }
        if self.alignment.overlap_margin < 0.0 || self.alignment.bridge_gap_below < 0.0 {
            return Err(anyhow!("alignment margins cannot be negative"));
        }
        if self.split.max_split_length == 0 || self.split.word_limit == 0 {
            return Err(anyhow!("split.max_split_length and split.word_limit must be greater than 0"));
        }

        if self.llm.http_retries > MAX_HTTP_RETRIES {
            return Err(anyhow!("llm.http_retries cannot exceed {}", MAX_HTTP_RETRIES));
        }

        // Every backend needs a model and a usable endpoint
        for backend in &self.llm.backends {
            if backend.model.trim().is_empty() {
                return Err(anyhow!("Backend '{}' has no model", backend.name));
            }
            crate::llm::openai::chat_completions_url(&backend.endpoint)
                .map_err(|e| anyhow!("Backend '{}' has an invalid endpoint: {}", backend.name, e))?;
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: default_language(),
            detected_language: None,
            target_language: default_target_language(),
            subtitle: SubtitleConfig::default(),
            speed_factor: SpeedFactor::default(),
            speech_rates: SpeechRates::default(),
            alignment: AlignmentConfig::default(),
            split: SplitConfig::default(),
            trim_passes: default_trim_passes(),
            max_workers: default_max_workers(),
            translation_chunk_lines: default_translation_chunk_lines(),
            tokenizer: TokenizerBackend::default(),
            llm: LlmConfig::default(),
            outputs: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
