// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
// Add other lints specific to this module that you want to allow but not auto-fix

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cuealign::app_config::{self, Config};
use cuealign::file_utils::FileManager;
use cuealign::subtitle::AlignStrategy;
use cuealign::{Pipeline, PipelineReport};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for AlignStrategy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliAlignStrategy {
    Exact,
    Fuzzy,
}

impl From<CliAlignStrategy> for AlignStrategy {
    fn from(strategy: CliAlignStrategy) -> Self {
        match strategy {
            CliAlignStrategy::Exact => AlignStrategy::Exact,
            CliAlignStrategy::Fuzzy => AlignStrategy::Fuzzy,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align, split and trim; write subtitles and audio tasks (default command)
    Run(RunArgs),

    /// Align sentences to the transcript and write subtitles, without completion calls
    Align(RunArgs),

    /// Build audio tasks from a bilingual subtitle written by an earlier run
    Audio(AudioArgs),

    /// Generate shell completions for cuealign
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every processing command
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Transcript language code (e.g., 'en', 'ja', 'auto')
    #[arg(short = 's', long)]
    language: Option<String>,

    /// Target language code (e.g., 'zh', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Media duration in seconds; the last cue may be extended up to it
    #[arg(long)]
    media_end: Option<f64>,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Word transcript (JSON array of {text, start, end})
    #[arg(value_name = "WORDS")]
    words: PathBuf,

    /// Sentence list (JSON array of {source, translation} or TSV)
    #[arg(value_name = "SENTENCES")]
    sentences: PathBuf,

    /// Alignment strategy
    #[arg(long, value_enum)]
    strategy: Option<CliAlignStrategy>,

    /// Abort on the first sentence that cannot be aligned
    #[arg(long)]
    strict: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
struct AudioArgs {
    /// Bilingual subtitle (source line, then translation line)
    #[arg(value_name = "SUBTITLE")]
    subtitle: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

/// cuealign - sentence-to-timestamp alignment and subtitle segmentation
///
/// Aligns sentences to a word-level transcript, splits over-long cues and
/// trims translations so they can be spoken within their cue.
#[derive(Parser, Debug)]
#[command(name = "cuealign")]
#[command(version)]
#[command(about = "Sentence-to-timestamp alignment and subtitle segmentation")]
#[command(long_about = "cuealign turns a word-level transcript and a list of sentences into timed subtitles and speech-synthesis tasks.

EXAMPLES:
    cuealign run words.json sentences.json          # Full run with the default config
    cuealign align words.json sentences.tsv         # Alignment only, no completion calls
    cuealign align --strategy fuzzy words.json s.tsv
    cuealign audio output/audio/bilingual_subs_for_audio.srt
    cuealign completions bash > cuealign.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with trace level and narrow it with set_max_level
    // after the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cuealign", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Run(args) => run_full(args).await,
        Commands::Align(args) => run_align(args),
        Commands::Audio(args) => run_audio(args).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

/// Load the config file, creating a default one when missing, then apply CLI overrides
fn load_config(common: &CommonArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &common.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let config_path = &common.config_path;
    let mut config = if Path::new(config_path).exists() {
        // Load existing configuration
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        // Create default configuration if not exists
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(config_path, &config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    // Override config with CLI options if provided
    if let Some(language) = &common.language {
        config.language = language.clone();
    }
    if let Some(target_language) = &common.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(log_level) = &common.log_level {
        config.log_level = log_level.clone().into();
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if common.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    Ok(config)
}

fn apply_run_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(strategy) = &args.strategy {
        config.alignment.strategy = strategy.clone().into();
    }
    if args.strict {
        config.alignment.strict = true;
    }
}

/// Progress bar driven by the worker pool
fn progress_bar() -> ProgressBar {
    let progress_bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} units ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style);
    progress_bar
}

fn print_summary(report: &PipelineReport) {
    info!("Cues: {}, audio tasks: {}", report.cues, report.audio_tasks);
    if !report.unmatched.is_empty() {
        warn!("{} sentences could not be aligned", report.unmatched.len());
    }
    if !report.unsplit_sentences.is_empty() {
        warn!("{} long sentences were kept unsplit", report.unsplit_sentences.len());
    }
    if report.untranslated_lines > 0 {
        warn!("{} lines kept their source text as translation", report.untranslated_lines);
    }
    if report.too_long_cues > 0 {
        warn!("{} cues are still too long to display", report.too_long_cues);
    }
    if report.trim_fallbacks > 0 {
        warn!("{} trims fell back to punctuation removal", report.trim_fallbacks);
    }
    for file in &report.files {
        info!("Wrote {}", file.display());
    }
}

async fn run_full(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;
    apply_run_overrides(&mut config, &args);

    let words = FileManager::load_words(&args.words)?;
    let sentences = FileManager::load_sentences(&args.sentences)?;

    let progress = progress_bar();
    let bar = progress.clone();
    let pipeline = Pipeline::from_config(config)?.with_progress(Arc::new(move |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    }));

    let report = pipeline.run(&words, sentences, args.common.media_end).await;
    progress.finish_and_clear();
    let report = report?;

    print_summary(&report);
    let (hits, misses, rate) = pipeline.client().request_log().stats();
    info!("Request log: {} hits, {} misses ({:.0}% hit rate)", hits, misses, rate * 100.0);
    Ok(())
}

fn run_align(args: RunArgs) -> Result<()> {
    let mut config = load_config(&args.common)?;
    apply_run_overrides(&mut config, &args);

    let words = FileManager::load_words(&args.words)?;
    let sentences = FileManager::load_sentences(&args.sentences)?;

    let pipeline = Pipeline::from_config(config)?;
    let report = pipeline.run_alignment(&words, &sentences)?;
    print_summary(&report);
    Ok(())
}

async fn run_audio(args: AudioArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    let content = FileManager::read_to_string(&args.subtitle)?;

    let progress = progress_bar();
    let bar = progress.clone();
    let pipeline = Pipeline::from_config(config)?.with_progress(Arc::new(move |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    }));

    let report = pipeline.run_audio(&content, args.common.media_end).await;
    progress.finish_and_clear();

    print_summary(&report?);
    Ok(())
}
