/*!
 * Common test utilities for the cuealign test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use cuealign::app_config::Config;
use cuealign::{Sentence, Word};

// Re-export the mock backend helpers
pub mod mock_services;

/// Route library logs to the test output; `RUST_LOG=debug` shows alignment details
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Words from `(text, start, end)` triples, indexed in order
pub fn words(spec: &[(&str, f64, f64)]) -> Vec<Word> {
    spec.iter()
        .enumerate()
        .map(|(i, (text, start, end))| Word::new(i, *text, *start, *end))
        .collect()
}

/// A short English transcript with three sentences and a pause between each
pub fn sample_words() -> Vec<Word> {
    words(&[
        ("Good", 0.0, 0.4),
        ("morning,", 0.4, 1.0),
        ("everyone.", 1.0, 1.8),
        ("Today", 3.0, 3.4),
        ("we", 3.4, 3.6),
        ("talk", 3.6, 4.0),
        ("about", 4.0, 4.3),
        ("rivers.", 4.3, 5.2),
        ("They", 7.0, 7.3),
        ("shape", 7.3, 7.7),
        ("the", 7.7, 7.9),
        ("land.", 7.9, 8.8),
    ])
}

/// Word transcript matching [`sample_words`] as stored on disk
pub fn sample_words_json() -> String {
    let words: Vec<serde_json::Value> = sample_words()
        .iter()
        .map(|w| serde_json::json!({"text": w.text, "start": w.start, "end": w.end}))
        .collect();
    serde_json::Value::Array(words).to_string()
}

pub fn sample_sentences() -> Vec<Sentence> {
    vec![
        Sentence::new("Good morning, everyone.", "大家早上好。"),
        Sentence::new("Today we talk about rivers.", "今天我们谈谈河流。"),
        Sentence::new("They shape the land.", "它们塑造了大地。"),
    ]
}

/// Default config writing every output below `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.outputs.dir = dir.join("output").to_string_lossy().to_string();
    config.outputs.audio_dir = dir.join("output/audio").to_string_lossy().to_string();
    config.llm.log_dir = dir.join("output/gpt_log").to_string_lossy().to_string();
    config.max_workers = 2;
    config
}
