use anyhow::{Context, Result, anyhow};
use log::debug;
use std::fs;
use std::path::Path;

use crate::subtitle::model::{Sentence, Word, index_words};

// @module: File utilities and input loading

// @struct: File operations utility
pub struct FileManager;

/// Sentence list formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceFormat {
    /// JSON array of `{source, translation}`
    Json,
    /// One `source<TAB>translation` line per sentence
    Tsv,
}

impl SentenceFormat {
    /// Guess the format from the file extension, falling back to the content
    pub fn detect<P: AsRef<Path>>(path: P, content: &str) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => SentenceFormat::Json,
            "tsv" | "txt" => SentenceFormat::Tsv,
            _ if content.trim_start().starts_with('[') => SentenceFormat::Json,
            _ => SentenceFormat::Tsv,
        }
    }
}

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    // @parses: JSON array of {text, start, end}; indices follow array order
    pub fn parse_words(content: &str) -> Result<Vec<Word>> {
        let words: Vec<Word> = serde_json::from_str(content).context("Failed to parse word transcript")?;
        for word in &words {
            if !word.start.is_finite() || !word.end.is_finite() {
                return Err(anyhow!("Word '{}' has a non-finite timestamp", word.text));
            }
        }
        Ok(index_words(words))
    }

    // @loads: Word transcript file
    pub fn load_words<P: AsRef<Path>>(path: P) -> Result<Vec<Word>> {
        let content = Self::read_to_string(&path)?;
        let words = Self::parse_words(&content).with_context(|| format!("Invalid word file: {:?}", path.as_ref()))?;
        debug!("Loaded {} words from {:?}", words.len(), path.as_ref());
        Ok(words)
    }

    // @parses: Sentence list in either format; blank lines are skipped
    pub fn parse_sentences(content: &str, format: SentenceFormat) -> Result<Vec<Sentence>> {
        match format {
            SentenceFormat::Json => serde_json::from_str(content).context("Failed to parse sentence list"),
            SentenceFormat::Tsv => Ok(content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| match line.split_once('\t') {
                    Some((source, translation)) => Sentence::new(source.trim(), translation.trim()),
                    None => Sentence::new(line.trim(), ""),
                })
                .collect()),
        }
    }

    // @loads: Sentence file, format detected from extension or content
    pub fn load_sentences<P: AsRef<Path>>(path: P) -> Result<Vec<Sentence>> {
        let content = Self::read_to_string(&path)?;
        let format = SentenceFormat::detect(&path, &content);
        let sentences =
            Self::parse_sentences(&content, format).with_context(|| format!("Invalid sentence file: {:?}", path.as_ref()))?;
        debug!("Loaded {} sentences from {:?} ({:?})", sentences.len(), path.as_ref(), format);
        Ok(sentences)
    }
}
