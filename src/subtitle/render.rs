use std::fmt;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::file_utils::FileManager;
use crate::subtitle::model::{AudioTask, Cue};

// @module: Subtitle and audio-task output

// @const: SRT timestamp line
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})").unwrap()
});

static DISPLAY_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[，。]").unwrap());

fn to_millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

fn split_millis(ms: u64) -> (u64, u64, u64, u64) {
    (ms / 3_600_000, (ms % 3_600_000) / 60_000, (ms % 60_000) / 1_000, ms % 1_000)
}

/// Format seconds as `HH:MM:SS,mmm`
pub fn format_srt_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(to_millis(seconds));
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Format seconds as `HH:MM:SS.mmm`
pub fn format_task_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split_millis(to_millis(seconds));
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// Replace full-width comma and full stop with spaces for on-screen display
pub fn polish_translation(text: &str) -> String {
    DISPLAY_PUNCTUATION.replace_all(text, " ").trim().to_string()
}

// @enum: Which text lines a subtitle file carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleVariant {
    Source,
    Translation,
    SourceTranslation,
    TranslationSource,
}

impl SubtitleVariant {
    pub const ALL: [SubtitleVariant; 4] = [
        SubtitleVariant::Source,
        SubtitleVariant::Translation,
        SubtitleVariant::SourceTranslation,
        SubtitleVariant::TranslationSource,
    ];

    pub fn default_file_name(&self) -> &'static str {
        match self {
            SubtitleVariant::Source => "src_subtitles.srt",
            SubtitleVariant::Translation => "trans_subtitles.srt",
            SubtitleVariant::SourceTranslation => "bilingual_src_trans_subtitles.srt",
            SubtitleVariant::TranslationSource => "bilingual_trans_src_subtitles.srt",
        }
    }

    fn lines(&self, source: &str, translation: &str) -> Vec<String> {
        let (source, translation) = (source.trim().to_string(), translation.trim().to_string());
        let lines = match self {
            SubtitleVariant::Source => vec![source],
            SubtitleVariant::Translation => vec![translation],
            SubtitleVariant::SourceTranslation => vec![source, translation],
            SubtitleVariant::TranslationSource => vec![translation, source],
        };
        lines.into_iter().filter(|l| !l.is_empty()).collect()
    }
}

// @struct: One SRT block
#[derive(Debug, Clone, PartialEq)]
pub struct SrtBlock {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub lines: Vec<String>,
}

impl SrtBlock {
    pub fn from_cue(cue: &Cue, variant: SubtitleVariant, polish: bool) -> Self {
        let translation = if polish {
            polish_translation(&cue.translation)
        } else {
            cue.translation.clone()
        };
        Self {
            index: cue.index,
            start: cue.start,
            end: cue.end,
            lines: variant.lines(&cue.source, &translation),
        }
    }

    /// Rebuild a cue, reading lines in the order `variant` writes them
    pub fn into_cue(self, variant: SubtitleVariant) -> Cue {
        let mut lines = self.lines.into_iter();
        let first = lines.next().unwrap_or_default();
        let rest = lines.collect::<Vec<_>>().join(" ");
        let (source, translation) = match variant {
            SubtitleVariant::Source => (first, String::new()),
            SubtitleVariant::Translation => (String::new(), first),
            SubtitleVariant::SourceTranslation => (first, rest),
            SubtitleVariant::TranslationSource => (rest, first),
        };
        Cue::new(self.index, self.start, self.end, source, translation)
    }
}

impl fmt::Display for SrtBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", format_srt_timestamp(self.start), format_srt_timestamp(self.end))?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Render cues as an SRT document
pub fn render_srt(cues: &[Cue], variant: SubtitleVariant, polish: bool) -> String {
    cues.iter()
        .map(|cue| SrtBlock::from_cue(cue, variant, polish).to_string())
        .collect::<Vec<_>>()
        .join("")
}

/// Write rendered subtitles, creating parent directories as needed
pub fn write_srt<P: AsRef<Path>>(path: P, cues: &[Cue], variant: SubtitleVariant, polish: bool) -> Result<()> {
    let path = path.as_ref();
    FileManager::write_to_file(path, &render_srt(cues, variant, polish))
        .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;
    debug!("Wrote {} cues to {}", cues.len(), path.display());
    Ok(())
}

fn captured_millis(caps: &regex::Captures, start_idx: usize) -> u64 {
    let part = |i: usize| -> u64 { caps.get(start_idx + i).map_or(0, |m| m.as_str().parse().unwrap_or(0)) };
    (part(0) * 3600 + part(1) * 60 + part(2)) * 1000 + part(3)
}

/// Parse SRT content into blocks
pub fn parse_srt(content: &str) -> Result<Vec<SrtBlock>> {
    let mut blocks = Vec::new();
    let mut index: Option<usize> = None;
    let mut times: Option<(u64, u64)> = None;
    let mut lines: Vec<String> = Vec::new();

    let mut flush = |index: &mut Option<usize>, times: &mut Option<(u64, u64)>, lines: &mut Vec<String>| {
        if let (Some(i), Some((start, end))) = (*index, *times) {
            if lines.is_empty() {
                warn!("Skipping empty subtitle block {}", i);
            } else if end <= start {
                warn!("Skipping subtitle block {} with invalid time range", i);
            } else {
                blocks.push(SrtBlock {
                    index: i,
                    start: start as f64 / 1000.0,
                    end: end as f64 / 1000.0,
                    lines: std::mem::take(lines),
                });
            }
        }
        *index = None;
        *times = None;
        lines.clear();
    };

    for (line_number, line) in content.lines().enumerate() {
        let trimmed = line.trim().trim_start_matches('\u{feff}');

        if trimmed.is_empty() {
            if times.is_some() && !lines.is_empty() {
                flush(&mut index, &mut times, &mut lines);
            }
            continue;
        }

        if index.is_none() && lines.is_empty() {
            if let Ok(number) = trimmed.parse::<usize>() {
                index = Some(number);
                continue;
            }
        }

        if index.is_some() && times.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                times = Some((captured_millis(&caps, 1), captured_millis(&caps, 5)));
                continue;
            }
        }

        if times.is_some() {
            lines.push(trimmed.to_string());
        } else {
            warn!("Unexpected text at line {}: {}", line_number + 1, trimmed);
        }
    }
    flush(&mut index, &mut times, &mut lines);

    if blocks.is_empty() {
        return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
    }
    Ok(blocks)
}

/// Parse SRT content written with `variant` back into cues
pub fn parse_srt_cues(content: &str, variant: SubtitleVariant) -> Result<Vec<Cue>> {
    Ok(parse_srt(content)?
        .into_iter()
        .map(|block| block.into_cue(variant))
        .collect())
}

// @struct: Serialized audio-task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTaskRow {
    pub number: usize,
    pub start_time: String,
    pub end_time: String,
    pub duration: f64,
    pub text: String,
    pub origin: String,
}

impl From<&AudioTask> for AudioTaskRow {
    fn from(task: &AudioTask) -> Self {
        Self {
            number: task.number,
            start_time: format_task_timestamp(task.start),
            end_time: format_task_timestamp(task.end),
            duration: (task.duration * 1000.0).round() / 1000.0,
            text: task.text.clone(),
            origin: task.origin.clone(),
        }
    }
}

/// Audio tasks as a pretty-printed JSON array
pub fn render_audio_tasks(tasks: &[AudioTask]) -> Result<String> {
    let rows: Vec<AudioTaskRow> = tasks.iter().map(AudioTaskRow::from).collect();
    serde_json::to_string_pretty(&rows).context("Failed to serialize audio tasks")
}

pub fn write_audio_tasks<P: AsRef<Path>>(path: P, tasks: &[AudioTask]) -> Result<()> {
    let path = path.as_ref();
    FileManager::write_to_file(path, &render_audio_tasks(tasks)?)
        .with_context(|| format!("Failed to write audio tasks: {}", path.display()))
}
