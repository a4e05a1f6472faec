use serde::{Deserialize, Serialize};

// @module: Core subtitle data types

// @struct: One transcribed word with its timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    // @field: Position in the transcript, assigned on load
    #[serde(default)]
    pub index: usize,

    pub text: String,

    // @field: Start in seconds
    pub start: f64,

    // @field: End in seconds
    pub end: f64,
}

impl Word {
    pub fn new(index: usize, text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            index,
            text: text.into(),
            start,
            end,
        }
    }
}

/// Renumber words by position, ignoring any index read from input
pub fn index_words(mut words: Vec<Word>) -> Vec<Word> {
    for (i, word) in words.iter_mut().enumerate() {
        word.index = i;
    }
    words
}

// @struct: A source sentence and its translation, without timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub source: String,

    #[serde(default)]
    pub translation: String,
}

impl Sentence {
    pub fn new(source: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            translation: translation.into(),
        }
    }
}

// @struct: A timed subtitle cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    // @field: 1-based sequence number
    pub index: usize,

    pub start: f64,

    pub end: f64,

    pub source: String,

    pub translation: String,
}

impl Cue {
    pub fn new(index: usize, start: f64, end: f64, source: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            source: source.into(),
            translation: translation.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Absorb `next` into this cue: texts joined with a space, end taken from `next`
    pub fn absorb(&mut self, next: &Cue) {
        self.source = join_nonempty(&self.source, &next.source);
        self.translation = join_nonempty(&self.translation, &next.translation);
        self.end = next.end;
    }
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.trim().is_empty(), b.trim().is_empty()) {
        (true, _) => b.trim().to_string(),
        (_, true) => a.trim().to_string(),
        _ => format!("{} {}", a.trim(), b.trim()),
    }
}

/// Renumber cues from 1
pub fn renumber(cues: &mut [Cue]) {
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i + 1;
    }
}

// @struct: One row of the speech-synthesis task list
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTask {
    pub number: usize,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    // @field: Translation to be spoken
    pub text: String,
    // @field: Source-language text of the same cue
    pub origin: String,
}

impl AudioTask {
    pub fn from_cue(cue: &Cue) -> Self {
        Self {
            number: cue.index,
            start: cue.start,
            end: cue.end,
            duration: cue.duration(),
            text: cue.translation.clone(),
            origin: cue.source.clone(),
        }
    }
}
