/*!
 * Request log with memoization.
 *
 * Every completion is appended to a per-title log (`<dir>/<title>.json`, a JSON
 * array). Before calling a backend the client looks up an earlier response
 * for the exact same prompt and model, which makes re-runs cheap and keeps
 * them reproducible. Storage is injected so tests can stay in memory.
 */

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::text::truncate_text;

/// Title used for responses that failed validation
pub const ERROR_LOG_TITLE: &str = "error";

/// One logged request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub model: String,
    pub prompt: String,
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Backing storage for the request log
pub trait LogStore: Send + Sync + Debug {
    /// All entries logged under `title`, oldest first
    fn load(&self, title: &str) -> Result<Vec<LogEntry>>;

    /// Append one entry under `title`
    fn append(&self, title: &str, entry: &LogEntry) -> Result<()>;
}

/// One JSON array file per title inside a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{}.json", title))
    }
}

impl LogStore for JsonDirStore {
    fn load(&self, title: &str) -> Result<Vec<LogEntry>> {
        let path = self.path_for(title);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read request log: {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).with_context(|| format!("Failed to parse request log: {}", path.display()))
    }

    fn append(&self, title: &str, entry: &LogEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create log directory: {}", self.dir.display()))?;
        let mut entries = self.load(title)?;
        entries.push(entry.clone());
        let path = self.path_for(title);
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialize request log")?;
        fs::write(&path, json).with_context(|| format!("Failed to write request log: {}", path.display()))
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    logs: RwLock<HashMap<String, Vec<LogEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for MemoryStore {
    fn load(&self, title: &str) -> Result<Vec<LogEntry>> {
        Ok(self.logs.read().get(title).cloned().unwrap_or_default())
    }

    fn append(&self, title: &str, entry: &LogEntry) -> Result<()> {
        self.logs.write().entry(title.to_string()).or_default().push(entry.clone());
        Ok(())
    }
}

/// Memoization key for a prompt sent to a model
pub fn request_key(prompt: &str, model: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
struct LogIndex {
    /// Titles whose stored entries have been indexed
    loaded: HashSet<String>,
    /// title -> request key -> latest response
    responses: HashMap<String, HashMap<String, Value>>,
}

/// Request log shared by every completion in a run
#[derive(Clone)]
pub struct RequestLog {
    store: Arc<dyn LogStore>,
    index: Arc<RwLock<LogIndex>>,
    /// Lookup hit counter
    hits: Arc<RwLock<usize>>,
    /// Lookup miss counter
    misses: Arc<RwLock<usize>>,
}

impl Debug for RequestLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLog").field("store", &self.store).finish()
    }
}

impl RequestLog {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self {
            store,
            index: Arc::new(RwLock::new(LogIndex::default())),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn json_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(Arc::new(JsonDirStore::new(dir)))
    }

    fn ensure_loaded(&self, title: &str) {
        if self.index.read().loaded.contains(title) {
            return;
        }

        let mut index = self.index.write();
        if index.loaded.contains(title) {
            return;
        }
        let entries = match self.store.load(title) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring unreadable request log '{}': {}", title, e);
                Vec::new()
            }
        };
        let responses = index.responses.entry(title.to_string()).or_default();
        for entry in entries {
            if entry.message.is_none() {
                responses.insert(request_key(&entry.prompt, &entry.model), entry.response);
            }
        }
        index.loaded.insert(title.to_string());
    }

    /// Earlier response for this exact prompt and model, if any
    pub fn lookup(&self, title: &str, prompt: &str, model: &str) -> Option<Value> {
        self.ensure_loaded(title);
        let key = request_key(prompt, model);
        let found = self
            .index
            .read()
            .responses
            .get(title)
            .and_then(|responses| responses.get(&key))
            .cloned();

        match found {
            Some(response) => {
                *self.hits.write() += 1;
                debug!("Request log hit in '{}' for '{}'", title, truncate_text(prompt, 30));
                Some(response)
            }
            None => {
                *self.misses.write() += 1;
                None
            }
        }
    }

    /// Append a response; entries with a `message` are failures and are never replayed
    pub fn record(&self, title: &str, model: &str, prompt: &str, response: &Value, message: Option<&str>) {
        self.ensure_loaded(title);
        let entry = LogEntry {
            model: model.to_string(),
            prompt: prompt.to_string(),
            response: response.clone(),
            message: message.map(str::to_string),
        };

        let mut index = self.index.write();
        if let Err(e) = self.store.append(title, &entry) {
            warn!("Failed to persist request log '{}': {}", title, e);
        }
        if message.is_none() {
            index
                .responses
                .entry(title.to_string())
                .or_default()
                .insert(request_key(prompt, model), entry.response);
        }
    }

    /// Record a failed response under the shared error title
    pub fn record_error(&self, model: &str, prompt: &str, response: &Value, message: &str) {
        self.record(ERROR_LOG_TITLE, model, prompt, response, Some(message));
    }

    /// Lookup statistics: hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };

        (hits, misses, hit_rate)
    }
}
