/*!
 * Completion client.
 *
 * Folds a prompt over an ordered list of backends: the first backend whose
 * answer parses and validates wins, every failure is logged and collected.
 * Retried prompts are padded with trailing spaces so they miss both the
 * request log and any server-side cache.
 */

use std::sync::Arc;

use log::{debug, error, warn};
use serde_json::Value;

use crate::errors::LlmError;
use crate::llm::CompletionService;
use crate::llm::request_log::RequestLog;
use crate::llm::schema::{ResponseSchema, parse_lenient};

/// Client over an ordered list of completion backends
#[derive(Debug, Clone)]
pub struct LlmClient {
    backends: Vec<Arc<dyn CompletionService>>,
    log: RequestLog,
    /// Default number of prompt attempts for `ask_with_retry`
    retry_count: usize,
}

impl LlmClient {
    pub fn new(backends: Vec<Arc<dyn CompletionService>>, log: RequestLog) -> Self {
        Self {
            backends,
            log,
            retry_count: 3,
        }
    }

    pub fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count.max(1);
        self
    }

    pub fn backends(&self) -> &[Arc<dyn CompletionService>] {
        &self.backends
    }

    pub fn request_log(&self) -> &RequestLog {
        &self.log
    }

    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    /// Ask every backend in order until one returns a valid response.
    ///
    /// With `use_history`, an earlier logged response for the same prompt and
    /// model is returned without calling the backend.
    pub async fn ask(&self, prompt: &str, schema: ResponseSchema, log_title: &str, use_history: bool) -> Result<Value, LlmError> {
        if self.backends.is_empty() {
            return Err(LlmError::NoBackends);
        }

        if use_history {
            for backend in &self.backends {
                if let Some(previous) = self.log.lookup(log_title, prompt, backend.model()) {
                    if schema.validate(&previous).is_ok() {
                        debug!("Reusing logged {} response from {}", schema.name(), backend.model());
                        return Ok(previous);
                    }
                }
            }
        }

        let mut failures = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            let outcome = self.ask_backend(backend.as_ref(), prompt, schema).await;
            match outcome {
                Ok(value) => {
                    self.log.record(log_title, backend.model(), prompt, &value, None);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("{} request to '{}' failed: {}", schema.name(), backend.name(), e);
                    failures.push(e.to_string());
                }
            }
        }

        error!("All {} backends failed for a {} request", self.backends.len(), schema.name());
        Err(LlmError::Exhausted(failures))
    }

    async fn ask_backend(&self, backend: &dyn CompletionService, prompt: &str, schema: ResponseSchema) -> Result<Value, LlmError> {
        let text = backend
            .complete(prompt, true)
            .await
            .map_err(|source| LlmError::Provider {
                backend: backend.name().to_string(),
                source,
            })?;

        let value = match parse_lenient(&text) {
            Ok(value) => value,
            Err(message) => {
                self.log.record_error(backend.model(), prompt, &Value::String(text), &message);
                return Err(LlmError::Unparsable {
                    backend: backend.name().to_string(),
                    message,
                });
            }
        };

        if let Err(violation) = schema.validate(&value) {
            self.log.record_error(backend.model(), prompt, &value, &violation.to_string());
            return Err(LlmError::Schema {
                backend: backend.name().to_string(),
                violation,
            });
        }

        Ok(value)
    }

    /// [`ask`](Self::ask) with the client's default number of attempts
    pub async fn ask_with_retry(&self, prompt: &str, schema: ResponseSchema, log_title: &str) -> Result<Value, LlmError> {
        self.ask_with_attempts(prompt, schema, log_title, self.retry_count).await
    }

    /// Retry a request with increasing prompt padding.
    ///
    /// Only the first attempt may be served from the request log.
    pub async fn ask_with_attempts(&self, prompt: &str, schema: ResponseSchema, log_title: &str, attempts: usize) -> Result<Value, LlmError> {
        let attempts = attempts.max(1);
        let mut failures = Vec::new();

        for attempt in 0..attempts {
            let padded = format!("{}{}", prompt, " ".repeat(attempt));
            match self.ask(&padded, schema, log_title, attempt == 0).await {
                Ok(value) => return Ok(value),
                Err(LlmError::NoBackends) => return Err(LlmError::NoBackends),
                Err(LlmError::Exhausted(errors)) => {
                    debug!("{} attempt {}/{} failed", schema.name(), attempt + 1, attempts);
                    failures.extend(errors.into_iter().map(|e| format!("attempt {}: {}", attempt + 1, e)));
                }
                Err(e) => failures.push(format!("attempt {}: {}", attempt + 1, e)),
            }
        }

        Err(LlmError::Exhausted(failures))
    }
}
