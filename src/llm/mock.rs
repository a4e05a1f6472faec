/*!
 * Mock completion backend for testing.
 *
 * - `MockService::working()` - answers with a custom generator or scripted replies
 * - `MockService::intermittent(n)` - fails every nth request
 * - `MockService::failing()` - always fails with an error
 * - `MockService::garbage()` - answers with text that is not JSON
 * - `MockService::empty()` - answers with an empty body
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::llm::CompletionService;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always answers
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Answers with prose instead of JSON
    Garbage,
    /// Returns an empty response
    Empty,
}

/// Scripted completion backend
#[derive(Debug)]
pub struct MockService {
    name: String,
    model: String,
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Replies handed out in order before falling back to the generator
    script: Arc<Mutex<VecDeque<String>>>,
    /// Every prompt received, in order
    prompts: Arc<Mutex<Vec<String>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

impl MockService {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn garbage() -> Self {
        Self::new(MockBehavior::Garbage)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Rename the backend and its model
    pub fn named(mut self, name: &str, model: &str) -> Self {
        self.name = name.to_string();
        self.model = model.to_string();
        self
    }

    /// Queue replies returned one per request, in order
    pub fn with_script<S: Into<String>>(self, replies: impl IntoIterator<Item = S>) -> Self {
        self.script.lock().extend(replies.into_iter().map(Into::into));
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn answer(&self, prompt: &str) -> String {
        if let Some(reply) = self.script.lock().pop_front() {
            return reply;
        }
        match self.custom_response {
            Some(generator) => generator(prompt),
            None => "{}".to_string(),
        }
    }
}

impl Clone for MockService {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            model: self.model.clone(),
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            script: Arc::clone(&self.script),
            prompts: Arc::clone(&self.prompts),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl CompletionService for MockService {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_json(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str, _want_json: bool) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        match self.behavior {
            MockBehavior::Working => Ok(self.answer(prompt)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.answer(prompt))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Garbage => Ok("I'm sorry, I can't help with that.".to_string()),

            MockBehavior::Empty => Ok(String::new()),
        }
    }
}
