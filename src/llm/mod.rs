/*!
 * Text-completion layer.
 *
 * - `CompletionService`: the transport seam, one implementation per backend
 * - `openai`: OpenAI-compatible chat-completions backend
 * - `mock`: scripted backend for tests
 * - `schema`: structured response validation
 * - `request_log`: per-title request log with memoization
 * - `client`: ordered backend fallback with retries
 * - `prompts`: prompt templates
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A backend that turns a prompt into raw completion text
///
/// Implementations only deal with transport. Parsing and validation of the
/// returned text happen in [`client::LlmClient`].
#[async_trait]
pub trait CompletionService: Send + Sync + Debug {
    /// Name used in logs and error reports
    fn name(&self) -> &str;

    /// Model identifier, part of the memoization key
    fn model(&self) -> &str;

    /// Whether the backend can be asked for a JSON object directly
    fn supports_json(&self) -> bool;

    /// Complete a prompt
    ///
    /// # Arguments
    /// * `prompt` - The full prompt text
    /// * `want_json` - Ask for a JSON object response when supported
    async fn complete(&self, prompt: &str, want_json: bool) -> Result<String, ProviderError>;
}

pub mod client;
pub mod mock;
pub mod openai;
pub mod prompts;
pub mod request_log;
pub mod schema;

pub use client::LlmClient;
pub use mock::{MockBehavior, MockService};
pub use openai::OpenAiCompatible;
pub use request_log::{JsonDirStore, LogStore, MemoryStore, RequestLog};
pub use schema::ResponseSchema;
