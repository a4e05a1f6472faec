/*!
 * Error types for the cuealign engine.
 *
 * This module contains custom error types for the different parts of the engine,
 * using the thiserror crate for ergonomic error definitions. Recoverable failures
 * (a single unmatched sentence, a malformed completion) are expressed as values so
 * callers can degrade one unit of work without failing the batch.
 */

use thiserror::Error;

/// Errors that can occur when talking to a text-completion backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// A structured response that does not satisfy the schema expected by its caller
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{schema} response rejected: {reason}")]
pub struct SchemaViolation {
    /// Name of the schema that rejected the response
    pub schema: &'static str,
    /// Human-readable reason
    pub reason: String,
}

impl SchemaViolation {
    pub fn new(schema: &'static str, reason: impl Into<String>) -> Self {
        Self {
            schema,
            reason: reason.into(),
        }
    }
}

/// Errors produced by the completion client
#[derive(Error, Debug)]
pub enum LlmError {
    /// The transport failed for one backend
    #[error("backend '{backend}' failed: {source}")]
    Provider {
        backend: String,
        #[source]
        source: ProviderError,
    },

    /// The backend answered but the body was not usable JSON
    #[error("backend '{backend}' returned unparsable output: {message}")]
    Unparsable { backend: String, message: String },

    /// The backend answered with JSON that failed validation
    #[error("backend '{backend}': {violation}")]
    Schema {
        backend: String,
        violation: SchemaViolation,
    },

    /// Every configured backend failed; carries one line per attempt
    #[error("all backends exhausted: {}", .0.join("; "))]
    Exhausted(Vec<String>),

    /// No backend is configured at all
    #[error("no completion backend configured")]
    NoBackends,
}

/// Errors raised by the timestamp aligner
#[derive(Error, Debug)]
pub enum AlignError {
    /// A sentence could not be located in the word stream (strict mode only)
    #[error("sentence {index} could not be aligned (best score {score:.2}): {sentence}")]
    Unmatched {
        index: usize,
        sentence: String,
        score: f64,
    },

    /// There are sentences to align but no words to align them to
    #[error("word transcript is empty")]
    EmptyTranscript,
}

/// Errors raised while splitting or trimming a single unit of text
#[derive(Error, Debug)]
pub enum SplitError {
    /// The completion service failed for this unit
    #[error("completion failed: {0}")]
    Llm(#[from] LlmError),

    /// The returned split could not be mapped back onto the original sentence
    #[error("no usable split point found in: {0}")]
    NoSplitPoint(String),
}
