/*!
 * # cuealign - sentence-to-timestamp alignment and subtitle segmentation
 *
 * Turns a word-level transcript and a list of sentences into time-accurate,
 * readable subtitle cues and speech-synthesis task lists.
 *
 * ## Features
 *
 * - Exact and fuzzy alignment of sentences to word timestamps
 * - Overlap clamping and gap bridging between cues
 * - Meaning-preserving sentence splitting with a text-completion service
 * - Splitting of over-long subtitle lines with translation re-alignment
 * - Duration trimming of translations for speech synthesis
 * - Two-step translation of missing lines
 * - Request log with memoization of completion calls
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `text`: Length metrics, normalization, tokenization and sequence matching
 * - `subtitle`: Data model, aligner, post-processing and SRT/task rendering
 * - `splitter`: Sentence splitting, subtitle-line splitting and trimming
 * - `llm`: Completion services, response schemas, request log and client
 * - `translator`: Faithful then expressive translation of lines
 * - `pipeline`: End-to-end display and audio paths
 * - `concurrency`: Bounded, order-preserving worker pool
 * - `file_utils`: File system operations and input loading
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(non_snake_case)]

// Public modules
pub mod app_config;
pub mod concurrency;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod llm;
pub mod pipeline;
pub mod splitter;
pub mod subtitle;
pub mod text;
pub mod translator;

// Re-export main types for easier usage
pub use app_config::Config;
pub use pipeline::{Pipeline, PipelineReport};
pub use subtitle::{Aligner, AlignmentReport, AudioTask, Cue, Sentence, Word};
