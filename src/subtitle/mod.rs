/*!
 * Subtitle data, alignment, post-processing and rendering.
 */

pub mod aligner;
pub mod model;
pub mod postprocess;
pub mod render;

pub use aligner::{AlignOptions, AlignStrategy, Aligner, AlignmentReport, Located, TimingPolicy, UnmatchedSentence};
pub use model::{AudioTask, Cue, Sentence, Word};
pub use postprocess::{PostProcessOutcome, PostProcessor};
pub use render::SubtitleVariant;
