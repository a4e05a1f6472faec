/*!
 * Segment splitting.
 *
 * - `sentence`: meaning-preserving sentence splits and split offset recovery
 * - `subtitle`: splitting of over-long cues with translation re-alignment
 * - `trim`: shortening translations so they can be spoken within a cue
 */

pub mod sentence;
pub mod subtitle;
pub mod trim;

pub use sentence::{MeaningSplitOutcome, SentenceSplitter, find_split_positions, insert_breaks};
pub use subtitle::{SubtitleSplitOutcome, SubtitleSplitter};
pub use trim::{TrimOutcome, TrimmedText, Trimmer};
