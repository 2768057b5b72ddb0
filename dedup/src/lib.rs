//! Slide-deck frame deduplication.
//!
//! Keyframes extracted from a lecture recording are walked in order; frames
//! that are near-identical to their successor, or filled by the presenter's
//! face, are dropped. The surviving frames form the slide deck.

pub mod cleanup;
pub mod engine;
pub mod extract;
pub mod filter;
pub mod interrupt;
pub mod manifest;
pub mod source;

pub use engine::{DedupError, DedupOutcome, Deduplicator, DropReason};
pub use filter::diff::difference_percent;
pub use filter::face::FaceHeuristic;
pub use filter::traits::{DetectorError, DetectorParams, FaceDetector};
pub use source::FrameSource;
