use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use slide_deck_common::frame::Frame;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::filter::diff::{difference_percent, DimensionMismatch};
use crate::filter::face::FaceHeuristic;
use crate::filter::traits::DetectorError;

/// Why a frame ended up in the drop set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    /// A face filled enough of the frame to call it a presenter close-up.
    FaceDominated,
    /// The following frame differed from this one by at most the threshold.
    NearDuplicate { diff_percent: f64 },
}

/// KEEP/DROP partition of one pass, keyed by `sequence_index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// Surviving frames in extraction order.
    pub kept: Vec<usize>,
    /// Dropped frames with the first reason they were dropped for.
    pub dropped: BTreeMap<usize, DropReason>,
}

impl DedupOutcome {
    pub fn total(&self) -> usize {
        self.kept.len() + self.dropped.len()
    }

    pub fn is_dropped(&self, sequence_index: usize) -> bool {
        self.dropped.contains_key(&sequence_index)
    }

    pub fn face_drops(&self) -> usize {
        self.dropped
            .values()
            .filter(|r| matches!(r, DropReason::FaceDominated))
            .count()
    }

    pub fn duplicate_drops(&self) -> usize {
        self.dropped
            .values()
            .filter(|r| matches!(r, DropReason::NearDuplicate { .. }))
            .count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error("frame {index} is out of range; the frames folder holds {available} frames")]
    UnknownFrame { index: usize, available: usize },
    #[error("frame {index} ({}) could not be decoded: {source}", .path.display())]
    UnreadableFrame {
        index: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame {index} cannot be compared with reference frame {reference_index}: {source}")]
    DimensionMismatch {
        index: usize,
        reference_index: usize,
        #[source]
        source: DimensionMismatch,
    },
    #[error("face detection failed on frame {index}: {source}")]
    DetectorFailure {
        index: usize,
        #[source]
        source: DetectorError,
    },
    #[error("frame {index} arrived after frame {previous}; sequence indices must increase")]
    OutOfOrder { index: usize, previous: usize },
}

/// Rolling-reference duplicate remover.
///
/// Frames are walked once in order. Each non-face frame is compared with the
/// frame examined just before it (face-dominated frames excepted); when the
/// two are within `diff_threshold` percent, the *earlier* one is dropped, so
/// a run of near-identical frames collapses onto its last, most settled
/// frame.
pub struct Deduplicator {
    face: Option<FaceHeuristic>,
    diff_threshold: f64,
    progress: ProgressBar,
}

/// Accumulator threaded through the forward pass.
struct RollingPass<R> {
    /// Baseline for the next comparison. Face-dominated frames never replace it.
    reference: R,
    /// Identifier of the frame at the previous position, whatever its fate.
    previous: usize,
    seen: Vec<usize>,
    dropped: BTreeMap<usize, DropReason>,
}

impl<R> RollingPass<R> {
    fn drop_frame(&mut self, index: usize, reason: DropReason) {
        self.dropped.entry(index).or_insert(reason);
    }

    fn finish(self) -> DedupOutcome {
        let dropped = self.dropped;
        let kept = self
            .seen
            .into_iter()
            .filter(|index| !dropped.contains_key(index))
            .collect();
        DedupOutcome { kept, dropped }
    }
}

impl Deduplicator {
    /// Face detection is disabled until a heuristic is attached.
    pub fn new(diff_threshold: f64) -> Self {
        Self {
            face: None,
            diff_threshold,
            progress: ProgressBar::hidden(),
        }
    }

    /// Advance `progress` by one for every frame the pass consumes.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_face_heuristic(mut self, heuristic: FaceHeuristic) -> Self {
        self.face = Some(heuristic);
        self
    }

    pub fn face_detection_enabled(&self) -> bool {
        self.face.is_some()
    }

    pub fn diff_threshold(&self) -> f64 {
        self.diff_threshold
    }

    /// Deduplicate frames that are already in memory.
    ///
    /// Face checks run on the rayon pool ahead of the pass and are collected
    /// back in input order; the comparison pass itself is sequential.
    pub fn deduplicate(&self, frames: &[Frame]) -> Result<DedupOutcome, DedupError> {
        if frames.is_empty() {
            return Ok(DedupOutcome::default());
        }

        let face_flags: Vec<bool> = match &self.face {
            Some(heuristic) => frames
                .par_iter()
                .map(|frame| face_check(heuristic, frame))
                .collect::<Result<_, _>>()?,
            None => vec![false; frames.len()],
        };

        self.run(frames.iter().zip(face_flags).map(Ok))
    }

    /// Deduplicate frames produced lazily, holding at most the reference and
    /// the current frame in memory. The first error from the source aborts
    /// the pass.
    pub fn deduplicate_stream<I>(&self, frames: I) -> Result<DedupOutcome, DedupError>
    where
        I: IntoIterator<Item = Result<Frame, DedupError>>,
    {
        let analyzed = frames.into_iter().map(|item| -> Result<(Frame, bool), DedupError> {
            let frame = item?;
            let face_dominated = match &self.face {
                Some(heuristic) => face_check(heuristic, &frame)?,
                None => false,
            };
            Ok((frame, face_dominated))
        });
        self.run(analyzed)
    }

    fn run<R, I>(&self, mut frames: I) -> Result<DedupOutcome, DedupError>
    where
        R: Borrow<Frame>,
        I: Iterator<Item = Result<(R, bool), DedupError>>,
    {
        let (first, first_face) = match frames.next() {
            Some(item) => item?,
            None => return Ok(DedupOutcome::default()),
        };

        let first_index = Borrow::<Frame>::borrow(&first).sequence_index;
        let mut start = RollingPass {
            previous: first_index,
            seen: vec![first_index],
            dropped: BTreeMap::new(),
            // Stays the reference even when face-dominated; the next frame is
            // compared against it.
            reference: first,
        };
        if first_face {
            debug!(frame = first_index, "dropping face-dominated frame");
            start.drop_frame(first_index, DropReason::FaceDominated);
        }
        self.progress.inc(1);

        let pass = frames.try_fold(start, |pass, item| -> Result<_, DedupError> {
            let (frame, face_dominated) = item?;
            let pass = self.step(pass, frame, face_dominated)?;
            self.progress.inc(1);
            Ok(pass)
        })?;

        let outcome = pass.finish();
        info!(
            total = outcome.total(),
            kept = outcome.kept.len(),
            face_drops = outcome.face_drops(),
            duplicate_drops = outcome.duplicate_drops(),
            threshold = self.diff_threshold,
            "deduplication pass complete"
        );
        Ok(outcome)
    }

    fn step<R: Borrow<Frame>>(
        &self,
        mut pass: RollingPass<R>,
        frame: R,
        face_dominated: bool,
    ) -> Result<RollingPass<R>, DedupError> {
        let current: &Frame = frame.borrow();
        let index = current.sequence_index;
        if index <= pass.previous {
            return Err(DedupError::OutOfOrder {
                index,
                previous: pass.previous,
            });
        }
        let previous = std::mem::replace(&mut pass.previous, index);
        pass.seen.push(index);

        if face_dominated {
            debug!(frame = index, "dropping face-dominated frame");
            pass.drop_frame(index, DropReason::FaceDominated);
            return Ok(pass);
        }

        let reference: &Frame = pass.reference.borrow();
        let diff_percent = difference_percent(&current.image, &reference.image).map_err(|source| {
            DedupError::DimensionMismatch {
                index,
                reference_index: reference.sequence_index,
                source,
            }
        })?;

        let duplicate = diff_percent <= self.diff_threshold;
        debug!(
            frame = index,
            reference = reference.sequence_index,
            diff = format!("{:.3}", diff_percent),
            threshold = self.diff_threshold,
            duplicate,
            "frame comparison"
        );
        if duplicate {
            pass.drop_frame(previous, DropReason::NearDuplicate { diff_percent });
        }

        pass.reference = frame;
        Ok(pass)
    }
}

fn face_check(heuristic: &FaceHeuristic, frame: &Frame) -> Result<bool, DedupError> {
    heuristic
        .is_face_dominated(frame)
        .map_err(|source| DedupError::DetectorFailure {
            index: frame.sequence_index,
            source,
        })
}
