use serde::{Deserialize, Serialize};

use crate::models::normalized_pose::NormalizedPose;

/// A contiguous candidate sub-range [start, end) hypothesized to correspond
/// to one reference move, with the mean warping-path cost over that range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentWindow {
    /// 1-based number of the reference move this window was matched to.
    pub move_number: u32,
    pub start: usize,
    pub end: usize,
    pub mean_cost: f64,
}

impl AlignmentWindow {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Why a submission was rejected. Every variant is recoverable by the user
/// resubmitting; the UI layer maps these to actionable messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Landmark quality too low to normalize the submission.
    InsufficientLandmarks,
    /// Reference x candidate size exceeds the configured compute budget.
    SequenceTooLong,
    /// No ordered assignment of the prior moves exists in the candidate.
    SequenceOutOfOrder,
    /// At least one prior move was not reproduced accurately enough.
    IncompletePriorMoves,
    /// The unmatched tail is too short to count as a new move.
    NoNewMoveDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected(RejectionReason),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }
}

/// Outcome of one verification attempt.
///
/// Created once per submission and not persisted; on acceptance the caller
/// commits `new_move_frames` as the chain's next reference move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub decision: Decision,
    /// Overall score in [0, 1]; mean of the per-move scores, 1.0 for the
    /// first move of a chain.
    pub aggregate_score: f64,
    /// One score per existing reference move, in chain order.
    pub per_move_scores: Vec<f64>,
    /// Normalized frames of the proposed new move when accepted.
    pub new_move_frames: Option<Vec<NormalizedPose>>,
    /// The alignment windows used, for diagnostics.
    pub diagnostics: Vec<AlignmentWindow>,
}

impl VerificationResult {
    pub fn rejected(reason: RejectionReason) -> Self {
        Self {
            decision: Decision::Rejected(reason),
            aggregate_score: 0.0,
            per_move_scores: Vec::new(),
            new_move_frames: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.decision.is_accepted()
    }
}
