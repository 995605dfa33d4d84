use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the verification subsystem.
///
/// Data-quality and policy failures that a resubmission can fix are surfaced
/// as `Decision::Rejected` inside a `VerificationResult`; the variants here
/// cover malformed input, exhausted compute budgets, commit races, and
/// configuration that fails validation at construction time.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("frame {frame_index}: {missing} of {total} keypoints below confidence {threshold}")]
    InsufficientLandmarks {
        frame_index: usize,
        missing: usize,
        total: usize,
        threshold: f64,
    },
    #[error("pose frame has {found} values, expected {expected}")]
    MalformedPoseData { expected: usize, found: usize },
    #[error(
        "sequence too long: {reference_frames} reference x {candidate_frames} candidate frames exceeds budget {budget}"
    )]
    SequenceTooLong {
        reference_frames: usize,
        candidate_frames: usize,
        budget: usize,
    },
    #[error("verification cancelled")]
    Cancelled,
    #[error("verification worker failed: {0}")]
    WorkerFailure(String),
    #[error("chain {chain_id} was modified concurrently (expected version {expected}, found {found})")]
    ConcurrentModification {
        chain_id: Uuid,
        expected: u64,
        found: u64,
    },
    #[error("chain {chain_id} is not active")]
    ChainNotActive { chain_id: Uuid },
    #[error("chain {chain_id} has reached its maximum of {max_moves} moves")]
    ChainFull { chain_id: Uuid, max_moves: u32 },
    #[error("accepted result carries no new move frames")]
    MissingNewMove,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
