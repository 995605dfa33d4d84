use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::VerificationError;
use crate::models::{
    ChainState, ChainStatus, Decision, ReferenceMove, RejectionReason, VerificationResult,
};

/// What happened when a verification result was applied to a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed { move_number: u32, completed: bool },
    NotCommitted { reason: RejectionReason },
}

/// Applies verification decisions to chain state.
///
/// A thin wrapper over the verification subsystem's output: it never
/// re-derives scores, it only appends the new reference move on acceptance
/// and transitions the chain to completed when full. The optimistic version
/// check serializes commits per chain: a commit racing a concurrent
/// submission fails with `ConcurrentModification` and the caller re-verifies
/// against the fresh state.
#[derive(Debug, Clone, Default)]
pub struct ChainService;

impl ChainService {
    pub fn new() -> Self {
        Self
    }

    pub fn create_chain(&self, max_moves: u32) -> Result<ChainState, VerificationError> {
        if max_moves == 0 {
            return Err(VerificationError::InvalidConfig(
                "max_moves must be positive".to_string(),
            ));
        }
        Ok(ChainState {
            id: Uuid::new_v4(),
            status: ChainStatus::Active,
            max_moves,
            moves: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        })
    }

    /// Apply a verification result taken against `snapshot_version`.
    ///
    /// On `Accepted`, the new move is appended and the chain version bumps;
    /// on `Rejected`, nothing mutates and the reason is surfaced.
    pub fn commit(
        &self,
        chain: &mut ChainState,
        snapshot_version: u64,
        result: &VerificationResult,
        duration_seconds: f64,
    ) -> Result<CommitOutcome, VerificationError> {
        if chain.version != snapshot_version {
            return Err(VerificationError::ConcurrentModification {
                chain_id: chain.id,
                expected: snapshot_version,
                found: chain.version,
            });
        }
        if !chain.is_active() {
            return Err(VerificationError::ChainNotActive { chain_id: chain.id });
        }
        if chain.is_full() {
            return Err(VerificationError::ChainFull {
                chain_id: chain.id,
                max_moves: chain.max_moves,
            });
        }

        let reason = match result.decision {
            Decision::Accepted => None,
            Decision::Rejected(reason) => Some(reason),
        };
        if let Some(reason) = reason {
            debug!("Chain {}: submission not committed ({:?})", chain.id, reason);
            return Ok(CommitOutcome::NotCommitted { reason });
        }

        let frames = result
            .new_move_frames
            .clone()
            .ok_or(VerificationError::MissingNewMove)?;

        let move_number = chain.move_count() + 1;
        chain.moves.push(ReferenceMove {
            id: Uuid::new_v4(),
            move_number,
            frames,
            verification_score: result.aggregate_score,
            duration_seconds,
            accepted_at: Utc::now(),
        });
        chain.version += 1;

        let completed = chain.is_full();
        if completed {
            chain.status = ChainStatus::Completed;
            info!(
                "Chain {} completed with {} moves",
                chain.id, chain.max_moves
            );
        } else {
            info!(
                "Chain {}: move {} committed (score {:.3})",
                chain.id, move_number, result.aggregate_score
            );
        }

        Ok(CommitOutcome::Committed {
            move_number,
            completed,
        })
    }
}
