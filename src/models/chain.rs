use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::normalized_pose::NormalizedPose;

/// Default number of moves a chain accepts before completing.
pub const DEFAULT_MAX_MOVES: u32 = 10;

/// The canonical, previously-accepted performance of one move in a chain.
///
/// Owned by the chain; created when a submission is accepted and committed,
/// never mutated or reordered afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMove {
    pub id: Uuid,
    /// Position in the chain (1, 2, 3, ...).
    pub move_number: u32,
    pub frames: Vec<NormalizedPose>,
    /// Verification score the move was accepted with (0-1).
    pub verification_score: f64,
    pub duration_seconds: f64,
    pub accepted_at: DateTime<Utc>,
}

impl ReferenceMove {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Active,
    Completed,
}

/// Ordered, append-only chain state.
///
/// Mutated only through `ChainService::commit`; the verification subsystem
/// reads reference moves from a snapshot and never writes here directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainState {
    pub id: Uuid,
    pub status: ChainStatus,
    pub max_moves: u32,
    pub moves: Vec<ReferenceMove>,
    /// Incremented on every committed move; used for the optimistic
    /// concurrency check at commit time.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl ChainState {
    pub fn move_count(&self) -> u32 {
        self.moves.len() as u32
    }

    pub fn is_active(&self) -> bool {
        self.status == ChainStatus::Active
    }

    pub fn is_full(&self) -> bool {
        self.move_count() >= self.max_moves
    }

    /// Version to carry through a verification attempt and present back at
    /// commit time.
    pub fn snapshot_version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_status_serde_shape() {
        assert_eq!(
            serde_json::to_string(&ChainStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&ChainStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
