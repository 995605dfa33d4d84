// Verification pipeline services

pub mod chain_service;
pub mod pose_normalization_service;
pub mod segment_alignment_service;
pub mod similarity_service;
pub mod verification_service;

pub use chain_service::{ChainService, CommitOutcome};
pub use pose_normalization_service::{InterpolationBuffer, PoseNormalizationService};
pub use segment_alignment_service::{Alignment, MoveAlignment, SegmentAlignmentService};
pub use similarity_service::SimilarityService;
pub use verification_service::VerificationService;
