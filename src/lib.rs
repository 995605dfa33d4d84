//! Dance-move verification engine.
//!
//! Given a candidate submission's pose-landmark frames and the ordered
//! reference moves already accepted into a chain, the engine decides whether
//! the submission faithfully reproduces every prior move in order and appends
//! exactly one new move, and produces a confidence score gating acceptance.
//!
//! The pipeline: landmark frames -> [`PoseNormalizationService`] ->
//! normalized pose vectors -> [`SegmentAlignmentService`] (constrained
//! dynamic time warping) -> per-move [`SimilarityService`] scores ->
//! [`VerificationService`] policy decision -> [`ChainService`] commit.
//!
//! Landmark extraction from raw video, persistence, and the surrounding
//! platform (profiles, voting, feeds) are external collaborators.
//!
//! [`PoseNormalizationService`]: services::PoseNormalizationService
//! [`SegmentAlignmentService`]: services::SegmentAlignmentService
//! [`SimilarityService`]: services::SimilarityService
//! [`VerificationService`]: services::VerificationService
//! [`ChainService`]: services::ChainService

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::VerificationConfig;
pub use errors::VerificationError;
pub use models::{
    AlignmentWindow, ChainState, ChainStatus, Decision, Keypoint, LandmarkFrame, LandmarkIndex,
    NormalizedPose, PoseData, ReferenceMove, RejectionReason, VerificationResult,
};
pub use services::{ChainService, CommitOutcome, VerificationService};
pub use telemetry::{
    MetricsObserver, NoopObserver, TracingObserver, VerificationObserver, VerificationStage,
};
