use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::VerificationConfig;
use crate::errors::VerificationError;
use crate::models::{
    Decision, LandmarkFrame, NormalizedPose, ReferenceMove, RejectionReason, VerificationResult,
};
use crate::services::pose_normalization_service::PoseNormalizationService;
use crate::services::segment_alignment_service::{Alignment, SegmentAlignmentService};
use crate::services::similarity_service::SimilarityService;
use crate::telemetry::{NoopObserver, VerificationObserver, VerificationStage};

/// The verification engine's single logical operation: decide whether a
/// candidate submission reproduces every prior move of a chain in order and
/// appends exactly one new move.
///
/// Each call is a self-contained, deterministic computation over the
/// candidate and an immutable snapshot of the chain's reference moves; the
/// service holds only configuration and is cheap to clone across workers.
/// Data-quality and policy failures come back as `Decision::Rejected` inside
/// the result; only cancellation, worker faults and malformed input surface
/// as errors.
#[derive(Clone)]
pub struct VerificationService {
    config: VerificationConfig,
    normalizer: PoseNormalizationService,
    aligner: SegmentAlignmentService,
    scorer: SimilarityService,
    observer: Arc<dyn VerificationObserver>,
}

impl VerificationService {
    pub fn new(config: VerificationConfig) -> Result<Self, VerificationError> {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        config: VerificationConfig,
        observer: Arc<dyn VerificationObserver>,
    ) -> Result<Self, VerificationError> {
        config.validate()?;
        Ok(Self {
            normalizer: PoseNormalizationService::new(config.clone())?,
            aligner: SegmentAlignmentService::new(config.clone())?,
            scorer: SimilarityService::new(config.clone())?,
            config,
            observer,
        })
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Verify a submission against the chain's reference moves.
    pub fn verify_submission(
        &self,
        reference_moves: &[ReferenceMove],
        candidate_frames: &[LandmarkFrame],
    ) -> Result<VerificationResult, VerificationError> {
        self.verify_submission_cancellable(
            reference_moves,
            candidate_frames,
            &CancellationToken::new(),
        )
    }

    /// Verify with an external cancellation token threaded through the
    /// alignment search, so oversized computations can be abandoned.
    pub fn verify_submission_cancellable(
        &self,
        reference_moves: &[ReferenceMove],
        candidate_frames: &[LandmarkFrame],
        cancel: &CancellationToken,
    ) -> Result<VerificationResult, VerificationError> {
        self.observer
            .attempt_started(reference_moves.len(), candidate_frames.len());

        if candidate_frames.len() > self.config.max_candidate_frames {
            warn!(
                "Candidate of {} frames exceeds the {}-frame cap",
                candidate_frames.len(),
                self.config.max_candidate_frames
            );
            return self.finish(VerificationResult::rejected(RejectionReason::SequenceTooLong));
        }

        let candidate = match self.normalize_stage(candidate_frames)? {
            Ok(candidate) => candidate,
            Err(result) => return self.finish(result),
        };

        let alignment = match self.align_stage(reference_moves, &candidate, cancel)? {
            Ok(alignment) => alignment,
            Err(result) => return self.finish(result),
        };

        // No ordered assignment that plausibly contains the reference
        // sequence: reject before scoring individual moves.
        if !reference_moves.is_empty()
            && (!alignment.mean_path_cost.is_finite()
                || alignment.mean_path_cost > self.config.max_mean_path_cost)
        {
            let mut result = VerificationResult::rejected(RejectionReason::SequenceOutOfOrder);
            result.diagnostics = alignment.windows();
            return self.finish(result);
        }

        let per_move_scores = self.score_stage(reference_moves, &candidate, &alignment);

        let aggregate_score = if per_move_scores.is_empty() {
            1.0
        } else {
            per_move_scores.iter().sum::<f64>() / per_move_scores.len() as f64
        };

        if let Some(worst) = per_move_scores
            .iter()
            .copied()
            .find(|score| *score < self.config.per_move_threshold)
        {
            info!(
                "Prior move below threshold: {:.3} < {:.3}",
                worst, self.config.per_move_threshold
            );
            let result = VerificationResult {
                decision: Decision::Rejected(RejectionReason::IncompletePriorMoves),
                aggregate_score,
                per_move_scores,
                new_move_frames: None,
                diagnostics: alignment.windows(),
            };
            return self.finish(result);
        }

        let tail = &candidate[alignment.matched_end.min(candidate.len())..];
        if tail.len() < self.config.min_new_move_frames {
            info!(
                "Unmatched tail of {} frames is below the {}-frame minimum for a new move",
                tail.len(),
                self.config.min_new_move_frames
            );
            let result = VerificationResult {
                decision: Decision::Rejected(RejectionReason::NoNewMoveDetected),
                aggregate_score,
                per_move_scores,
                new_move_frames: None,
                diagnostics: alignment.windows(),
            };
            return self.finish(result);
        }

        let result = VerificationResult {
            decision: Decision::Accepted,
            aggregate_score,
            per_move_scores,
            new_move_frames: Some(tail.to_vec()),
            diagnostics: alignment.windows(),
        };
        self.finish(result)
    }

    /// Verify on a blocking worker with a deadline. On timeout the alignment
    /// loop is cancelled and `Cancelled` is returned; the caller may retry
    /// with a shorter clip, the computation itself is deterministic.
    pub async fn verify_submission_with_timeout(
        &self,
        reference_moves: Vec<ReferenceMove>,
        candidate_frames: Vec<LandmarkFrame>,
        timeout: Duration,
    ) -> Result<VerificationResult, VerificationError> {
        let service = self.clone();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            service.verify_submission_cancellable(
                &reference_moves,
                &candidate_frames,
                &worker_cancel,
            )
        });

        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => joined.map_err(|e| VerificationError::WorkerFailure(e.to_string()))?,
            Err(_) => {
                cancel.cancel();
                warn!("Verification exceeded its {:?} deadline and was cancelled", timeout);
                Err(VerificationError::Cancelled)
            }
        }
    }

    /// Outer `Result` is a hard error; inner `Err` is a data-quality
    /// rejection to return to the caller.
    #[allow(clippy::type_complexity)]
    fn normalize_stage(
        &self,
        candidate_frames: &[LandmarkFrame],
    ) -> Result<Result<Vec<NormalizedPose>, VerificationResult>, VerificationError> {
        let started = Instant::now();
        let outcome = match self.normalizer.normalize_sequence(candidate_frames) {
            Ok(candidate) => Ok(candidate),
            Err(VerificationError::InsufficientLandmarks {
                frame_index,
                missing,
                total,
                ..
            }) => {
                warn!(
                    "Submission rejected: frame {} unusable ({} of {} keypoints missing)",
                    frame_index, missing, total
                );
                Err(VerificationResult::rejected(
                    RejectionReason::InsufficientLandmarks,
                ))
            }
            Err(other) => return Err(other),
        };
        self.observer
            .stage_completed(VerificationStage::Normalization, started.elapsed());
        Ok(outcome)
    }

    #[allow(clippy::type_complexity)]
    fn align_stage(
        &self,
        reference_moves: &[ReferenceMove],
        candidate: &[NormalizedPose],
        cancel: &CancellationToken,
    ) -> Result<Result<Alignment, VerificationResult>, VerificationError> {
        let started = Instant::now();
        let outcome = match self.aligner.align(reference_moves, candidate, cancel) {
            Ok(alignment) => Ok(alignment),
            Err(VerificationError::SequenceTooLong {
                reference_frames,
                candidate_frames,
                budget,
            }) => {
                warn!(
                    "Submission rejected: {}x{} alignment exceeds budget {}",
                    reference_frames, candidate_frames, budget
                );
                Err(VerificationResult::rejected(RejectionReason::SequenceTooLong))
            }
            Err(other) => return Err(other),
        };
        self.observer
            .stage_completed(VerificationStage::Alignment, started.elapsed());
        Ok(outcome)
    }

    fn score_stage(
        &self,
        reference_moves: &[ReferenceMove],
        candidate: &[NormalizedPose],
        alignment: &Alignment,
    ) -> Vec<f64> {
        let started = Instant::now();
        let scores = reference_moves
            .iter()
            .zip(alignment.per_move.iter())
            .map(|(reference, aligned)| {
                self.scorer
                    .score_move(&reference.frames, candidate, &aligned.pairs)
            })
            .collect();
        self.observer
            .stage_completed(VerificationStage::Scoring, started.elapsed());
        scores
    }

    fn finish(
        &self,
        result: VerificationResult,
    ) -> Result<VerificationResult, VerificationError> {
        self.observer
            .decision_reached(&result.decision, result.aggregate_score);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_wrapper_returns_the_policy_result() {
        let service = VerificationService::new(VerificationConfig::default()).unwrap();

        // An empty submission flows through every stage and is rejected by
        // policy rather than erroring.
        let result = tokio_test::block_on(service.verify_submission_with_timeout(
            Vec::new(),
            Vec::new(),
            Duration::from_secs(5),
        ))
        .unwrap();

        assert_eq!(
            result.decision,
            Decision::Rejected(RejectionReason::NoNewMoveDetected)
        );
        assert!(result.per_move_scores.is_empty());
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let config = VerificationConfig {
            per_move_threshold: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            VerificationService::new(config),
            Err(VerificationError::InvalidConfig(_))
        ));
    }
}
