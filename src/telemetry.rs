use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::models::{Decision, RejectionReason};

/// Pipeline stages reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStage {
    Normalization,
    Alignment,
    Scoring,
}

impl VerificationStage {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationStage::Normalization => "normalization",
            VerificationStage::Alignment => "alignment",
            VerificationStage::Scoring => "scoring",
        }
    }
}

/// Structured events emitted by the verification pipeline.
///
/// Observers are optional; the pipeline's correctness never depends on one
/// being attached. Implementations must tolerate concurrent calls from
/// independent verification attempts.
pub trait VerificationObserver: Send + Sync {
    fn attempt_started(&self, reference_moves: usize, candidate_frames: usize) {
        let _ = (reference_moves, candidate_frames);
    }

    fn stage_completed(&self, stage: VerificationStage, elapsed: Duration) {
        let _ = (stage, elapsed);
    }

    fn decision_reached(&self, decision: &Decision, aggregate_score: f64) {
        let _ = (decision, aggregate_score);
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone)]
pub struct NoopObserver;

impl VerificationObserver for NoopObserver {}

/// Observer that forwards events to the `tracing` subscriber.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl VerificationObserver for TracingObserver {
    fn attempt_started(&self, reference_moves: usize, candidate_frames: usize) {
        info!(
            "Verification attempt started: {} reference moves, {} candidate frames",
            reference_moves, candidate_frames
        );
    }

    fn stage_completed(&self, stage: VerificationStage, elapsed: Duration) {
        debug!("Stage {} completed in {:?}", stage.name(), elapsed);
    }

    fn decision_reached(&self, decision: &Decision, aggregate_score: f64) {
        match decision {
            Decision::Accepted => {
                info!("Submission accepted with score {:.3}", aggregate_score)
            }
            Decision::Rejected(reason) => {
                info!("Submission rejected: {:?}", reason)
            }
        }
    }
}

/// Aggregated counters and stage timings over all observed attempts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationMetrics {
    pub attempts: u64,
    pub accepted: u64,
    pub rejected: HashMap<String, u64>,
    pub stage_total_ms: HashMap<String, u64>,
    pub total_score: f64,
}

impl VerificationMetrics {
    pub fn average_accepted_score(&self) -> f64 {
        if self.accepted == 0 {
            0.0
        } else {
            self.total_score / self.accepted as f64
        }
    }
}

/// Observer that aggregates counters and per-stage timings, for dashboards
/// and health endpoints owned by the caller.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    metrics: Mutex<VerificationMetrics>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> VerificationMetrics {
        self.metrics.lock().expect("metrics lock poisoned").clone()
    }
}

impl VerificationObserver for MetricsObserver {
    fn attempt_started(&self, _reference_moves: usize, _candidate_frames: usize) {
        let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
        metrics.attempts += 1;
    }

    fn stage_completed(&self, stage: VerificationStage, elapsed: Duration) {
        let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
        *metrics
            .stage_total_ms
            .entry(stage.name().to_string())
            .or_insert(0) += elapsed.as_millis() as u64;
    }

    fn decision_reached(&self, decision: &Decision, aggregate_score: f64) {
        let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
        match decision {
            Decision::Accepted => {
                metrics.accepted += 1;
                metrics.total_score += aggregate_score;
            }
            Decision::Rejected(reason) => {
                *metrics.rejected.entry(reason_key(reason)).or_insert(0) += 1;
            }
        }
    }
}

fn reason_key(reason: &RejectionReason) -> String {
    match reason {
        RejectionReason::InsufficientLandmarks => "insufficient_landmarks",
        RejectionReason::SequenceTooLong => "sequence_too_long",
        RejectionReason::SequenceOutOfOrder => "sequence_out_of_order",
        RejectionReason::IncompletePriorMoves => "incomplete_prior_moves",
        RejectionReason::NoNewMoveDetected => "no_new_move_detected",
    }
    .to_string()
}
