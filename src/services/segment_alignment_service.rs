use ndarray::Array2;
use ndarray_stats::QuantileExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::VerificationConfig;
use crate::errors::VerificationError;
use crate::models::{AlignmentWindow, NormalizedPose, ReferenceMove};
use crate::services::similarity_service::SimilarityService;

/// One reference move's share of the warping path: the candidate window it
/// was matched to and the (reference-local, candidate) frame pairs inside it.
#[derive(Debug, Clone)]
pub struct MoveAlignment {
    pub window: AlignmentWindow,
    pub pairs: Vec<(usize, usize)>,
}

/// Full alignment of a candidate against a chain's reference sequence.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub per_move: Vec<MoveAlignment>,
    /// Mean local cost along the whole warping path; the policy's sanity
    /// bound for out-of-order or missing-move submissions.
    pub mean_path_cost: f64,
    /// First candidate index after the last matched frame: the start of the
    /// proposed new move.
    pub matched_end: usize,
}

impl Alignment {
    /// Alignment of an empty chain: nothing to match, the whole candidate is
    /// the proposed new move.
    fn empty() -> Self {
        Self {
            per_move: Vec::new(),
            mean_path_cost: 0.0,
            matched_end: 0,
        }
    }

    /// No assignment exists at all (e.g. an empty candidate against a
    /// non-empty chain).
    fn unalignable() -> Self {
        Self {
            per_move: Vec::new(),
            mean_path_cost: f64::INFINITY,
            matched_end: 0,
        }
    }

    pub fn windows(&self) -> Vec<AlignmentWindow> {
        self.per_move.iter().map(|m| m.window).collect()
    }
}

/// Locates, inside a candidate sequence, the sub-ranges that best correspond
/// to each reference move of the chain, in order.
///
/// Implemented as a subsequence dynamic-time-warping search: the concatenated
/// reference sequence is warped onto the candidate with free head and tail on
/// the candidate axis, so setup and lead-out frames cost nothing. Move
/// boundaries in the concatenation map through the warping path to candidate
/// indices, yielding one non-overlapping window per reference move.
#[derive(Clone)]
pub struct SegmentAlignmentService {
    config: VerificationConfig,
    similarity: SimilarityService,
}

impl SegmentAlignmentService {
    pub fn new(config: VerificationConfig) -> Result<Self, VerificationError> {
        config.validate()?;
        let similarity = SimilarityService::new(config.clone())?;
        Ok(Self { config, similarity })
    }

    pub fn align(
        &self,
        reference_moves: &[ReferenceMove],
        candidate: &[NormalizedPose],
        cancel: &CancellationToken,
    ) -> Result<Alignment, VerificationError> {
        let refs: Vec<&NormalizedPose> = reference_moves
            .iter()
            .flat_map(|m| m.frames.iter())
            .collect();
        let r = refs.len();
        let c = candidate.len();

        if r == 0 {
            return Ok(Alignment::empty());
        }
        if c == 0 {
            return Ok(Alignment::unalignable());
        }
        if r.saturating_mul(c) > self.config.max_sequence_cost_budget {
            return Err(VerificationError::SequenceTooLong {
                reference_frames: r,
                candidate_frames: c,
                budget: self.config.max_sequence_cost_budget,
            });
        }

        let d = self.cost_matrix(&refs, candidate, cancel)?;

        // Free tail: the path may end at any candidate column.
        let j_star = d
            .row(r)
            .argmin()
            .map_err(|_| VerificationError::WorkerFailure("degenerate cost matrix".to_string()))?;

        let pairs = backtrack(&d, r, j_star);

        let total_cost: f64 = pairs
            .iter()
            .map(|&(ref_idx, cand_idx)| self.similarity.frame_cost(refs[ref_idx], &candidate[cand_idx]))
            .sum();
        let mean_path_cost = total_cost / pairs.len() as f64;

        let per_move = self.split_by_move(reference_moves, candidate, &pairs);
        let matched_end = pairs.last().map(|&(_, cand_idx)| cand_idx + 1).unwrap_or(0);

        debug!(
            "Aligned {} reference frames onto {} candidate frames: mean path cost {:.4}, matched end {}",
            r, c, mean_path_cost, matched_end
        );

        Ok(Alignment {
            per_move,
            mean_path_cost,
            matched_end,
        })
    }

    /// Accumulated-cost matrix with a free start on the candidate axis.
    ///
    /// The cancellation token is checked once per reference row so an
    /// oversized computation can be abandoned promptly.
    fn cost_matrix(
        &self,
        refs: &[&NormalizedPose],
        candidate: &[NormalizedPose],
        cancel: &CancellationToken,
    ) -> Result<Array2<f64>, VerificationError> {
        let r = refs.len();
        let c = candidate.len();

        let mut d = Array2::<f64>::from_elem((r + 1, c + 1), f64::INFINITY);
        for j in 0..=c {
            d[[0, j]] = 0.0;
        }

        for i in 1..=r {
            if cancel.is_cancelled() {
                return Err(VerificationError::Cancelled);
            }
            for j in 1..=c {
                let cost = self.similarity.frame_cost(refs[i - 1], &candidate[j - 1]);
                let best = d[[i - 1, j - 1]].min(d[[i - 1, j]]).min(d[[i, j - 1]]);
                d[[i, j]] = cost + best;
            }
        }

        Ok(d)
    }

    /// Cut the warping path at the reference concatenation's move boundaries
    /// and derive one candidate window per move. Windows are clipped so that
    /// a candidate frame shared across a boundary belongs to the earlier
    /// move only, keeping windows non-overlapping and strictly ordered.
    fn split_by_move(
        &self,
        reference_moves: &[ReferenceMove],
        candidate: &[NormalizedPose],
        pairs: &[(usize, usize)],
    ) -> Vec<MoveAlignment> {
        let mut per_move = Vec::with_capacity(reference_moves.len());
        let mut pair_idx = 0;
        let mut prev_end = 0usize;
        let mut range_start = 0usize;

        for reference in reference_moves {
            let range_end = range_start + reference.frame_count();

            let mut move_pairs = Vec::new();
            while pair_idx < pairs.len() && pairs[pair_idx].0 < range_end {
                let (ref_idx, cand_idx) = pairs[pair_idx];
                move_pairs.push((ref_idx - range_start, cand_idx));
                pair_idx += 1;
            }

            let (start, end, mean_cost) = if move_pairs.is_empty() {
                (prev_end, prev_end, 1.0)
            } else {
                let first = move_pairs[0].1;
                let last = move_pairs[move_pairs.len() - 1].1;
                let start = first.max(prev_end);
                let end = (last + 1).max(start);
                let total: f64 = move_pairs
                    .iter()
                    .map(|&(ref_idx, cand_idx)| {
                        self.similarity
                            .frame_cost(&reference.frames[ref_idx], &candidate[cand_idx])
                    })
                    .sum();
                (start, end, total / move_pairs.len() as f64)
            };

            per_move.push(MoveAlignment {
                window: AlignmentWindow {
                    move_number: reference.move_number,
                    start,
                    end,
                    mean_cost,
                },
                pairs: move_pairs,
            });

            prev_end = end;
            range_start = range_end;
        }

        per_move
    }
}

/// Walk the accumulated-cost matrix back from the end cell to the free start
/// row, collecting matched (reference, candidate) index pairs. Ties prefer
/// the diagonal so the path, and with it every downstream score, is
/// deterministic.
fn backtrack(d: &Array2<f64>, r: usize, j_star: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut i = r;
    let mut j = j_star;

    while i > 0 {
        pairs.push((i - 1, j - 1));

        let diag = d[[i - 1, j - 1]];
        let up = d[[i - 1, j]];
        let left = if j > 1 { d[[i, j - 1]] } else { f64::INFINITY };

        if diag <= up && diag <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    pairs.reverse();
    pairs
}
