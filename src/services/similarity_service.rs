use crate::config::VerificationConfig;
use crate::errors::VerificationError;
use crate::models::NormalizedPose;

const ZERO_NORM: f64 = 1e-12;

/// Temporal-alignment-tolerant similarity scoring between normalized poses.
///
/// Per-frame similarity is the cosine between the two feature vectors
/// restricted to jointly-valid features, clamped to [0, 1]. A window's score
/// is the mean similarity along the matched warping sub-path, so tempo
/// differences between reference and candidate do not penalize a correctly
/// reproduced move.
#[derive(Clone)]
pub struct SimilarityService {
    config: VerificationConfig,
}

impl SimilarityService {
    pub fn new(config: VerificationConfig) -> Result<Self, VerificationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Similarity in [0, 1] between two frames. Pairs with fewer than
    /// `min_joint_valid_features` comparable features score 0 (no match).
    pub fn frame_similarity(&self, a: &NormalizedPose, b: &NormalizedPose) -> f64 {
        let mut jointly_valid = 0usize;
        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;

        for i in 0..a.features.len().min(b.features.len()) {
            if a.valid[i] && b.valid[i] {
                jointly_valid += 1;
                dot += a.features[i] * b.features[i];
                norm_a += a.features[i] * a.features[i];
                norm_b += b.features[i] * b.features[i];
            }
        }

        if jointly_valid < self.config.min_joint_valid_features {
            return 0.0;
        }
        if norm_a < ZERO_NORM || norm_b < ZERO_NORM {
            return 0.0;
        }

        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
    }

    /// Local cost used inside the alignment search.
    pub fn frame_cost(&self, a: &NormalizedPose, b: &NormalizedPose) -> f64 {
        1.0 - self.frame_similarity(a, b)
    }

    /// Path-length-normalized similarity of one aligned move: the mean
    /// per-pair similarity over the matched (reference, candidate) pairs.
    pub fn score_move(
        &self,
        reference: &[NormalizedPose],
        candidate: &[NormalizedPose],
        pairs: &[(usize, usize)],
    ) -> f64 {
        if pairs.is_empty() {
            return 0.0;
        }

        let total: f64 = pairs
            .iter()
            .map(|&(ref_idx, cand_idx)| {
                self.frame_similarity(&reference[ref_idx], &candidate[cand_idx])
            })
            .sum();
        total / pairs.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FEATURE_COUNT;

    fn pose(features: Vec<f64>) -> NormalizedPose {
        let valid = vec![true; features.len()];
        NormalizedPose::new(0, features, valid)
    }

    fn service() -> SimilarityService {
        SimilarityService::new(VerificationConfig::default()).unwrap()
    }

    fn ramp() -> Vec<f64> {
        (0..FEATURE_COUNT).map(|i| 0.1 + i as f64 * 0.01).collect()
    }

    #[test]
    fn test_identical_frames_score_one() {
        let service = service();
        let a = pose(ramp());
        let b = pose(ramp());
        assert!((service.frame_similarity(&a, &b) - 1.0).abs() < 1e-12);
        assert!(service.frame_cost(&a, &b).abs() < 1e-12);
    }

    #[test]
    fn test_opposed_frames_clamp_to_zero() {
        let service = service();
        let a = pose(ramp());
        let b = pose(ramp().into_iter().map(|f| -f).collect());
        assert_eq!(service.frame_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_orthogonal_frames_score_zero() {
        let service = service();

        let mut features_a = vec![0.0; FEATURE_COUNT];
        let mut features_b = vec![0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT / 2 {
            features_a[i] = 1.0;
            features_b[FEATURE_COUNT / 2 + i] = 1.0;
        }

        let similarity = service.frame_similarity(&pose(features_a), &pose(features_b));
        assert!(similarity < 1e-12);
    }

    #[test]
    fn test_invalid_features_are_excluded() {
        let service = service();

        let a = pose(ramp());
        // Same vector, but with one feature corrupted and flagged invalid on
        // one side: the pair must still score as identical.
        let mut features = ramp();
        features[3] = 500.0;
        let mut valid = vec![true; FEATURE_COUNT];
        valid[3] = false;
        let b = NormalizedPose::new(0, features, valid);

        assert!((service.frame_similarity(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_joint_features_is_no_match() {
        let service = service();

        let mut valid = vec![false; FEATURE_COUNT];
        for slot in valid.iter_mut().take(5) {
            *slot = true;
        }
        let a = NormalizedPose::new(0, ramp(), valid.clone());
        let b = NormalizedPose::new(0, ramp(), valid);

        // 5 jointly-valid features is below the default minimum of 8.
        assert_eq!(service.frame_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_score_move_averages_pairs() {
        let service = service();
        let reference = vec![pose(ramp()), pose(ramp())];
        let candidate = vec![pose(ramp()), pose(ramp()), pose(ramp())];

        let pairs = vec![(0, 0), (0, 1), (1, 2)];
        let score = service.score_move(&reference, &candidate, &pairs);
        assert!((score - 1.0).abs() < 1e-12);

        assert_eq!(service.score_move(&reference, &candidate, &[]), 0.0);
    }
}
