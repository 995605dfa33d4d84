use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::VerificationError;

/// Tunable thresholds for the verification pipeline.
///
/// All fields have documented defaults and are validated once at service
/// construction; nothing in the pipeline consults ad hoc values at call
/// sites. The defaults are starting points for calibration, not confirmed
/// production constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Minimum similarity score each prior move must reach (0-1).
    pub per_move_threshold: f64,
    /// Minimum number of frames the unmatched tail must contain to count as
    /// a new move (30 frames is one second at the platform's 30fps).
    pub min_new_move_frames: usize,
    /// Keypoints below this detector confidence are treated as missing.
    pub min_landmark_confidence: f64,
    /// A frame is unusable when more than this fraction of its keypoints is
    /// missing.
    pub max_missing_keypoint_fraction: f64,
    /// Cap on reference-frames x candidate-frames before alignment is
    /// refused outright.
    pub max_sequence_cost_budget: usize,
    /// Cap on candidate length, matching the extractor's own frame limit.
    pub max_candidate_frames: usize,
    /// How many frames back a missing keypoint may be recovered from.
    pub interpolation_window: usize,
    /// Minimum jointly-valid features for a frame pair to be comparable at
    /// all; below this the pair scores zero similarity.
    pub min_joint_valid_features: usize,
    /// Mean warping-path cost above which the candidate is considered to not
    /// contain the reference sequence in order.
    pub max_mean_path_cost: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            per_move_threshold: 0.75,
            min_new_move_frames: 30,
            min_landmark_confidence: 0.5,
            max_missing_keypoint_fraction: 0.3,
            max_sequence_cost_budget: 250_000,
            max_candidate_frames: 300,
            interpolation_window: 5,
            min_joint_valid_features: 8,
            max_mean_path_cost: 0.65,
        }
    }
}

impl VerificationConfig {
    /// Create configuration from environment variables, falling back to the
    /// documented defaults for anything unset or unparsable.
    pub fn from_env() -> Result<Self, VerificationError> {
        let defaults = Self::default();

        let config = Self {
            per_move_threshold: env_f64("VERIFY_PER_MOVE_THRESHOLD", defaults.per_move_threshold),
            min_new_move_frames: env_usize("VERIFY_MIN_NEW_MOVE_FRAMES", defaults.min_new_move_frames),
            min_landmark_confidence: env_f64(
                "VERIFY_MIN_LANDMARK_CONFIDENCE",
                defaults.min_landmark_confidence,
            ),
            max_missing_keypoint_fraction: env_f64(
                "VERIFY_MAX_MISSING_KEYPOINT_FRACTION",
                defaults.max_missing_keypoint_fraction,
            ),
            max_sequence_cost_budget: env_usize(
                "VERIFY_MAX_SEQUENCE_COST_BUDGET",
                defaults.max_sequence_cost_budget,
            ),
            max_candidate_frames: env_usize("VERIFY_MAX_CANDIDATE_FRAMES", defaults.max_candidate_frames),
            interpolation_window: env_usize("VERIFY_INTERPOLATION_WINDOW", defaults.interpolation_window),
            min_joint_valid_features: env_usize(
                "VERIFY_MIN_JOINT_VALID_FEATURES",
                defaults.min_joint_valid_features,
            ),
            max_mean_path_cost: env_f64("VERIFY_MAX_MEAN_PATH_COST", defaults.max_mean_path_cost),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check internal invariants. Runs at service construction so that a bad
    /// configuration fails at startup, never mid-verification.
    pub fn validate(&self) -> Result<(), VerificationError> {
        if !(0.0..=1.0).contains(&self.per_move_threshold) {
            return Err(VerificationError::InvalidConfig(format!(
                "per_move_threshold must be in [0, 1], got {}",
                self.per_move_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.min_landmark_confidence) {
            return Err(VerificationError::InvalidConfig(format!(
                "min_landmark_confidence must be in [0, 1], got {}",
                self.min_landmark_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.max_missing_keypoint_fraction) {
            return Err(VerificationError::InvalidConfig(format!(
                "max_missing_keypoint_fraction must be in [0, 1], got {}",
                self.max_missing_keypoint_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.max_mean_path_cost) {
            return Err(VerificationError::InvalidConfig(format!(
                "max_mean_path_cost must be in [0, 1], got {}",
                self.max_mean_path_cost
            )));
        }
        if self.min_new_move_frames == 0 {
            return Err(VerificationError::InvalidConfig(
                "min_new_move_frames must be positive".to_string(),
            ));
        }
        if self.max_sequence_cost_budget == 0 {
            return Err(VerificationError::InvalidConfig(
                "max_sequence_cost_budget must be positive".to_string(),
            ));
        }
        if self.max_candidate_frames == 0 {
            return Err(VerificationError::InvalidConfig(
                "max_candidate_frames must be positive".to_string(),
            ));
        }
        if self.min_joint_valid_features == 0 {
            return Err(VerificationError::InvalidConfig(
                "min_joint_valid_features must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VerificationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.per_move_threshold, 0.75);
        assert_eq!(config.min_new_move_frames, 30);
        assert_eq!(config.min_landmark_confidence, 0.5);
        assert_eq!(config.max_missing_keypoint_fraction, 0.3);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let config = VerificationConfig {
            per_move_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VerificationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let config = VerificationConfig {
            max_sequence_cost_budget: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VerificationError::InvalidConfig(_))
        ));
    }
}
