use serde::{Deserialize, Serialize};

use crate::models::landmark::LandmarkIndex;

/// Body-centered position features: x and y per landmark.
pub const POSITION_FEATURES: usize = LandmarkIndex::COUNT * 2;

/// Joint-angle features: elbows, knees, hips, shoulders (left and right).
pub const ANGLE_FEATURES: usize = 8;

/// Total length of a normalized pose feature vector.
pub const FEATURE_COUNT: usize = POSITION_FEATURES + ANGLE_FEATURES;

/// Scale/translation-invariant pose representation derived from one
/// `LandmarkFrame`: body-centered, torso-scaled keypoint positions plus joint
/// angles, with a per-feature validity mask.
///
/// Features whose source keypoints were missing or below the confidence
/// threshold (and not recoverable by interpolation) are flagged invalid and
/// excluded from distance computations downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPose {
    pub frame_index: usize,
    pub features: Vec<f64>,
    pub valid: Vec<bool>,
}

impl NormalizedPose {
    pub fn new(frame_index: usize, features: Vec<f64>, valid: Vec<bool>) -> Self {
        debug_assert_eq!(features.len(), FEATURE_COUNT);
        debug_assert_eq!(valid.len(), FEATURE_COUNT);
        Self {
            frame_index,
            features,
            valid,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn valid_feature_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Number of features valid in both poses, the domain cosine similarity
    /// is computed over.
    pub fn jointly_valid_count(&self, other: &NormalizedPose) -> usize {
        self.valid
            .iter()
            .zip(other.valid.iter())
            .filter(|(a, b)| **a && **b)
            .count()
    }
}
