use tracing::debug;

use crate::config::VerificationConfig;
use crate::errors::VerificationError;
use crate::models::{
    Keypoint, LandmarkFrame, LandmarkIndex, NormalizedPose, ANGLE_FEATURES, FEATURE_COUNT,
    POSITION_FEATURES,
};

/// Joint angles measured at the middle landmark of each triple.
const ANGLE_TRIPLES: [(LandmarkIndex, LandmarkIndex, LandmarkIndex); ANGLE_FEATURES] = [
    (
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::LeftElbow,
        LandmarkIndex::LeftWrist,
    ),
    (
        LandmarkIndex::RightShoulder,
        LandmarkIndex::RightElbow,
        LandmarkIndex::RightWrist,
    ),
    (
        LandmarkIndex::LeftHip,
        LandmarkIndex::LeftKnee,
        LandmarkIndex::LeftAnkle,
    ),
    (
        LandmarkIndex::RightHip,
        LandmarkIndex::RightKnee,
        LandmarkIndex::RightAnkle,
    ),
    (
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::LeftHip,
        LandmarkIndex::LeftKnee,
    ),
    (
        LandmarkIndex::RightShoulder,
        LandmarkIndex::RightHip,
        LandmarkIndex::RightKnee,
    ),
    (
        LandmarkIndex::LeftElbow,
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::LeftHip,
    ),
    (
        LandmarkIndex::RightElbow,
        LandmarkIndex::RightShoulder,
        LandmarkIndex::RightHip,
    ),
];

const DEGENERATE_SCALE: f64 = 1e-6;

/// Bounded per-keypoint history used to recover briefly occluded keypoints
/// from the most recent confident observation.
///
/// Owned by the caller and passed into `normalize` explicitly; the normalizer
/// itself holds no cross-frame state.
#[derive(Debug, Clone)]
pub struct InterpolationBuffer {
    window: usize,
    last_seen: Vec<Option<(usize, Keypoint)>>,
}

impl InterpolationBuffer {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            last_seen: vec![None; LandmarkIndex::COUNT],
        }
    }

    fn observe(&mut self, frame_index: usize, keypoint_index: usize, keypoint: Keypoint) {
        self.last_seen[keypoint_index] = Some((frame_index, keypoint));
    }

    fn recall(&self, frame_index: usize, keypoint_index: usize) -> Option<Keypoint> {
        let (seen_at, keypoint) = self.last_seen[keypoint_index]?;
        if frame_index.saturating_sub(seen_at) <= self.window {
            Some(keypoint)
        } else {
            None
        }
    }
}

/// Converts raw landmark frames into scale/translation-invariant feature
/// vectors: keypoint positions relative to the hip center, scaled by torso
/// length, plus joint angles for robustness to camera rotation.
#[derive(Clone)]
pub struct PoseNormalizationService {
    config: VerificationConfig,
}

impl PoseNormalizationService {
    pub fn new(config: VerificationConfig) -> Result<Self, VerificationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn interpolation_buffer(&self) -> InterpolationBuffer {
        InterpolationBuffer::new(self.config.interpolation_window)
    }

    /// Normalize one frame.
    ///
    /// Deterministic given the frame and the buffer's current contents; the
    /// only cross-frame state is the caller-owned interpolation buffer.
    pub fn normalize(
        &self,
        frame: &LandmarkFrame,
        buffer: &mut InterpolationBuffer,
    ) -> Result<NormalizedPose, VerificationError> {
        let threshold = self.config.min_landmark_confidence;
        let total = LandmarkIndex::COUNT;

        let missing = frame
            .keypoints
            .iter()
            .filter(|k| !k.is_valid(threshold))
            .count();
        if missing as f64 / total as f64 > self.config.max_missing_keypoint_fraction {
            return Err(VerificationError::InsufficientLandmarks {
                frame_index: frame.frame_index,
                missing,
                total,
                threshold,
            });
        }

        // Resolve each keypoint: confident detections update the buffer,
        // low-confidence ones fall back to a recent observation when the
        // buffer has one inside its window.
        let mut resolved: Vec<Option<Keypoint>> = Vec::with_capacity(total);
        for (i, keypoint) in frame.keypoints.iter().enumerate() {
            if keypoint.is_valid(threshold) {
                buffer.observe(frame.frame_index, i, *keypoint);
                resolved.push(Some(*keypoint));
            } else if let Some(recovered) = buffer.recall(frame.frame_index, i) {
                debug!(
                    "frame {}: keypoint {} interpolated from recent observation",
                    frame.frame_index, i
                );
                resolved.push(Some(recovered));
            } else {
                resolved.push(None);
            }
        }

        let (center, scale) =
            self.body_frame(&resolved)
                .ok_or(VerificationError::InsufficientLandmarks {
                    frame_index: frame.frame_index,
                    missing,
                    total,
                    threshold,
                })?;

        let mut features = vec![0.0; FEATURE_COUNT];
        let mut valid = vec![false; FEATURE_COUNT];

        for (i, keypoint) in resolved.iter().enumerate() {
            if let Some(kp) = keypoint {
                features[i * 2] = (kp.x - center.0) / scale;
                features[i * 2 + 1] = (kp.y - center.1) / scale;
                valid[i * 2] = true;
                valid[i * 2 + 1] = true;
            }
        }

        for (a, (first, mid, last)) in ANGLE_TRIPLES.iter().enumerate() {
            let slot = POSITION_FEATURES + a;
            if let Some(angle) = joint_angle(
                resolved[*first as usize],
                resolved[*mid as usize],
                resolved[*last as usize],
            ) {
                features[slot] = angle;
                valid[slot] = true;
            }
        }

        Ok(NormalizedPose::new(frame.frame_index, features, valid))
    }

    /// Normalize an ordered frame sequence with a fresh interpolation buffer.
    ///
    /// Fails on the first unusable frame: silently skipping frames
    /// mid-sequence would corrupt downstream alignment.
    pub fn normalize_sequence(
        &self,
        frames: &[LandmarkFrame],
    ) -> Result<Vec<NormalizedPose>, VerificationError> {
        let mut buffer = self.interpolation_buffer();
        frames
            .iter()
            .map(|frame| self.normalize(frame, &mut buffer))
            .collect()
    }

    /// Body-centric frame of reference: hip center as origin, torso length
    /// as the unit scale, shoulder width as fallback when the torso
    /// degenerates (e.g. the dancer is horizontal in frame).
    fn body_frame(&self, resolved: &[Option<Keypoint>]) -> Option<((f64, f64), f64)> {
        let left_hip = resolved[LandmarkIndex::LeftHip as usize]?;
        let right_hip = resolved[LandmarkIndex::RightHip as usize]?;
        let left_shoulder = resolved[LandmarkIndex::LeftShoulder as usize]?;
        let right_shoulder = resolved[LandmarkIndex::RightShoulder as usize]?;

        let hip_center = (
            (left_hip.x + right_hip.x) / 2.0,
            (left_hip.y + right_hip.y) / 2.0,
        );
        let shoulder_center = (
            (left_shoulder.x + right_shoulder.x) / 2.0,
            (left_shoulder.y + right_shoulder.y) / 2.0,
        );

        let torso = distance(hip_center, shoulder_center);
        if torso > DEGENERATE_SCALE {
            return Some((hip_center, torso));
        }

        let shoulder_width = distance(
            (left_shoulder.x, left_shoulder.y),
            (right_shoulder.x, right_shoulder.y),
        );
        if shoulder_width > DEGENERATE_SCALE {
            return Some((hip_center, shoulder_width));
        }

        None
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Angle in radians at `mid` between the segments mid->first and mid->last.
fn joint_angle(
    first: Option<Keypoint>,
    mid: Option<Keypoint>,
    last: Option<Keypoint>,
) -> Option<f64> {
    let (first, mid, last) = (first?, mid?, last?);

    let (ax, ay) = (first.x - mid.x, first.y - mid.y);
    let (bx, by) = (last.x - mid.x, last.y - mid.y);

    let norm_a = (ax * ax + ay * ay).sqrt();
    let norm_b = (bx * bx + by * by).sqrt();
    if norm_a < DEGENERATE_SCALE || norm_b < DEGENERATE_SCALE {
        return None;
    }

    let cos = ((ax * bx + ay * by) / (norm_a * norm_b)).clamp(-1.0, 1.0);
    Some(cos.acos())
}
