use serde::{Deserialize, Serialize};

use crate::errors::VerificationError;

/// MediaPipe Pose landmark indices (33-point full-body topology).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    /// Values stored per landmark on the wire: x, y, z, visibility.
    pub const VALUES_PER_LANDMARK: usize = 4;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEyeInner),
            2 => Some(Self::LeftEye),
            3 => Some(Self::LeftEyeOuter),
            4 => Some(Self::RightEyeInner),
            5 => Some(Self::RightEye),
            6 => Some(Self::RightEyeOuter),
            7 => Some(Self::LeftEar),
            8 => Some(Self::RightEar),
            9 => Some(Self::MouthLeft),
            10 => Some(Self::MouthRight),
            11 => Some(Self::LeftShoulder),
            12 => Some(Self::RightShoulder),
            13 => Some(Self::LeftElbow),
            14 => Some(Self::RightElbow),
            15 => Some(Self::LeftWrist),
            16 => Some(Self::RightWrist),
            17 => Some(Self::LeftPinky),
            18 => Some(Self::RightPinky),
            19 => Some(Self::LeftIndex),
            20 => Some(Self::RightIndex),
            21 => Some(Self::LeftThumb),
            22 => Some(Self::RightThumb),
            23 => Some(Self::LeftHip),
            24 => Some(Self::RightHip),
            25 => Some(Self::LeftKnee),
            26 => Some(Self::RightKnee),
            27 => Some(Self::LeftAnkle),
            28 => Some(Self::RightAnkle),
            29 => Some(Self::LeftHeel),
            30 => Some(Self::RightHeel),
            31 => Some(Self::LeftFootIndex),
            32 => Some(Self::RightFootIndex),
            _ => None,
        }
    }
}

/// One detected body keypoint with its detector confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Detector visibility score (0.0 to 1.0).
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, z: f64, confidence: f64) -> Self {
        Self { x, y, z, confidence }
    }

    /// Whether the detector confidence meets the threshold.
    pub fn is_valid(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            confidence: 0.0,
        }
    }
}

/// One video frame's detected pose: 33 keypoints plus the frame index.
///
/// Produced by the external landmark extractor; immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub frame_index: usize,
    pub keypoints: Vec<Keypoint>,
}

impl LandmarkFrame {
    pub fn new(frame_index: usize, keypoints: Vec<Keypoint>) -> Result<Self, VerificationError> {
        if keypoints.len() != LandmarkIndex::COUNT {
            return Err(VerificationError::MalformedPoseData {
                expected: LandmarkIndex::COUNT,
                found: keypoints.len(),
            });
        }
        Ok(Self {
            frame_index,
            keypoints,
        })
    }

    /// Decode a flat extractor frame of 132 floats (x, y, z, visibility per
    /// landmark) as stored by the platform's pose pipeline.
    pub fn from_flat(frame_index: usize, values: &[f64]) -> Result<Self, VerificationError> {
        let expected = LandmarkIndex::COUNT * LandmarkIndex::VALUES_PER_LANDMARK;
        if values.len() != expected {
            return Err(VerificationError::MalformedPoseData {
                expected,
                found: values.len(),
            });
        }

        let keypoints = values
            .chunks_exact(LandmarkIndex::VALUES_PER_LANDMARK)
            .map(|v| Keypoint::new(v[0], v[1], v[2], v[3]))
            .collect();

        Ok(Self {
            frame_index,
            keypoints,
        })
    }

    pub fn get(&self, index: LandmarkIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    /// The extractor emits an all-zero frame when detection fails on a frame.
    pub fn is_placeholder(&self) -> bool {
        self.keypoints
            .iter()
            .all(|k| k.x == 0.0 && k.y == 0.0 && k.z == 0.0 && k.confidence == 0.0)
    }

    pub fn average_confidence(&self) -> f64 {
        let sum: f64 = self.keypoints.iter().map(|k| k.confidence).sum();
        sum / LandmarkIndex::COUNT as f64
    }
}

/// Stored pose-data payload: the JSON shape persisted alongside each move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseData {
    pub landmarks: Vec<Vec<f64>>,
    pub frame_count: usize,
}

impl PoseData {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Decode into landmark frames, indexed in stored order.
    pub fn into_frames(self) -> Result<Vec<LandmarkFrame>, VerificationError> {
        self.landmarks
            .iter()
            .enumerate()
            .map(|(i, flat)| LandmarkFrame::from_flat(i, flat))
            .collect()
    }
}
