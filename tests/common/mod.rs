// Shared across test binaries; not every binary uses every helper.
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dance_verify::services::PoseNormalizationService;
use dance_verify::{Keypoint, LandmarkFrame, LandmarkIndex, ReferenceMove, VerificationConfig};

/// Route pipeline logs through the test harness; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

const HIP_CENTER: (f64, f64) = (0.5, 0.55);
const LIMB_RADIUS: f64 = 0.35;
const PHASE_PERIOD: f64 = 36.0;

/// Build one frame of a synthetic dance pattern.
///
/// The torso (hips and shoulders) is rigid so normalization sees a stable
/// body frame; every other keypoint swings on a circle around the hip center
/// with a pattern-specific angular layout, so distinct patterns produce
/// distant normalized poses while consecutive frames of one pattern move
/// smoothly.
pub fn synthetic_frame(pattern: u64, t: usize, frame_index: usize) -> LandmarkFrame {
    let mut keypoints = vec![Keypoint::default(); LandmarkIndex::COUNT];

    let fixed = [
        (LandmarkIndex::LeftHip, 0.45, 0.55),
        (LandmarkIndex::RightHip, 0.55, 0.55),
        (LandmarkIndex::LeftShoulder, 0.44, 0.35),
        (LandmarkIndex::RightShoulder, 0.56, 0.35),
    ];
    for (index, x, y) in fixed {
        keypoints[index as usize] = Keypoint::new(x, y, 0.0, 1.0);
    }

    for (i, keypoint) in keypoints.iter_mut().enumerate() {
        if keypoint.confidence > 0.0 {
            continue;
        }
        let base = i as f64 * 0.37 + pattern as f64 * 1.13;
        let sweep = 0.9 * (2.0 * std::f64::consts::PI * t as f64 / PHASE_PERIOD + base).sin();
        let angle = base + sweep;
        *keypoint = Keypoint::new(
            HIP_CENTER.0 + LIMB_RADIUS * angle.cos(),
            HIP_CENTER.1 + LIMB_RADIUS * angle.sin(),
            0.0,
            1.0,
        );
    }

    LandmarkFrame::new(frame_index, keypoints).unwrap()
}

/// A whole move: `frames` consecutive frames of one pattern.
pub fn synthetic_move(pattern: u64, frames: usize) -> Vec<LandmarkFrame> {
    (0..frames)
        .map(|t| synthetic_frame(pattern, t, t))
        .collect()
}

/// Concatenate move performances into one candidate clip, reindexing frames
/// sequentially the way the extractor would emit them.
pub fn concat_performances(parts: &[Vec<LandmarkFrame>]) -> Vec<LandmarkFrame> {
    parts
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, frame)| LandmarkFrame::new(i, frame.keypoints.clone()).unwrap())
        .collect()
}

/// Normalize a synthetic performance into a chain reference move.
pub fn reference_move(
    config: &VerificationConfig,
    move_number: u32,
    pattern: u64,
    frames: usize,
) -> ReferenceMove {
    let normalizer = PoseNormalizationService::new(config.clone()).unwrap();
    let normalized = normalizer
        .normalize_sequence(&synthetic_move(pattern, frames))
        .unwrap();

    ReferenceMove {
        id: uuid::Uuid::new_v4(),
        move_number,
        frames: normalized,
        verification_score: 1.0,
        duration_seconds: frames as f64 / 30.0,
        accepted_at: chrono::Utc::now(),
    }
}

/// Add uniform coordinate noise of the given magnitude, deterministically.
pub fn perturb(frames: &[LandmarkFrame], sigma: f64, seed: u64) -> Vec<LandmarkFrame> {
    let mut rng = StdRng::seed_from_u64(seed);
    frames
        .iter()
        .map(|frame| {
            let keypoints = frame
                .keypoints
                .iter()
                .map(|k| {
                    Keypoint::new(
                        k.x + rng.gen_range(-sigma..=sigma),
                        k.y + rng.gen_range(-sigma..=sigma),
                        k.z,
                        k.confidence,
                    )
                })
                .collect();
            LandmarkFrame::new(frame.frame_index, keypoints).unwrap()
        })
        .collect()
}
