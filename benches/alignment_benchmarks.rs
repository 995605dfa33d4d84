//! Benchmarks for the alignment and scoring hot path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio_util::sync::CancellationToken;

use dance_verify::services::{PoseNormalizationService, SegmentAlignmentService};
use dance_verify::{
    Keypoint, LandmarkFrame, LandmarkIndex, ReferenceMove, VerificationConfig, VerificationService,
};

fn synthetic_frame(pattern: u64, t: usize) -> LandmarkFrame {
    let mut keypoints = vec![Keypoint::default(); LandmarkIndex::COUNT];

    keypoints[LandmarkIndex::LeftHip as usize] = Keypoint::new(0.45, 0.55, 0.0, 1.0);
    keypoints[LandmarkIndex::RightHip as usize] = Keypoint::new(0.55, 0.55, 0.0, 1.0);
    keypoints[LandmarkIndex::LeftShoulder as usize] = Keypoint::new(0.44, 0.35, 0.0, 1.0);
    keypoints[LandmarkIndex::RightShoulder as usize] = Keypoint::new(0.56, 0.35, 0.0, 1.0);

    for (i, keypoint) in keypoints.iter_mut().enumerate() {
        if keypoint.confidence > 0.0 {
            continue;
        }
        let base = i as f64 * 0.37 + pattern as f64 * 1.13;
        let angle = base + 0.9 * (2.0 * std::f64::consts::PI * t as f64 / 36.0 + base).sin();
        *keypoint = Keypoint::new(
            0.5 + 0.35 * angle.cos(),
            0.55 + 0.35 * angle.sin(),
            0.0,
            1.0,
        );
    }

    LandmarkFrame::new(t, keypoints).unwrap()
}

fn candidate_frames(patterns: &[u64], frames_per_move: usize) -> Vec<LandmarkFrame> {
    let mut out = Vec::new();
    for &pattern in patterns {
        for t in 0..frames_per_move {
            out.push(synthetic_frame(pattern, t));
        }
    }
    out.iter_mut()
        .enumerate()
        .for_each(|(i, frame)| frame.frame_index = i);
    out
}

fn reference_moves(config: &VerificationConfig, count: u64, frames: usize) -> Vec<ReferenceMove> {
    let normalizer = PoseNormalizationService::new(config.clone()).unwrap();
    (1..=count)
        .map(|pattern| {
            let normalized = normalizer
                .normalize_sequence(&candidate_frames(&[pattern], frames))
                .unwrap();
            ReferenceMove {
                id: uuid::Uuid::new_v4(),
                move_number: pattern as u32,
                frames: normalized,
                verification_score: 1.0,
                duration_seconds: frames as f64 / 30.0,
                accepted_at: chrono::Utc::now(),
            }
        })
        .collect()
}

fn benchmark_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("alignment");
    let config = VerificationConfig::default();
    let normalizer = PoseNormalizationService::new(config.clone()).unwrap();
    let aligner = SegmentAlignmentService::new(config.clone()).unwrap();

    for chain_length in [1u64, 3, 5] {
        let moves = reference_moves(&config, chain_length, 45);
        let patterns: Vec<u64> = (1..=chain_length).chain([99]).collect();
        let candidate = normalizer
            .normalize_sequence(&candidate_frames(&patterns, 45))
            .unwrap();

        group.bench_with_input(
            BenchmarkId::new("dtw_chain", chain_length),
            &(moves, candidate),
            |b, (moves, candidate)| {
                b.iter(|| {
                    black_box(
                        aligner
                            .align(black_box(moves), black_box(candidate), &CancellationToken::new())
                            .unwrap(),
                    )
                });
            },
        );
    }

    group.finish();
}

fn benchmark_full_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("verification");
    let config = VerificationConfig::default();
    let service = VerificationService::new(config.clone()).unwrap();

    let moves = reference_moves(&config, 3, 45);
    let candidate = candidate_frames(&[1, 2, 3, 99], 45);

    group.bench_function("verify_3_move_chain", |b| {
        b.iter(|| {
            black_box(
                service
                    .verify_submission(black_box(&moves), black_box(&candidate))
                    .unwrap(),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_alignment, benchmark_full_verification);
criterion_main!(benches);
