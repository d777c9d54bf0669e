//! End-to-end detection scenarios on synthetic buffers.

mod common;

use common::{expected_frame, gen_bursts, gen_noise, gen_sine, SR};
use sound_events::{DetectorConfig, EventClass, SoundEventDetector};
use std::f32::consts::PI;

fn detector() -> SoundEventDetector {
    SoundEventDetector::new(DetectorConfig::default()).unwrap()
}

// ===== Claps through the spectral extractor =====

#[test]
fn test_two_bursts_give_two_claps() {
    let samples = gen_bursts(SR, 4.0, &[1.0, 2.0]);
    let analysis = detector().analyze_samples(&samples);

    assert_eq!(analysis.claps.len(), 2, "claps: {:?}", analysis.claps);
    for (detection, t) in analysis.claps.iter().zip([1.0f32, 2.0]) {
        let expected = expected_frame(t);
        assert!(
            detection.frame_index.abs_diff(expected) <= 1,
            "clap at frame {} expected near {}",
            detection.frame_index,
            expected
        );
    }
    assert!(analysis.whistles.is_empty(), "whistles: {:?}", analysis.whistles);
}

#[test]
fn test_all_zero_buffer_has_no_detections() {
    let samples = vec![0.0f32; 2 * SR as usize];
    let analysis = detector().analyze_samples(&samples);

    assert!(analysis.claps.is_empty());
    assert!(analysis.whistles.is_empty());
    assert!(analysis.quality.snr_db.is_finite());
    assert!(analysis.quality.timing.is_none());
}

#[test]
fn test_empty_buffer_has_no_detections() {
    let analysis = detector().analyze_samples(&[]);
    assert_eq!(analysis.frames.len(), 0);
    assert!(analysis.all_detections().is_empty());
}

#[test]
fn test_analysis_is_idempotent() {
    let mut samples = gen_bursts(SR, 3.0, &[0.7, 1.5, 2.4]);
    for (s, t) in samples.iter_mut().zip(gen_sine(1200.0, SR, 3 * SR as usize, 0.05)) {
        *s += t;
    }
    let detector = detector();

    let first = detector.analyze_samples(&samples);
    let second = detector.analyze_samples(&samples);

    assert_eq!(first.claps, second.claps);
    assert_eq!(first.whistles, second.whistles);
    assert_eq!(first.quality, second.quality);
}

#[test]
fn test_separate_detectors_agree() {
    let samples = gen_bursts(SR, 3.0, &[1.0, 2.0]);
    let a = detector().analyze_samples(&samples);
    let b = detector().analyze_samples(&samples);
    assert_eq!(a.claps, b.claps);
}

#[test]
fn test_output_invariants_on_busy_buffer() {
    let n = 5 * SR as usize;
    let mut samples = gen_bursts(SR, 5.0, &[0.2, 0.35, 0.5, 1.1, 1.15, 2.0, 3.3, 4.6]);
    let tone = gen_sine(880.0, SR, n, 0.2);
    let hiss = gen_noise(n, 0.01, 99);
    for i in 0..n {
        if (SR as usize * 2..SR as usize * 3).contains(&i) {
            samples[i] += tone[i];
        }
        samples[i] += hiss[i];
    }

    let config = DetectorConfig::default();
    let analysis = SoundEventDetector::new(config.clone())
        .unwrap()
        .analyze_samples(&samples);
    let frame_count = analysis.frames.len();

    for class in EventClass::ALL {
        let detections = analysis.detections(class);
        let min_distance = match class {
            EventClass::Clap => analysis
                .frames
                .secs_to_frames(config.filter.clap_min_separation_secs),
            EventClass::Whistle => analysis
                .frames
                .secs_to_frames(config.filter.whistle_min_duration_secs),
        };

        for d in detections {
            assert!(d.frame_index < frame_count);
            assert!((0.0..=1.0).contains(&d.score), "score {}", d.score);
            assert_eq!(d.class, class);
        }
        for pair in detections.windows(2) {
            assert!(pair[0].frame_index < pair[1].frame_index);
            assert!(
                pair[1].frame_index - pair[0].frame_index >= min_distance,
                "{} detections {:?} closer than {} frames",
                class,
                pair,
                min_distance
            );
        }
    }
}

// ===== Quality =====

#[test]
fn test_snr_silence_then_tone_is_positive_and_finite() {
    let half = SR as usize / 2;
    let mut samples = vec![0.0f32; half];
    samples.extend(gen_sine(440.0, SR, 3 * half, 1.0));

    let analysis = detector().analyze_samples(&samples);
    let snr = analysis.quality.snr_db;
    assert!(snr.is_finite(), "snr {}", snr);
    assert!(snr > 0.0, "snr {}", snr);
}

#[test]
fn test_regular_claps_report_timing() {
    let samples = gen_bursts(SR, 4.0, &[0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    // Timing pools both classes; keep whistles out of it
    let config = DetectorConfig {
        whistle_threshold: 1.0,
        ..DetectorConfig::default()
    };
    let analysis = SoundEventDetector::new(config)
        .unwrap()
        .analyze_samples(&samples);

    assert_eq!(analysis.claps.len(), 6);
    let timing = analysis.quality.timing.expect("timing for six claps");
    assert_eq!(timing.intervals.len(), 5);
    assert!((timing.mean_interval - 0.5).abs() < 0.03);
    assert!(timing.is_regular);
}

// ===== Whistles through the spectral extractor =====

/// Low hiss with 1500 Hz tones over each (start, end) span in seconds.
/// Each tone starts on a zero crossing and fades out over its last 50 ms.
fn hiss_with_tones(duration_secs: f32, spans: &[(f32, f32)]) -> Vec<f32> {
    let n = (duration_secs * SR as f32) as usize;
    let mut samples = gen_noise(n, 0.001, 3);
    let fade = (0.05 * SR as f32) as usize;

    for &(start, end) in spans {
        let first = (start * SR as f32) as usize;
        let len = ((end - start) * SR as f32) as usize;
        let tone = gen_sine(1500.0, SR, len, 0.5);
        for (i, v) in tone.into_iter().enumerate() {
            let remaining = len - i;
            let gain = if remaining < fade {
                0.5 - 0.5 * (PI * remaining as f32 / fade as f32).cos()
            } else {
                1.0
            };
            samples[first + i] += v * gain;
        }
    }
    samples
}

#[test]
fn test_steady_tone_gives_one_whistle_and_no_claps() {
    let samples = hiss_with_tones(3.0, &[(1.0, 2.0)]);
    let analysis = detector().analyze_samples(&samples);

    assert!(analysis.claps.is_empty(), "claps: {:?}", analysis.claps);
    assert_eq!(analysis.whistles.len(), 1, "whistles: {:?}", analysis.whistles);
    let frame = analysis.whistles[0].frame_index;
    let span = expected_frame(1.0) - 2..=expected_frame(2.0) + 2;
    assert!(span.contains(&frame), "whistle at frame {} outside {:?}", frame, span);
}

#[test]
fn test_steady_tone_explains_as_whistle() {
    let samples = hiss_with_tones(3.0, &[(1.0, 2.0)]);
    let detector = detector();
    let analysis = detector.analyze_samples(&samples);

    let decisions = detector.explain(&analysis);
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].class, EventClass::Whistle);
}

#[test]
fn test_two_tones_give_two_whistles() {
    let samples = hiss_with_tones(3.0, &[(0.5, 1.0), (2.0, 2.5)]);
    let analysis = detector().analyze_samples(&samples);

    assert!(analysis.claps.is_empty(), "claps: {:?}", analysis.claps);
    assert_eq!(analysis.whistles.len(), 2, "whistles: {:?}", analysis.whistles);
    let first = analysis.whistles[0].frame_index;
    let second = analysis.whistles[1].frame_index;
    assert!((expected_frame(0.5) - 2..=expected_frame(1.0) + 2).contains(&first));
    assert!((expected_frame(2.0) - 2..=expected_frame(2.5) + 2).contains(&second));
}
