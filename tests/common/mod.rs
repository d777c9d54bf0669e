#![allow(dead_code)]

use std::f32::consts::PI;
use std::path::Path;

pub const SR: u32 = 22050;
pub const HOP: usize = 512;

/// Deterministic white noise in [-amp, amp]
pub fn gen_noise(n: usize, amp: f32, seed: u32) -> Vec<f32> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let unit = (state >> 8) as f32 / (1u32 << 24) as f32;
            amp * (2.0 * unit - 1.0)
        })
        .collect()
}

pub fn gen_sine(freq_hz: f32, sr: u32, n: usize, amp: f32) -> Vec<f32> {
    (0..n)
        .map(|i| amp * (2.0 * PI * freq_hz * i as f32 / sr as f32).sin())
        .collect()
}

/// Silence with 20 ms noise bursts starting at each time
pub fn gen_bursts(sr: u32, duration_secs: f32, times_secs: &[f32]) -> Vec<f32> {
    let n = (duration_secs * sr as f32) as usize;
    let burst_len = (0.02 * sr as f32) as usize;
    let mut out = vec![0.0f32; n];

    for (k, &t) in times_secs.iter().enumerate() {
        let start = (t * sr as f32) as usize;
        let burst = gen_noise(burst_len, 0.5, 7 + k as u32);
        for (i, v) in burst.into_iter().enumerate() {
            if start + i < n {
                out[start + i] = v;
            }
        }
    }
    out
}

/// Frame nearest to a timestamp
pub fn expected_frame(time_secs: f32) -> usize {
    (time_secs * SR as f32 / HOP as f32).round() as usize
}

pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}
