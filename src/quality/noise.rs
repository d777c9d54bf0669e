// Noise floor and signal-to-noise estimation
// The leading part of a recording is assumed to hold only background noise

use serde::{Deserialize, Serialize};

const SNR_EPSILON: f64 = 1e-8;

/// Statistics of the assumed noise-only lead-in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Mean absolute amplitude
    pub noise_mean: f64,

    /// Standard deviation of the absolute amplitude
    pub noise_std: f64,

    /// Mean squared amplitude
    pub noise_power: f64,
}

/// Measure the first `window_secs` seconds of a buffer
///
/// A buffer shorter than the window is measured in full; an empty buffer gives zeros.
pub fn estimate_noise_profile(samples: &[f32], sample_rate: u32, window_secs: f64) -> NoiseProfile {
    let count = ((sample_rate as f64 * window_secs) as usize).min(samples.len());
    let noise = &samples[..count];

    if noise.is_empty() {
        return NoiseProfile {
            noise_mean: 0.0,
            noise_std: 0.0,
            noise_power: 0.0,
        };
    }

    let n = noise.len() as f64;
    let noise_mean = noise.iter().map(|&s| (s as f64).abs()).sum::<f64>() / n;
    let noise_std = (noise
        .iter()
        .map(|&s| ((s as f64).abs() - noise_mean).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    let noise_power = mean_power(noise);

    NoiseProfile {
        noise_mean,
        noise_std,
        noise_power,
    }
}

/// Mean squared amplitude
pub fn mean_power(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / samples.len() as f64
}

/// Signal-to-noise ratio in dB: 10 * log10(signal_power / (noise_power + 1e-8))
///
/// Returns 0 dB for an empty buffer and for a buffer with no energy at all.
pub fn snr_estimate(samples: &[f32], profile: &NoiseProfile) -> f64 {
    let signal_power = mean_power(samples);
    if signal_power <= 0.0 {
        return 0.0;
    }
    10.0 * (signal_power / (profile.noise_power + SNR_EPSILON)).log10()
}

/// Coarse recording quality derived from the SNR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityLabel {
    High,
    Medium,
    Low,
}

impl QualityLabel {
    /// HIGH above 20 dB, MEDIUM above 10 dB, LOW otherwise
    pub fn from_snr(snr_db: f64) -> Self {
        if snr_db > 20.0 {
            QualityLabel::High
        } else if snr_db > 10.0 {
            QualityLabel::Medium
        } else {
            QualityLabel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::High => "HIGH",
            QualityLabel::Medium => "MEDIUM",
            QualityLabel::Low => "LOW",
        }
    }
}

impl std::fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
