// Spectral stability from frame-to-frame centroid drift

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralStability {
    /// Mean absolute centroid change per frame (Hz)
    pub mean_drift: f64,

    /// Largest absolute centroid change per frame (Hz)
    pub max_drift: f64,

    /// 1 - std(drift) / (max centroid + 1e-8)
    pub stability: f64,
}

/// Measure how much the spectral centroid wanders between frames
///
/// Fewer than two frames give zero drift and full stability.
pub fn spectral_stability(centroid: &[f32]) -> SpectralStability {
    if centroid.len() < 2 {
        return SpectralStability {
            mean_drift: 0.0,
            max_drift: 0.0,
            stability: 1.0,
        };
    }

    let drift: Vec<f64> = centroid
        .windows(2)
        .map(|pair| (pair[1] as f64 - pair[0] as f64).abs())
        .collect();
    let n = drift.len() as f64;
    let mean_drift = drift.iter().sum::<f64>() / n;
    let max_drift = drift.iter().copied().fold(0.0, f64::max);
    let std_drift = (drift.iter().map(|d| (d - mean_drift).powi(2)).sum::<f64>() / n).sqrt();
    let max_centroid = centroid.iter().map(|&c| c as f64).fold(f64::MIN, f64::max);

    SpectralStability {
        mean_drift,
        max_drift,
        stability: 1.0 - std_drift / (max_centroid + 1e-8),
    }
}
