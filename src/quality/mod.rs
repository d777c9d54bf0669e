// Quality analysis module
// Noise, SNR, timing regularity, energy segmentation and spectral stability

pub mod noise;
pub mod report;
pub mod segments;
pub mod stability;
pub mod timing;

use serde::{Deserialize, Serialize};

pub use noise::{estimate_noise_profile, snr_estimate, NoiseProfile, QualityLabel};
pub use report::{QualityAnalyzer, QualityReport};
pub use segments::{segment_by_energy, EnergySegment};
pub use stability::{spectral_stability, SpectralStability};
pub use timing::{extract_timing_pattern, TimingPattern};

/// Configuration for quality analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Length of the leading region treated as background noise
    pub noise_window_secs: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        QualityConfig {
            noise_window_secs: 0.5,
        }
    }
}
