// Detection quality report
// Auxiliary diagnostics for a run; never feeds back into detection

use serde::{Deserialize, Serialize};

use crate::events::types::{Detection, FeatureFrameSet};
use crate::quality::noise::{estimate_noise_profile, snr_estimate, NoiseProfile, QualityLabel};
use crate::quality::segments::segment_by_energy;
use crate::quality::stability::{spectral_stability, SpectralStability};
use crate::quality::timing::{extract_timing_pattern, TimingPattern};
use crate::quality::QualityConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub snr_db: f64,

    #[serde(rename = "audio_quality")]
    pub quality: QualityLabel,

    pub num_detections: usize,

    /// `None` when fewer than two detections exist
    #[serde(rename = "timing_info")]
    pub timing: Option<TimingPattern>,

    pub noise_profile: NoiseProfile,

    /// Number of high-energy regions
    pub num_segments: usize,

    pub spectral_stability: SpectralStability,
}

/// Builds quality reports from a buffer, its features and its detections
#[derive(Debug, Clone, Default)]
pub struct QualityAnalyzer {
    config: QualityConfig,
}

impl QualityAnalyzer {
    pub fn new(config: QualityConfig) -> Self {
        QualityAnalyzer { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Analyze one run
    ///
    /// `detections` may hold both classes in any order; they are pooled for the
    /// timing pattern.
    pub fn analyze(
        &self,
        samples: &[f32],
        frames: &FeatureFrameSet,
        detections: &[Detection],
    ) -> QualityReport {
        let noise_profile =
            estimate_noise_profile(samples, frames.sample_rate, self.config.noise_window_secs);
        let snr_db = snr_estimate(samples, &noise_profile);

        let times: Vec<f64> = detections
            .iter()
            .map(|d| frames.frame_to_secs(d.frame_index))
            .collect();
        let timing = extract_timing_pattern(&times);

        let segments = segment_by_energy(&frames.rms, frames.frame_duration_secs());
        let stability = spectral_stability(&frames.spectral_centroid);

        log::info!(
            "Quality: SNR {:.1} dB ({}), {} detections, {} energy segments",
            snr_db,
            QualityLabel::from_snr(snr_db),
            detections.len(),
            segments.len()
        );

        QualityReport {
            snr_db,
            quality: QualityLabel::from_snr(snr_db),
            num_detections: detections.len(),
            timing,
            noise_profile,
            num_segments: segments.len(),
            spectral_stability: stability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::EventClass;

    #[test]
    fn test_report_for_silence_is_finite() {
        let samples = vec![0.0f32; 22050];
        let frames = FeatureFrameSet::zeros(44, 22050, 512);
        let report = QualityAnalyzer::default().analyze(&samples, &frames, &[]);

        assert!(report.snr_db.is_finite());
        assert_eq!(report.quality, QualityLabel::Low);
        assert_eq!(report.num_detections, 0);
        assert!(report.timing.is_none());
        assert_eq!(report.num_segments, 0);
    }

    #[test]
    fn test_timing_pools_classes() {
        let samples = vec![0.0f32; 22050 * 3];
        let frames = FeatureFrameSet::zeros(130, 22050, 512);
        let detections = [
            Detection::new(86, 0.9, EventClass::Clap),
            Detection::new(43, 0.9, EventClass::Clap),
            Detection::new(60, 0.6, EventClass::Whistle),
        ];

        let report = QualityAnalyzer::default().analyze(&samples, &frames, &detections);
        let timing = report.timing.unwrap();
        assert_eq!(timing.intervals.len(), 2);
        assert!((timing.intervals[0] - frames.frame_to_secs(17)).abs() < 1e-9);
        assert_eq!(report.num_detections, 3);
    }

    #[test]
    fn test_report_serializes_labels() {
        let samples = vec![0.0f32; 100];
        let frames = FeatureFrameSet::zeros(1, 22050, 512);
        let report = QualityAnalyzer::default().analyze(&samples, &frames, &[]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["audio_quality"], "LOW");
        assert!(json["timing_info"].is_null());
    }
}
