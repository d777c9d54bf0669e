// Frame-level feature extraction
// Turns a mono buffer into the per-frame channels consumed by the scorers

use serde::{Deserialize, Serialize};

use crate::audio::hpss::{hpss_energies, HpssParams};
use crate::audio::spectral::{
    apply_filterbank, centered_frame, chroma_concentration, dct_ii, mel_filterbank, power_to_db,
    Spectrogram,
};
use crate::events::types::{FeatureFrameSet, Subband};

/// Source of per-frame features
///
/// Implementations must be pure: the same samples always give the same frames.
pub trait FeatureProvider {
    /// Extract every feature channel from a mono buffer
    fn extract(&self, samples: &[f32], sample_rate: u32) -> FeatureFrameSet;

    /// Hop between frames in samples
    fn hop_length(&self) -> usize;
}

/// Tuning of the spectral feature provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Number of mel bands used for onset strength, spectral variation and MFCCs
    pub n_mels: usize,

    /// Number of cepstral coefficients kept per frame
    pub n_mfcc: usize,

    /// Fraction of spectral magnitude below the rolloff frequency
    pub rolloff_percent: f32,

    /// Dynamic range kept by the dB conversion
    pub top_db: f32,

    pub hpss: HpssParams,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            n_mels: 128,
            n_mfcc: 13,
            rolloff_percent: 0.85,
            top_db: 80.0,
            hpss: HpssParams::default(),
        }
    }
}

/// STFT-based feature provider
#[derive(Debug, Clone)]
pub struct SpectralFeatureProvider {
    frame_length: usize,
    hop_length: usize,
    config: FeatureConfig,
}

impl SpectralFeatureProvider {
    pub fn new(frame_length: usize, hop_length: usize, config: FeatureConfig) -> Self {
        SpectralFeatureProvider {
            frame_length,
            hop_length,
            config,
        }
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }
}

impl Default for SpectralFeatureProvider {
    fn default() -> Self {
        SpectralFeatureProvider::new(2048, 512, FeatureConfig::default())
    }
}

impl FeatureProvider for SpectralFeatureProvider {
    fn hop_length(&self) -> usize {
        self.hop_length
    }

    fn extract(&self, samples: &[f32], sample_rate: u32) -> FeatureFrameSet {
        let spec = Spectrogram::compute(samples, sample_rate, self.frame_length, self.hop_length);
        let num_frames = spec.num_frames();
        let mut frames = FeatureFrameSet::zeros(num_frames, sample_rate, self.hop_length);

        if num_frames == 0 {
            return frames;
        }

        // Time-domain channels
        for i in 0..num_frames {
            let frame = centered_frame(samples, i, self.frame_length, self.hop_length);
            frames.zcr[i] = calculate_zcr(&frame);
            frames.rms[i] = calculate_rms(&frame);
        }

        // Single-frame spectral channels
        for i in 0..num_frames {
            let magnitudes = spec.frame(i);
            let bin_hz = |k: usize| spec.bin_frequency(k);

            frames.spectral_centroid[i] = calculate_spectral_centroid(magnitudes, bin_hz);
            frames.spectral_rolloff[i] =
                calculate_spectral_rolloff(magnitudes, bin_hz, self.config.rolloff_percent);
            frames.peak_to_average[i] = calculate_peak_to_average(magnitudes);
            frames.chroma_energy[i] = chroma_concentration(magnitudes, bin_hz);

            for band in Subband::ALL {
                frames.subbands.band_mut(band)[i] =
                    calculate_band_energy(magnitudes, bin_hz, band.range_hz(sample_rate));
            }
        }

        // Harmonic / percussive split
        let energies = hpss_energies(&spec, &self.config.hpss);
        frames.harmonic_energy = energies.harmonic;
        frames.percussive_energy = energies.percussive;

        // Mel-domain channels
        let bank = mel_filterbank(self.config.n_mels, self.frame_length, sample_rate);
        let mut mel_db: Vec<Vec<f32>> = spec
            .frames()
            .iter()
            .map(|magnitudes| apply_filterbank(magnitudes, &bank))
            .collect();
        power_to_db(&mut mel_db, self.config.top_db);

        frames.onset_strength = onset_strength(&mel_db);
        for (i, bands) in mel_db.iter().enumerate() {
            frames.spectral_variation[i] = population_variance(bands).sqrt();
            let mfcc = dct_ii(bands, self.config.n_mfcc);
            frames.mfcc_variance[i] = population_variance(&mfcc);
        }

        log::debug!(
            "Extracted {} frames ({} samples @ {} Hz, hop {})",
            num_frames,
            samples.len(),
            sample_rate,
            self.hop_length
        );

        debug_assert!(frames.is_consistent());
        frames
    }
}

/// Calculate Zero-Crossing Rate (ZCR)
/// Returns the rate of sign changes in the signal
/// Higher ZCR indicates noisy/unvoiced content
fn calculate_zcr(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[1] >= 0.0) != (pair[0] >= 0.0))
        .count();

    crossings as f32 / (samples.len() - 1) as f32
}

fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Calculate spectral centroid (center of mass of spectrum)
/// Returns frequency in Hz
fn calculate_spectral_centroid(spectrum: &[f32], bin_hz: impl Fn(usize) -> f32) -> f32 {
    let mut weighted_sum = 0.0;
    let mut total_magnitude = 0.0;

    for (i, &magnitude) in spectrum.iter().enumerate() {
        weighted_sum += bin_hz(i) * magnitude;
        total_magnitude += magnitude;
    }

    if total_magnitude > 0.0 {
        weighted_sum / total_magnitude
    } else {
        0.0
    }
}

/// Lowest frequency below which `percent` of the spectral magnitude lies
fn calculate_spectral_rolloff(spectrum: &[f32], bin_hz: impl Fn(usize) -> f32, percent: f32) -> f32 {
    let total: f32 = spectrum.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let target = percent * total;
    let mut cumulative = 0.0;
    for (i, &magnitude) in spectrum.iter().enumerate() {
        cumulative += magnitude;
        if cumulative >= target {
            return bin_hz(i);
        }
    }
    bin_hz(spectrum.len().saturating_sub(1))
}

fn calculate_peak_to_average(spectrum: &[f32]) -> f32 {
    if spectrum.is_empty() {
        return 0.0;
    }
    let max = spectrum.iter().copied().fold(0.0f32, f32::max);
    let mean = spectrum.iter().sum::<f32>() / spectrum.len() as f32;
    max / (mean + 1e-8)
}

/// Sum of magnitudes for bins in [low, high) Hz
fn calculate_band_energy(spectrum: &[f32], bin_hz: impl Fn(usize) -> f32, range: (f32, f32)) -> f32 {
    let (low, high) = range;
    spectrum
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let f = bin_hz(*i);
            f >= low && f < high
        })
        .map(|(_, &m)| m)
        .sum()
}

/// Mean rise in dB across mel bands from each frame to the next
///
/// Decreases are rectified to zero. The first frame has nothing to compare
/// against and gets 0.
fn onset_strength(mel_db: &[Vec<f32>]) -> Vec<f32> {
    let mut onset = vec![0.0; mel_db.len()];
    for (i, pair) in mel_db.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        if current.is_empty() {
            continue;
        }
        let rise: f32 = current
            .iter()
            .zip(previous)
            .map(|(curr, prev)| (curr - prev).max(0.0))
            .sum();
        onset[i + 1] = rise / current.len() as f32;
    }
    onset
}

fn population_variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n
}
