//! Harmonic-percussive separation of a magnitude spectrogram.
//!
//! Harmonic content is stable across time (horizontal median), percussive
//! content is broadband within a frame (vertical median). Each component is
//! recovered with Wiener-like soft masks and reduced to one energy value per
//! frame.

use serde::{Deserialize, Serialize};

use crate::audio::spectral::Spectrogram;

/// Median filter widths for separation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HpssParams {
    /// Width of the time-axis median filter in frames.
    pub harmonic_width: usize,
    /// Width of the frequency-axis median filter in bins.
    pub percussive_width: usize,
}

impl Default for HpssParams {
    fn default() -> Self {
        Self {
            harmonic_width: 17,
            percussive_width: 17,
        }
    }
}

/// Per-frame energy of the harmonic and percussive components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HpssEnergies {
    pub harmonic: Vec<f32>,
    pub percussive: Vec<f32>,
}

/// Separate a spectrogram and measure each component per frame.
///
/// Frame energy is `sqrt(sum(masked_magnitude^2)) / frame_length`.
pub fn hpss_energies(spec: &Spectrogram, params: &HpssParams) -> HpssEnergies {
    let mags = spec.frames();
    if mags.is_empty() {
        return HpssEnergies::default();
    }

    let harmonic_mags = median_filter_horizontal(mags, params.harmonic_width.max(1));
    let percussive_mags = median_filter_vertical(mags, params.percussive_width.max(1));

    let eps = 1e-10f32;
    let norm = spec.frame_length.max(1) as f32;
    let mut harmonic = Vec::with_capacity(mags.len());
    let mut percussive = Vec::with_capacity(mags.len());

    for (frame_idx, frame) in mags.iter().enumerate() {
        let mut h_sum = 0.0f32;
        let mut p_sum = 0.0f32;

        for (bin, &magnitude) in frame.iter().enumerate() {
            let h2 = harmonic_mags[frame_idx][bin].powi(2);
            let p2 = percussive_mags[frame_idx][bin].powi(2);
            let denom = h2 + p2 + eps;

            h_sum += (magnitude * h2 / denom).powi(2);
            p_sum += (magnitude * p2 / denom).powi(2);
        }

        harmonic.push(h_sum.sqrt() / norm);
        percussive.push(p_sum.sqrt() / norm);
    }

    HpssEnergies {
        harmonic,
        percussive,
    }
}

fn median(scratch: &mut [f32]) -> f32 {
    let mid = scratch.len() / 2;
    *scratch.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
}

/// Time-axis median for every bin; the window is truncated at the edges.
fn median_filter_horizontal(mags: &[Vec<f32>], width: usize) -> Vec<Vec<f32>> {
    let num_frames = mags.len();
    let num_bins = mags[0].len();
    let half = width / 2;
    let mut result = Vec::with_capacity(num_frames);
    let mut scratch = Vec::with_capacity(width);

    for frame_idx in 0..num_frames {
        let start = frame_idx.saturating_sub(half);
        let end = (frame_idx + half + 1).min(num_frames);

        let mut row = Vec::with_capacity(num_bins);
        for bin in 0..num_bins {
            scratch.clear();
            scratch.extend(mags[start..end].iter().map(|frame| frame[bin]));
            row.push(median(&mut scratch));
        }
        result.push(row);
    }

    result
}

/// Frequency-axis median within every frame; the window is truncated at the edges.
fn median_filter_vertical(mags: &[Vec<f32>], width: usize) -> Vec<Vec<f32>> {
    let half = width / 2;
    let mut scratch = Vec::with_capacity(width);

    mags.iter()
        .map(|frame| {
            let num_bins = frame.len();
            (0..num_bins)
                .map(|bin| {
                    let start = bin.saturating_sub(half);
                    let end = (bin + half + 1).min(num_bins);
                    scratch.clear();
                    scratch.extend_from_slice(&frame[start..end]);
                    median(&mut scratch)
                })
                .collect()
        })
        .collect()
}
