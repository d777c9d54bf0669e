// Short-time spectral analysis
// Centered STFT magnitudes, mel filterbank, cepstral transform and pitch-class folding

use realfft::num_complex::Complex;
use realfft::RealFftPlanner;

/// Number of frames for a centered analysis of `len` samples
///
/// Frames are centred on sample `i * hop_length`, so a non-empty buffer always
/// yields at least one frame.
pub fn centered_frame_count(len: usize, hop_length: usize) -> usize {
    if len == 0 || hop_length == 0 {
        return 0;
    }
    1 + len / hop_length
}

/// Samples of frame `index`, zero-padded past either end of the buffer
pub fn centered_frame(samples: &[f32], index: usize, frame_length: usize, hop_length: usize) -> Vec<f32> {
    let half = (frame_length / 2) as isize;
    let start = (index * hop_length) as isize - half;

    (0..frame_length as isize)
        .map(|offset| {
            let pos = start + offset;
            if pos >= 0 && (pos as usize) < samples.len() {
                samples[pos as usize]
            } else {
                0.0
            }
        })
        .collect()
}

/// Periodic Hann window
pub fn hann_window(length: usize) -> Vec<f32> {
    if length == 0 {
        return Vec::new();
    }
    (0..length)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / length as f32).cos()))
        .collect()
}

/// Magnitude spectrogram, stored frame-major
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub sample_rate: u32,
    pub frame_length: usize,
    pub hop_length: usize,
    frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    /// Compute magnitudes of a Hann-windowed centered STFT
    pub fn compute(samples: &[f32], sample_rate: u32, frame_length: usize, hop_length: usize) -> Self {
        let num_frames = if frame_length == 0 {
            0
        } else {
            centered_frame_count(samples.len(), hop_length)
        };

        let mut frames = Vec::with_capacity(num_frames);
        if num_frames > 0 {
            let window = hann_window(frame_length);
            let mut planner = RealFftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(frame_length);
            let mut spectrum = fft.make_output_vec();

            for i in 0..num_frames {
                let mut buffer = centered_frame(samples, i, frame_length, hop_length);
                for (sample, w) in buffer.iter_mut().zip(&window) {
                    *sample *= w;
                }

                if let Err(err) = fft.process(&mut buffer, &mut spectrum) {
                    log::warn!("FFT failed on frame {}: {}", i, err);
                    spectrum.fill(Complex::new(0.0, 0.0));
                }
                frames.push(spectrum.iter().map(|c| c.norm()).collect());
            }
        }

        Spectrogram {
            sample_rate,
            frame_length,
            hop_length,
            frames,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Bins per frame: frame_length / 2 + 1
    pub fn num_bins(&self) -> usize {
        self.frame_length / 2 + 1
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        &self.frames[index]
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    /// Centre frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        if self.frame_length == 0 {
            return 0.0;
        }
        bin as f32 * self.sample_rate as f32 / self.frame_length as f32
    }
}

/// Convert a frequency in Hz to the mel scale
pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank spanning 0 Hz to Nyquist
///
/// Returns `num_filters` rows of `frame_length / 2 + 1` weights.
pub fn mel_filterbank(num_filters: usize, frame_length: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let num_bins = frame_length / 2 + 1;
    if num_filters == 0 || frame_length == 0 {
        return Vec::new();
    }

    let mel_high = hz_to_mel(sample_rate as f32 / 2.0);
    let hz_points: Vec<f32> = (0..num_filters + 2)
        .map(|i| mel_to_hz(mel_high * i as f32 / (num_filters + 1) as f32))
        .collect();
    let bin_hz = |k: usize| k as f32 * sample_rate as f32 / frame_length as f32;

    (0..num_filters)
        .map(|m| {
            let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
            (0..num_bins)
                .map(|k| {
                    let f = bin_hz(k);
                    let rising = (f - left) / (center - left).max(f32::EPSILON);
                    let falling = (right - f) / (right - center).max(f32::EPSILON);
                    rising.min(falling).max(0.0)
                })
                .collect()
        })
        .collect()
}

/// Mel-band power of one magnitude frame
pub fn apply_filterbank(magnitudes: &[f32], filterbank: &[Vec<f32>]) -> Vec<f32> {
    filterbank
        .iter()
        .map(|filter| {
            filter
                .iter()
                .zip(magnitudes)
                .map(|(w, m)| w * m * m)
                .sum()
        })
        .collect()
}

/// Convert power values to decibels relative to the loudest value
///
/// Values are floored at `max_db - top_db`. An all-zero input maps to all zeros.
pub fn power_to_db(power: &mut [Vec<f32>], top_db: f32) {
    const AMIN: f32 = 1e-10;

    let reference = power
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(0.0f32, f32::max)
        .max(AMIN);
    let ref_db = 10.0 * reference.log10();

    let mut max_db = f32::NEG_INFINITY;
    for row in power.iter_mut() {
        for value in row.iter_mut() {
            *value = 10.0 * value.max(AMIN).log10() - ref_db;
            max_db = max_db.max(*value);
        }
    }

    let floor = max_db - top_db;
    for row in power.iter_mut() {
        for value in row.iter_mut() {
            *value = value.max(floor);
        }
    }
}

/// Orthonormal DCT-II, keeping the first `num_coeffs` coefficients
pub fn dct_ii(input: &[f32], num_coeffs: usize) -> Vec<f32> {
    let n = input.len();
    if n == 0 {
        return Vec::new();
    }

    let scale_first = (1.0 / n as f32).sqrt();
    let scale_rest = (2.0 / n as f32).sqrt();

    (0..num_coeffs.min(n))
        .map(|k| {
            let sum: f32 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f32::consts::PI * (i as f32 + 0.5) * k as f32 / n as f32).cos()
                })
                .sum();
            sum * if k == 0 { scale_first } else { scale_rest }
        })
        .collect()
}

/// Pitch class (0 = C) of a frequency, or `None` outside the audible pitch range
pub fn pitch_class(hz: f32) -> Option<usize> {
    if !(20.0..=12_000.0).contains(&hz) {
        return None;
    }
    let midi = 69.0 + 12.0 * (hz / 440.0).log2();
    Some((midi.round() as i64).rem_euclid(12) as usize)
}

/// Fold one magnitude frame into 12 pitch classes and return the L2 norm of
/// the normalized class energies
///
/// A single pure tone gives a value close to 1.0; broadband noise spreads
/// evenly and gives about 0.29; silence gives 0.0. Higher means more tonal.
pub fn chroma_concentration(magnitudes: &[f32], bin_frequency: impl Fn(usize) -> f32) -> f32 {
    let mut classes = [0.0f32; 12];
    for (bin, &magnitude) in magnitudes.iter().enumerate().skip(1) {
        if let Some(class) = pitch_class(bin_frequency(bin)) {
            classes[class] += magnitude * magnitude;
        }
    }

    let total: f32 = classes.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    classes.iter().map(|e| (e / total).powi(2)).sum::<f32>().sqrt()
}
