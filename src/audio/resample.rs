//! Band-limited sample-rate conversion to the analysis rate.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::ingest::AudioError;

/// Input frames handed to the sinc resampler per call
const CHUNK_SIZE: usize = 1024;

/// Windowed-sinc resampler for one mono stream
///
/// Wraps `rubato::SincFixedIn`. The low-pass cutoff sits just under the
/// lower of the two Nyquist rates, so content above the target Nyquist is
/// removed instead of folding back into the spectrum.
pub struct SincResampler {
    inner: SincFixedIn<f32>,
    ratio: f64,
}

impl SincResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self, AudioError> {
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let ratio = to_rate as f64 / from_rate as f64;
        let inner = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)?;
        Ok(Self { inner, ratio })
    }

    /// Resample a whole buffer
    ///
    /// The resampler's output delay is trimmed off, so sample `i` of the
    /// input lands at `i * ratio` in the output and the duration is kept.
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>, AudioError> {
        let output_len = (input.len() as f64 * self.ratio).round() as usize;
        if output_len == 0 {
            return Ok(Vec::new());
        }

        let delay = self.inner.output_delay();
        let mut output = Vec::with_capacity(output_len + delay + CHUNK_SIZE);
        let mut pos = 0;

        while input.len() - pos >= self.inner.input_frames_next() {
            let next = self.inner.input_frames_next();
            let block = [&input[pos..pos + next]];
            let out = self.inner.process(&block[..], None)?;
            output.extend_from_slice(&out[0]);
            pos += next;
        }

        if pos < input.len() {
            let block = [&input[pos..]];
            let out = self.inner.process_partial(Some(&block[..]), None)?;
            output.extend_from_slice(&out[0]);
        }

        // Flush the filter tail with silence
        while output.len() < output_len + delay {
            let out = self.inner.process_partial(None::<&[&[f32]]>, None)?;
            if out[0].is_empty() {
                break;
            }
            output.extend_from_slice(&out[0]);
        }

        output.drain(..delay.min(output.len()));
        output.resize(output_len, 0.0);
        Ok(output)
    }
}

/// Convert a buffer from `from_rate` to `to_rate`, preserving its duration.
///
/// Returns the input unchanged when the rates match.
pub fn resample_to_rate(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return Ok(input.to_vec());
    }

    log::debug!(
        "Resampling {} samples from {} Hz to {} Hz",
        input.len(),
        from_rate,
        to_rate
    );
    SincResampler::new(from_rate, to_rate)?.process_all(input)
}
