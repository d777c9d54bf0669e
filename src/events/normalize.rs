// Per-buffer z-score normalization of feature channels
// Each detection run fits its own scaler; nothing is shared between runs

/// Added to the standard deviation before dividing
pub const NORM_EPSILON: f64 = 1e-8;

/// A feature channel rescaled to zero mean and unit variance
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedChannel {
    values: Vec<f32>,
    mean: f64,
    std_dev: f64,
    degenerate: bool,
}

impl NormalizedChannel {
    /// Normalized value at a frame
    ///
    /// Returns `None` for out-of-range frames and for every frame of a
    /// degenerate (constant) channel, so a gate reading it cannot fire.
    pub fn get(&self, frame_index: usize) -> Option<f32> {
        if self.degenerate {
            return None;
        }
        self.values.get(frame_index).copied()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// True when the channel has no variation (silence, constant input)
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

/// Z-score scaler: (value - mean) / (std + epsilon)
#[derive(Debug, Clone)]
pub struct FeatureScaler {
    epsilon: f64,
}

impl FeatureScaler {
    pub fn new() -> Self {
        FeatureScaler {
            epsilon: NORM_EPSILON,
        }
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        FeatureScaler { epsilon }
    }

    /// Fit mean and population standard deviation over the whole channel and
    /// rescale it
    ///
    /// Non-finite inputs are treated as zero.
    pub fn fit_transform(&self, values: &[f32]) -> NormalizedChannel {
        if values.is_empty() {
            return NormalizedChannel {
                values: Vec::new(),
                mean: 0.0,
                std_dev: 0.0,
                degenerate: true,
            };
        }

        let clean = |v: f32| if v.is_finite() { v as f64 } else { 0.0 };
        let n = values.len() as f64;
        let mean = values.iter().map(|&v| clean(v)).sum::<f64>() / n;
        let variance = values
            .iter()
            .map(|&v| (clean(v) - mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();

        // Relative tolerance keeps constant channels with large magnitudes
        // (e.g. a centroid in Hz) degenerate despite rounding in the mean
        let degenerate = std_dev <= self.epsilon * mean.abs().max(1.0);

        let normalized = values
            .iter()
            .map(|&v| ((clean(v) - mean) / (std_dev + self.epsilon)) as f32)
            .collect();

        NormalizedChannel {
            values: normalized,
            mean,
            std_dev,
            degenerate,
        }
    }
}

impl Default for FeatureScaler {
    fn default() -> Self {
        Self::new()
    }
}
