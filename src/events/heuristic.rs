// Heuristic (rule-based) event scoring
// Scores frames for each event class from z-normalized features using
// binary gates: a feature contributes its full weight or nothing

use serde::{Deserialize, Serialize};

use crate::events::normalize::{FeatureScaler, NormalizedChannel};
use crate::events::peaks::find_peaks;
use crate::events::types::{DetectionCandidate, EventClass, FeatureFrameSet};

/// Feature channels a gate can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateFeature {
    Zcr,
    PercussiveEnergy,
    HarmonicEnergy,
    PeakToAverage,
    /// High-band over bass-band energy
    HighBassRatio,
    MfccVariance,
    ChromaEnergy,
    SpectralVariation,
}

impl GateFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateFeature::Zcr => "zcr",
            GateFeature::PercussiveEnergy => "percussive_energy",
            GateFeature::HarmonicEnergy => "harmonic_energy",
            GateFeature::PeakToAverage => "peak_to_average",
            GateFeature::HighBassRatio => "high_bass_ratio",
            GateFeature::MfccVariance => "mfcc_variance",
            GateFeature::ChromaEnergy => "chroma_energy",
            GateFeature::SpectralVariation => "spectral_variation",
        }
    }
}

/// Direction of a gate cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    Below,
}

/// A binary indicator: adds `weight` when the normalized feature passes `cutoff`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub feature: GateFeature,
    pub comparison: Comparison,
    pub cutoff: f32,
    pub weight: f32,
}

impl Gate {
    pub const fn above(feature: GateFeature, cutoff: f32, weight: f32) -> Self {
        Gate {
            feature,
            comparison: Comparison::Above,
            cutoff,
            weight,
        }
    }

    pub const fn below(feature: GateFeature, cutoff: f32, weight: f32) -> Self {
        Gate {
            feature,
            comparison: Comparison::Below,
            cutoff,
            weight,
        }
    }

    /// Whether the gate fires for a normalized value
    /// Missing values (degenerate channel) never fire
    pub fn passes(&self, value: Option<f32>) -> bool {
        match value {
            Some(v) => match self.comparison {
                Comparison::Above => v > self.cutoff,
                Comparison::Below => v < self.cutoff,
            },
            None => false,
        }
    }
}

/// Gates and weights for one event class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRule {
    pub gates: Vec<Gate>,

    /// Weight of the continuous onset-height term (peak height / max onset)
    /// Zero disables it
    #[serde(default)]
    pub onset_weight: f32,
}

impl ClassRule {
    /// Sum of gate weights and the onset weight
    pub fn total_weight(&self) -> f32 {
        self.gates.iter().map(|g| g.weight).sum::<f32>() + self.onset_weight
    }

    /// Default clap rule: broadband transients
    pub fn clap_default() -> Self {
        ClassRule {
            gates: vec![
                Gate::above(GateFeature::Zcr, 0.4, 0.25),
                Gate::above(GateFeature::PercussiveEnergy, 0.3, 0.25),
                Gate::above(GateFeature::PeakToAverage, 0.5, 0.20),
                Gate::above(GateFeature::HighBassRatio, 0.3, 0.20),
            ],
            onset_weight: 0.10,
        }
    }

    /// Default whistle rule: steady tonal content
    pub fn whistle_default() -> Self {
        ClassRule {
            gates: vec![
                Gate::below(GateFeature::Zcr, -0.3, 0.25),
                Gate::above(GateFeature::HarmonicEnergy, 0.3, 0.25),
                Gate::below(GateFeature::MfccVariance, 0.3, 0.20),
                Gate::above(GateFeature::ChromaEnergy, 0.2, 0.15),
                Gate::below(GateFeature::SpectralVariation, 0.5, 0.15),
            ],
            onset_weight: 0.0,
        }
    }
}

/// Onset peak pre-selection for clap candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakSelection {
    /// Minimum peak height as a fraction of the onset maximum
    pub min_height_fraction: f32,

    /// Minimum spacing between onset peaks in seconds
    pub min_distance_secs: f64,
}

impl Default for PeakSelection {
    fn default() -> Self {
        PeakSelection {
            min_height_fraction: 0.2,
            min_distance_secs: 0.1,
        }
    }
}

/// Configuration for the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub clap: ClassRule,
    pub whistle: ClassRule,
    pub clap_peaks: PeakSelection,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            clap: ClassRule::clap_default(),
            whistle: ClassRule::whistle_default(),
            clap_peaks: PeakSelection::default(),
        }
    }
}

/// All gate features of one buffer, normalized by a single scaler fit
#[derive(Debug, Clone)]
pub struct NormalizedFeatures {
    zcr: NormalizedChannel,
    percussive: NormalizedChannel,
    harmonic: NormalizedChannel,
    peak_to_average: NormalizedChannel,
    high_bass_ratio: NormalizedChannel,
    mfcc_variance: NormalizedChannel,
    chroma: NormalizedChannel,
    spectral_variation: NormalizedChannel,
}

impl NormalizedFeatures {
    pub fn fit(scaler: &FeatureScaler, frames: &FeatureFrameSet) -> Self {
        NormalizedFeatures {
            zcr: scaler.fit_transform(&frames.zcr),
            percussive: scaler.fit_transform(&frames.percussive_energy),
            harmonic: scaler.fit_transform(&frames.harmonic_energy),
            peak_to_average: scaler.fit_transform(&frames.peak_to_average),
            high_bass_ratio: scaler.fit_transform(&frames.subbands.high_to_bass_ratio()),
            mfcc_variance: scaler.fit_transform(&frames.mfcc_variance),
            chroma: scaler.fit_transform(&frames.chroma_energy),
            spectral_variation: scaler.fit_transform(&frames.spectral_variation),
        }
    }

    pub fn channel(&self, feature: GateFeature) -> &NormalizedChannel {
        match feature {
            GateFeature::Zcr => &self.zcr,
            GateFeature::PercussiveEnergy => &self.percussive,
            GateFeature::HarmonicEnergy => &self.harmonic,
            GateFeature::PeakToAverage => &self.peak_to_average,
            GateFeature::HighBassRatio => &self.high_bass_ratio,
            GateFeature::MfccVariance => &self.mfcc_variance,
            GateFeature::ChromaEnergy => &self.chroma,
            GateFeature::SpectralVariation => &self.spectral_variation,
        }
    }

    pub fn value(&self, feature: GateFeature, frame_index: usize) -> Option<f32> {
        self.channel(feature).get(frame_index)
    }
}

/// Outcome of a single gate at one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub gate: Gate,

    /// Normalized feature value, `None` if the channel was degenerate
    pub value: Option<f32>,

    pub passed: bool,
}

/// Score of one frame with the contribution of each gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateBreakdown {
    pub class: EventClass,
    pub frame_index: usize,
    pub gates: Vec<GateOutcome>,

    /// Contribution of the onset-height term
    pub onset_contribution: f32,

    pub score: f32,
}

/// Rule-based scorer for clap and whistle frames
///
/// The scaler is owned by the scorer instance and refitted per buffer, so
/// repeated or concurrent runs never share normalization state.
pub struct HeuristicScorer {
    config: ScoringConfig,
    scaler: FeatureScaler,
}

impl HeuristicScorer {
    /// Create a scorer with default weights and cutoffs
    pub fn new() -> Self {
        HeuristicScorer::with_config(ScoringConfig::default())
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        HeuristicScorer {
            config,
            scaler: FeatureScaler::new(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Normalize every gate feature of a buffer
    pub fn normalize(&self, frames: &FeatureFrameSet) -> NormalizedFeatures {
        NormalizedFeatures::fit(&self.scaler, frames)
    }

    pub fn rule(&self, class: EventClass) -> &ClassRule {
        match class {
            EventClass::Clap => &self.config.clap,
            EventClass::Whistle => &self.config.whistle,
        }
    }

    /// Score clap candidates
    ///
    /// Only peaks of the onset-strength envelope are scored. Returns candidates
    /// whose score is strictly above `threshold`, in frame order.
    pub fn score_clap(
        &self,
        frames: &FeatureFrameSet,
        normalized: &NormalizedFeatures,
        threshold: f32,
    ) -> Vec<DetectionCandidate> {
        let onset_max = max_value(&frames.onset_strength);
        if onset_max <= 0.0 {
            return Vec::new();
        }

        let selection = &self.config.clap_peaks;
        let min_distance = frames.secs_to_frames(selection.min_distance_secs).max(1);
        let peaks = find_peaks(
            &frames.onset_strength,
            Some(onset_max * selection.min_height_fraction),
            min_distance,
        );

        log::debug!(
            "Clap scoring: {} onset peaks (distance {} frames)",
            peaks.len(),
            min_distance
        );

        peaks
            .iter()
            .filter_map(|peak| {
                let onset_term = peak.height / onset_max;
                let score = self.score_frame(&self.config.clap, normalized, peak.index, onset_term);
                (score > threshold).then(|| DetectionCandidate::new(peak.index, score))
            })
            .collect()
    }

    /// Score whistle candidates
    ///
    /// Every frame is scored. Returns candidates whose score is strictly above
    /// `threshold`, in frame order.
    pub fn score_whistle(
        &self,
        frames: &FeatureFrameSet,
        normalized: &NormalizedFeatures,
        threshold: f32,
    ) -> Vec<DetectionCandidate> {
        (0..frames.len())
            .filter_map(|i| {
                let score = self.score_frame(&self.config.whistle, normalized, i, 0.0);
                (score > threshold).then(|| DetectionCandidate::new(i, score))
            })
            .collect()
    }

    /// Explain the score of one frame gate by gate
    pub fn breakdown(
        &self,
        class: EventClass,
        frames: &FeatureFrameSet,
        normalized: &NormalizedFeatures,
        frame_index: usize,
    ) -> GateBreakdown {
        let rule = self.rule(class);

        let gates: Vec<GateOutcome> = rule
            .gates
            .iter()
            .map(|gate| {
                let value = normalized.value(gate.feature, frame_index);
                GateOutcome {
                    gate: *gate,
                    value,
                    passed: gate.passes(value),
                }
            })
            .collect();

        let onset_max = max_value(&frames.onset_strength);
        let onset_term = match frames.onset_strength.get(frame_index) {
            Some(&height) if onset_max > 0.0 => height / onset_max,
            _ => 0.0,
        };
        let onset_contribution = rule.onset_weight * onset_term;

        GateBreakdown {
            class,
            frame_index,
            score: self.score_frame(rule, normalized, frame_index, onset_term),
            gates,
            onset_contribution,
        }
    }

    fn score_frame(
        &self,
        rule: &ClassRule,
        normalized: &NormalizedFeatures,
        frame_index: usize,
        onset_term: f32,
    ) -> f32 {
        let gated: f32 = rule
            .gates
            .iter()
            .filter(|gate| gate.passes(normalized.value(gate.feature, frame_index)))
            .map(|gate| gate.weight)
            .sum();

        (gated + rule.onset_weight * onset_term).clamp(0.0, 1.0)
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn max_value(values: &[f32]) -> f32 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max)
}
