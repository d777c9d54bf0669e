// Explainability module
// Aggregates scoring data to show why a frame was reported as an event

use serde::{Deserialize, Serialize};

use crate::events::heuristic::GateBreakdown;
use crate::events::types::{Detection, EventClass, FeatureFrameSet};

/// Complete decision information for a single detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionDecision {
    // --- Detection ---
    pub frame_index: usize,
    pub time_secs: f64,
    pub class: EventClass,
    pub confidence: f32,

    // --- Scoring ---
    pub breakdown: GateBreakdown,

    // --- Raw feature ratios ---
    /// Harmonic over percussive energy at the frame
    pub harmonic_percussive_ratio: f32,

    /// Spectral centroid over rolloff at the frame
    pub centroid_rolloff_ratio: f32,

    // --- Explainability ---
    pub reasoning: String,
}

impl DetectionDecision {
    /// Create a decision object from scoring data
    pub fn from_scoring_data(
        detection: &Detection,
        frames: &FeatureFrameSet,
        breakdown: GateBreakdown,
    ) -> Self {
        let i = detection.frame_index;
        let mut reason_parts = Vec::new();

        // 1. Classification
        reason_parts.push(format!(
            "Classified as {} ({}% confidence).",
            detection.class.display_name(),
            detection.confidence_percent() as u32
        ));

        // 2. Gates
        let passed: Vec<&str> = breakdown
            .gates
            .iter()
            .filter(|outcome| outcome.passed)
            .map(|outcome| outcome.gate.feature.as_str())
            .collect();
        let failed: Vec<&str> = breakdown
            .gates
            .iter()
            .filter(|outcome| !outcome.passed)
            .map(|outcome| outcome.gate.feature.as_str())
            .collect();

        if passed.is_empty() {
            reason_parts.push("No feature gates passed.".to_string());
        } else {
            reason_parts.push(format!("Gates passed: {}.", passed.join(", ")));
        }
        if !failed.is_empty() {
            reason_parts.push(format!("Gates failed: {}.", failed.join(", ")));
        }

        // 3. Onset term (claps only)
        if breakdown.onset_contribution > 0.0 {
            reason_parts.push(format!(
                "Onset strength added {:.2}.",
                breakdown.onset_contribution
            ));
        }

        let ratio = |num: Option<&f32>, den: Option<&f32>| match (num, den) {
            (Some(n), Some(d)) => n / (d + 1e-8),
            _ => 0.0,
        };

        DetectionDecision {
            frame_index: i,
            time_secs: frames.frame_to_secs(i),
            class: detection.class,
            confidence: detection.score,
            harmonic_percussive_ratio: ratio(
                frames.harmonic_energy.get(i),
                frames.percussive_energy.get(i),
            ),
            centroid_rolloff_ratio: ratio(
                frames.spectral_centroid.get(i),
                frames.spectral_rolloff.get(i),
            ),
            breakdown,
            reasoning: reason_parts.join(" "),
        }
    }
}
