// Timing regularity between detections
// Uses inter-onset intervals of all detections, regardless of class

use serde::{Deserialize, Serialize};

const TIMING_EPSILON: f64 = 1e-8;

/// Coefficient of variation below which spacing counts as regular
pub const REGULARITY_THRESHOLD: f64 = 0.3;

/// Spacing statistics of a detection sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPattern {
    /// Seconds between consecutive detections
    pub intervals: Vec<f64>,

    pub mean_interval: f64,

    /// Population standard deviation of the intervals
    pub std_interval: f64,

    /// std / mean below 0.3
    pub is_regular: bool,

    /// 60 / mean interval
    pub bpm: f64,
}

/// Compute the timing pattern of detection times (seconds)
///
/// Times are sorted before differencing. Returns `None` with fewer than two
/// detections.
pub fn extract_timing_pattern(times_secs: &[f64]) -> Option<TimingPattern> {
    if times_secs.len() < 2 {
        return None;
    }

    let mut times = times_secs.to_vec();
    times.sort_by(|a, b| a.total_cmp(b));

    let intervals = compute_iois(&times);
    let n = intervals.len() as f64;
    let mean_interval = intervals.iter().sum::<f64>() / n;
    let std_interval = (intervals
        .iter()
        .map(|x| (x - mean_interval).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    Some(TimingPattern {
        is_regular: std_interval / (mean_interval + TIMING_EPSILON) < REGULARITY_THRESHOLD,
        bpm: 60.0 / (mean_interval + TIMING_EPSILON),
        intervals,
        mean_interval,
        std_interval,
    })
}

/// Compute inter-onset intervals (time between consecutive detections)
fn compute_iois(times: &[f64]) -> Vec<f64> {
    times.windows(2).map(|pair| pair[1] - pair[0]).collect()
}
