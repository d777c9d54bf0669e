// Energy-based segmentation
// Marks regions whose RMS stands clearly above the buffer average

use serde::{Deserialize, Serialize};

/// A contiguous run of high-energy frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySegment {
    pub start_secs: f64,
    pub end_secs: f64,

    /// Mean RMS over the segment
    pub energy: f32,
}

/// Split an RMS envelope into high-energy segments
///
/// A frame is high when its RMS exceeds mean + std of the envelope. A segment
/// ends at the first low frame after it; a run still open at the last frame is
/// not reported.
pub fn segment_by_energy(rms: &[f32], frame_duration_secs: f64) -> Vec<EnergySegment> {
    if rms.is_empty() {
        return Vec::new();
    }

    let n = rms.len() as f32;
    let mean = rms.iter().sum::<f32>() / n;
    let std = (rms.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt();
    let threshold = mean + std;

    let mut segments = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &value) in rms.iter().enumerate() {
        let is_high = value > threshold;
        match (is_high, start) {
            (true, None) => start = Some(i),
            (false, Some(first)) => {
                let run = &rms[first..i];
                segments.push(EnergySegment {
                    start_secs: first as f64 * frame_duration_secs,
                    end_secs: i as f64 * frame_duration_secs,
                    energy: run.iter().sum::<f32>() / run.len() as f32,
                });
                start = None;
            }
            _ => {}
        }
    }

    segments
}
