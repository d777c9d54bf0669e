// Candidate filtering
// Reduces scored candidates to one detection per real event. Discrete
// transients use greedy suppression, sustained sounds use run-length clustering.

use serde::{Deserialize, Serialize};

use crate::events::types::{DetectionCandidate, EventClass, FeatureFrameSet};

/// Per-class minimum spacing of detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum time between two accepted claps
    pub clap_min_separation_secs: f64,

    /// Gap that splits whistle candidates into separate clusters
    pub whistle_min_duration_secs: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            clap_min_separation_secs: 0.3,
            whistle_min_duration_secs: 0.1,
        }
    }
}

/// Candidate filtering strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Greedy non-maximum suppression: strongest candidates first, reject any
    /// candidate closer than `min_distance` frames to an accepted one
    Suppress { min_distance: usize },

    /// Group frame-ordered candidates whose gap is below `min_gap` frames and
    /// keep the best-scoring frame of each group
    Cluster { min_gap: usize },
}

impl FilterMode {
    /// Strategy and spacing used for an event class
    pub fn for_class(class: EventClass, config: &FilterConfig, frames: &FeatureFrameSet) -> Self {
        match class {
            EventClass::Clap => FilterMode::Suppress {
                min_distance: frames.secs_to_frames(config.clap_min_separation_secs),
            },
            EventClass::Whistle => FilterMode::Cluster {
                min_gap: frames.secs_to_frames(config.whistle_min_duration_secs),
            },
        }
    }

    /// Guaranteed minimum spacing (in frames) between filtered detections
    pub fn min_separation(&self) -> usize {
        match *self {
            FilterMode::Suppress { min_distance } => min_distance,
            FilterMode::Cluster { min_gap } => min_gap,
        }
    }

    /// Filter candidates; output is strictly increasing in frame index
    pub fn apply(&self, candidates: &[DetectionCandidate]) -> Vec<DetectionCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        match *self {
            FilterMode::Suppress { min_distance } => suppress(candidates, min_distance),
            FilterMode::Cluster { min_gap } => cluster(candidates, min_gap),
        }
    }
}

fn suppress(candidates: &[DetectionCandidate], min_distance: usize) -> Vec<DetectionCandidate> {
    let mut by_score = candidates.to_vec();
    by_score.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.frame_index.cmp(&b.frame_index))
    });

    let mut accepted: Vec<DetectionCandidate> = Vec::new();
    for candidate in by_score {
        let too_close = accepted
            .iter()
            .any(|kept| kept.frame_index.abs_diff(candidate.frame_index) < min_distance.max(1));
        if !too_close {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|c| c.frame_index);
    accepted
}

fn cluster(candidates: &[DetectionCandidate], min_gap: usize) -> Vec<DetectionCandidate> {
    let mut by_frame = candidates.to_vec();
    by_frame.sort_by_key(|c| c.frame_index);
    by_frame.dedup_by_key(|c| c.frame_index);

    let mut representatives = Vec::new();
    let mut best = by_frame[0];
    let mut last_frame = by_frame[0].frame_index;

    for candidate in by_frame.into_iter().skip(1) {
        if candidate.frame_index - last_frame < min_gap {
            // Same cluster; earliest frame wins ties
            if candidate.score > best.score {
                best = candidate;
            }
        } else {
            representatives.push(best);
            best = candidate;
        }
        last_frame = candidate.frame_index;
    }
    representatives.push(best);

    representatives
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(pairs: &[(usize, f32)]) -> Vec<DetectionCandidate> {
        pairs
            .iter()
            .map(|&(frame, score)| DetectionCandidate::new(frame, score))
            .collect()
    }

    fn frames_of(detections: &[DetectionCandidate]) -> Vec<usize> {
        detections.iter().map(|c| c.frame_index).collect()
    }

    #[test]
    fn test_suppress_keeps_strongest_in_neighbourhood() {
        let mode = FilterMode::Suppress { min_distance: 12 };
        let input = candidates(&[(40, 0.6), (43, 0.9), (50, 0.7), (86, 0.8)]);

        let output = mode.apply(&input);
        assert_eq!(frames_of(&output), vec![43, 86]);
        assert_eq!(output[0].score, 0.9);
    }

    #[test]
    fn test_suppress_boundary_distance_is_allowed() {
        let mode = FilterMode::Suppress { min_distance: 12 };
        let input = candidates(&[(10, 0.9), (22, 0.8), (21, 0.85)]);

        // 21 is too close to 10; 22 sits exactly at the minimum distance
        let output = mode.apply(&input);
        assert_eq!(frames_of(&output), vec![10, 22]);
    }

    #[test]
    fn test_suppress_output_sorted_by_frame() {
        let mode = FilterMode::Suppress { min_distance: 5 };
        let input = candidates(&[(90, 0.9), (10, 0.7), (50, 0.8)]);
        assert_eq!(frames_of(&mode.apply(&input)), vec![10, 50, 90]);
    }

    #[test]
    fn test_cluster_collapses_runs() {
        let mode = FilterMode::Cluster { min_gap: 4 };
        let input = candidates(&[
            (20, 0.55),
            (21, 0.65),
            (23, 0.60),
            (26, 0.60),
            // gap of 4 starts a new cluster
            (30, 0.70),
            (31, 0.75),
        ]);

        let output = mode.apply(&input);
        assert_eq!(frames_of(&output), vec![21, 31]);
    }

    #[test]
    fn test_cluster_tie_keeps_earliest() {
        let mode = FilterMode::Cluster { min_gap: 4 };
        let input = candidates(&[(5, 0.65), (6, 0.65), (7, 0.65)]);
        assert_eq!(frames_of(&mode.apply(&input)), vec![5]);
    }

    #[test]
    fn test_cluster_accepts_unsorted_input() {
        let mode = FilterMode::Cluster { min_gap: 4 };
        let input = candidates(&[(60, 0.6), (2, 0.7), (1, 0.6)]);
        assert_eq!(frames_of(&mode.apply(&input)), vec![2, 60]);
    }

    #[test]
    fn test_empty_input() {
        assert!(FilterMode::Suppress { min_distance: 12 }.apply(&[]).is_empty());
        assert!(FilterMode::Cluster { min_gap: 4 }.apply(&[]).is_empty());
    }

    #[test]
    fn test_output_respects_min_separation() {
        let input: Vec<DetectionCandidate> = (0..300)
            .filter(|i| i % 3 != 0)
            .map(|i| DetectionCandidate::new(i, ((i * 37) % 100) as f32 / 100.0))
            .collect();

        for mode in [
            FilterMode::Suppress { min_distance: 12 },
            FilterMode::Cluster { min_gap: 4 },
        ] {
            let output = mode.apply(&input);
            assert!(!output.is_empty());
            for pair in output.windows(2) {
                assert!(pair[1].frame_index > pair[0].frame_index);
                assert!(pair[1].frame_index - pair[0].frame_index >= mode.min_separation());
            }
        }
    }

    #[test]
    fn test_modes_for_classes() {
        let frames = FeatureFrameSet::zeros(10, 22050, 512);
        let config = FilterConfig::default();

        assert_eq!(
            FilterMode::for_class(EventClass::Clap, &config, &frames),
            FilterMode::Suppress { min_distance: 12 }
        );
        assert_eq!(
            FilterMode::for_class(EventClass::Whistle, &config, &frames),
            FilterMode::Cluster { min_gap: 4 }
        );
    }
}
