// Detection results
// Serializable record of one detection run, plus persistence and comparison

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::events::types::{Detection, EventClass};
use crate::quality::QualityReport;

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One reported event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionEntry {
    /// Seconds from the start of the buffer
    pub time: f64,

    /// Score as a percentage
    pub confidence: f32,

    pub frame: usize,
}

impl DetectionEntry {
    pub fn from_detection(detection: &Detection, hop_length: usize, sample_rate: u32) -> Self {
        DetectionEntry {
            time: detection.time_secs(hop_length, sample_rate),
            confidence: detection.confidence_percent(),
            frame: detection.frame_index,
        }
    }
}

/// Detections grouped by class, each list in frame order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDetections {
    pub claps: Vec<DetectionEntry>,
    pub whistles: Vec<DetectionEntry>,
}

impl ClassDetections {
    pub fn of(&self, class: EventClass) -> &[DetectionEntry] {
        match class {
            EventClass::Clap => &self.claps,
            EventClass::Whistle => &self.whistles,
        }
    }

    pub fn total(&self) -> usize {
        self.claps.len() + self.whistles.len()
    }
}

/// Complete outcome of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub run_id: Uuid,

    /// Source path or caller-supplied label
    pub file: String,

    /// SHA-256 of the input file, when read from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_sha256: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Buffer duration at the analysis rate
    pub duration_secs: f64,

    pub sample_rate: u32,
    pub hop_length: usize,

    pub detections: ClassDetections,

    #[serde(rename = "quality_metrics")]
    pub quality: QualityReport,
}

impl DetectionResult {
    pub fn count(&self, class: EventClass) -> usize {
        self.detections.of(class).len()
    }

    /// Write as pretty-printed JSON
    pub fn save_json(&self, path: &Path) -> Result<(), ResultsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Saved results to {}", path.display());
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, ResultsError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Multi-line human readable summary
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let quality = &self.quality;

        writeln!(f, "File: {}", self.file)?;
        writeln!(f, "Duration: {:.2}s", self.duration_secs)?;
        writeln!(
            f,
            "Signal-to-noise ratio: {:.2} dB ({})",
            quality.snr_db, quality.quality
        )?;
        writeln!(f, "Energy segments: {}", quality.num_segments)?;

        for class in EventClass::ALL {
            let entries = self.detections.of(class);
            writeln!(f, "{} detections: {}", class.display_name(), entries.len())?;
            for (i, entry) in entries.iter().enumerate() {
                writeln!(
                    f,
                    "  {} {}: {:.3}s | confidence {:.1}%",
                    class.display_name(),
                    i + 1,
                    entry.time,
                    entry.confidence
                )?;
            }
        }

        match &quality.timing {
            Some(timing) => writeln!(
                f,
                "Timing: mean interval {:.3}s, {:.1} BPM, {}",
                timing.mean_interval,
                timing.bpm,
                if timing.is_regular { "regular" } else { "irregular" }
            ),
            None => writeln!(f, "Timing: no timing data"),
        }
    }
}

/// Difference between two runs (first minus second)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionComparison {
    pub first: String,
    pub second: String,
    pub clap_difference: i64,
    pub whistle_difference: i64,
    pub snr_difference_db: f64,
}

impl DetectionComparison {
    pub fn between(first: &DetectionResult, second: &DetectionResult) -> Self {
        let diff = |class| first.count(class) as i64 - second.count(class) as i64;
        DetectionComparison {
            first: first.file.clone(),
            second: second.file.clone(),
            clap_difference: diff(EventClass::Clap),
            whistle_difference: diff(EventClass::Whistle),
            snr_difference_db: first.quality.snr_db - second.quality.snr_db,
        }
    }
}

impl std::fmt::Display for DetectionComparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "File 1: {}", self.first)?;
        writeln!(f, "File 2: {}", self.second)?;
        writeln!(f, "Clap difference: {:+}", self.clap_difference)?;
        writeln!(f, "Whistle difference: {:+}", self.whistle_difference)?;
        write!(f, "SNR difference: {:+.2} dB", self.snr_difference_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::FeatureFrameSet;
    use crate::quality::QualityAnalyzer;

    fn result(file: &str, claps: usize, whistles: usize) -> DetectionResult {
        let samples = vec![0.0f32; 22050];
        let frames = FeatureFrameSet::zeros(44, 22050, 512);
        let entry = |frame| {
            DetectionEntry::from_detection(&Detection::new(frame, 0.8, EventClass::Clap), 512, 22050)
        };

        DetectionResult {
            run_id: Uuid::new_v4(),
            file: file.to_string(),
            input_sha256: None,
            timestamp: Utc::now(),
            duration_secs: 1.0,
            sample_rate: 22050,
            hop_length: 512,
            detections: ClassDetections {
                claps: (0..claps).map(|i| entry(i * 13)).collect(),
                whistles: (0..whistles).map(|i| entry(i * 13)).collect(),
            },
            quality: QualityAnalyzer::default().analyze(&samples, &frames, &[]),
        }
    }

    #[test]
    fn test_entry_from_detection() {
        let entry =
            DetectionEntry::from_detection(&Detection::new(86, 0.9, EventClass::Clap), 512, 22050);
        assert_eq!(entry.frame, 86);
        assert!((entry.time - 1.996_916).abs() < 1e-5);
        assert!((entry.confidence - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        let original = result("claps.wav", 2, 1);

        original.save_json(&path).unwrap();
        let loaded = DetectionResult::load_json(&path).unwrap();
        assert_eq!(loaded.run_id, original.run_id);
        assert_eq!(loaded.file, "claps.wav");
        assert_eq!(loaded.timestamp, original.timestamp);
        assert_eq!(loaded.count(EventClass::Clap), 2);
        assert_eq!(loaded.detections.whistles[0].frame, 0);
        assert_eq!(loaded.detections.claps[1].frame, 13);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["detections"]["claps"].as_array().unwrap().len(), 2);
        assert!(raw["quality_metrics"]["snr_db"].is_number());
        assert!(raw.get("input_sha256").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DetectionResult::load_json(&dir.path().join("nope.json")),
            Err(ResultsError::Io(_))
        ));
    }

    #[test]
    fn test_comparison() {
        let comparison = DetectionComparison::between(&result("a.wav", 3, 0), &result("b.wav", 1, 2));
        assert_eq!(comparison.clap_difference, 2);
        assert_eq!(comparison.whistle_difference, -2);
        assert_eq!(comparison.snr_difference_db, 0.0);

        let text = comparison.to_string();
        assert!(text.contains("Clap difference: +2"));
        assert!(text.contains("Whistle difference: -2"));
    }

    #[test]
    fn test_summary_mentions_each_class() {
        let result = result("a.wav", 1, 0);
        let summary = result.summary();
        assert!(summary.contains("Clap detections: 1"));
        assert!(summary.contains("Whistle detections: 0"));
        assert!(summary.contains("no timing data"));
        assert!(summary.contains("  Clap 1: 0.000s | confidence 80.0%"));
        assert_eq!(summary, result.to_string());
        assert_eq!(summary.lines().count(), 8);
        assert!(summary.ends_with('\n'));
    }
}
