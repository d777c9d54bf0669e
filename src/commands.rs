// Command handlers
// Thin operations behind the command-line interface

use std::path::{Path, PathBuf};

use crate::audio::{load_wav, resample_to_rate};
use crate::config::{ConfigError, DetectorConfig};
use crate::events::{DetectionDecision, FrameFeatures};
use crate::pipeline::{
    DetectError, DetectionComparison, DetectionResult, ResultsError, SoundEventDetector,
    TraceWriter,
};
use crate::FeatureProvider;

/// Options of the `detect` command
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    pub files: Vec<PathBuf>,
    pub config: Option<PathBuf>,

    /// Directory receiving one `<stem>_results.json` per input
    pub output_dir: Option<PathBuf>,

    pub trace: Option<PathBuf>,

    /// Keep the gate breakdown of every detection
    pub explain: bool,
}

/// What the `detect` command produced for one input file
#[derive(Debug)]
pub struct FileReport {
    pub file: String,
    pub result: Result<DetectionResult, DetectError>,

    /// Explanations built from the same analysis as `result`
    pub decisions: Vec<DetectionDecision>,

    /// Set when the results file could not be written
    pub save_error: Option<ResultsError>,
}

impl FileReport {
    /// Detection and saving both succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && self.save_error.is_none()
    }
}

/// Load a config file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<DetectorConfig, ConfigError> {
    match path {
        Some(path) => DetectorConfig::load_from_file(path),
        None => Ok(DetectorConfig::default()),
    }
}

/// Name of the results file written for an input
pub fn results_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());
    format!("{}_results.json", stem)
}

/// Detect events in every file
///
/// Per-file failures, including failures to save results, are logged and
/// reported in that file's report. The remaining files are still processed.
pub fn detect_files(options: &DetectOptions) -> Result<Vec<FileReport>, DetectError> {
    let config = load_config(options.config.as_deref())?;
    let mut detector = SoundEventDetector::new(config)?;
    if let Some(trace) = &options.trace {
        detector = detector.with_trace(TraceWriter::new(trace.clone()));
    }
    if let Some(dir) = &options.output_dir {
        std::fs::create_dir_all(dir).map_err(ResultsError::from)?;
    }

    log::info!("Detecting events in {} files", options.files.len());
    let reports = options
        .files
        .iter()
        .map(|path| {
            let file = path.display().to_string();
            match detector.detect_file_with_analysis(path) {
                Ok((result, analysis)) => {
                    let decisions = if options.explain {
                        detector.explain(&analysis)
                    } else {
                        Vec::new()
                    };
                    let save_error = options.output_dir.as_ref().and_then(|dir| {
                        let target = dir.join(results_file_name(path));
                        result.save_json(&target).err().inspect(|err| {
                            log::warn!("Could not save results for {}: {}", file, err)
                        })
                    });
                    FileReport {
                        file,
                        result: Ok(result),
                        decisions,
                        save_error,
                    }
                }
                Err(err) => {
                    log::warn!("Skipping {}: {}", file, err);
                    FileReport {
                        file,
                        result: Err(err),
                        decisions: Vec::new(),
                        save_error: None,
                    }
                }
            }
        })
        .collect();

    Ok(reports)
}

/// Detect events in two files and compare the runs
pub fn compare_files(
    config: &DetectorConfig,
    first: &Path,
    second: &Path,
) -> Result<DetectionComparison, DetectError> {
    let mut detector = SoundEventDetector::new(config.clone())?;
    let a = detector.detect_file(first)?;
    let b = detector.detect_file(second)?;
    Ok(DetectionComparison::between(&a, &b))
}

/// Per-frame feature dump of a file
pub fn extract_frame_features(
    config: &DetectorConfig,
    path: &Path,
) -> Result<Vec<FrameFeatures>, DetectError> {
    config.validate()?;
    let provider = crate::SpectralFeatureProvider::new(
        config.frame_length,
        config.hop_length,
        config.features.clone(),
    );
    let samples = load_mono(config, path)?;
    let frames = provider.extract(&samples, config.sample_rate);

    Ok((0..frames.len()).filter_map(|i| frames.frame(i)).collect())
}

fn load_mono(config: &DetectorConfig, path: &Path) -> Result<Vec<f32>, DetectError> {
    let loaded = load_wav(path)?;
    let mono = loaded.audio.to_mono();
    Ok(resample_to_rate(
        &mono,
        loaded.audio.sample_rate,
        config.sample_rate,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_silence(path: &Path, sample_rate: u32, len: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..len {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    /// Silence with one 20 ms noise burst starting at `at`
    fn write_burst(path: &Path, sample_rate: u32, len: usize, at: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let mut state = 7u32;
        for i in 0..len {
            let sample = if (at..at + sample_rate as usize / 50).contains(&i) {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 16) as u16 as i16 / 2
            } else {
                0
            };
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_results_file_name() {
        assert_eq!(results_file_name(Path::new("/tmp/claps.wav")), "claps_results.json");
    }

    #[test]
    fn test_detect_files_skips_failures_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("quiet.wav");
        write_silence(&good, 22050, 22050);
        let out = dir.path().join("out");

        let options = DetectOptions {
            files: vec![dir.path().join("missing.wav"), good.clone()],
            output_dir: Some(out.clone()),
            ..Default::default()
        };
        let reports = detect_files(&options).unwrap();

        assert_eq!(reports.len(), 2);
        assert!(matches!(
            reports[0].result,
            Err(DetectError::Audio(crate::audio::AudioError::SourceUnavailable { .. }))
        ));
        assert!(!reports[0].is_success());
        let result = reports[1].result.as_ref().unwrap();
        assert_eq!(result.detections.total(), 0);
        assert!(result.input_sha256.is_some());
        assert!(reports[1].is_success());
        assert!(out.join("quiet_results.json").exists());
        assert!(!out.join("missing_results.json").exists());
    }

    #[test]
    fn test_unwritable_results_file_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.wav");
        let second = dir.path().join("second.wav");
        write_silence(&first, 22050, 22050);
        write_silence(&second, 22050, 22050);
        let out = dir.path().join("out");
        // A directory squats on the first results path
        std::fs::create_dir_all(out.join("first_results.json")).unwrap();

        let options = DetectOptions {
            files: vec![first, second],
            output_dir: Some(out.clone()),
            ..Default::default()
        };
        let reports = detect_files(&options).unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports[0].result.is_ok());
        assert!(matches!(reports[0].save_error, Some(ResultsError::Io(_))));
        assert!(!reports[0].is_success());
        assert!(reports[1].is_success());
        assert!(out.join("second_results.json").is_file());
    }

    #[test]
    fn test_explain_uses_the_detection_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("burst.wav");
        write_burst(&path, 22050, 3 * 22050, 22050);

        let options = DetectOptions {
            files: vec![path, dir.path().join("missing.wav")],
            explain: true,
            ..Default::default()
        };
        let reports = detect_files(&options).unwrap();

        let result = reports[0].result.as_ref().unwrap();
        assert_eq!(reports[0].decisions.len(), result.detections.total());
        assert!(!reports[0].decisions.is_empty());
        for (decision, entry) in reports[0].decisions.iter().zip(&result.detections.claps) {
            assert_eq!(decision.frame_index, entry.frame);
        }
        assert!(reports[1].result.is_err());
        assert!(reports[1].decisions.is_empty());
    }

    #[test]
    fn test_explanations_off_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("burst.wav");
        write_burst(&path, 22050, 3 * 22050, 22050);

        let reports = detect_files(&DetectOptions {
            files: vec![path],
            ..Default::default()
        })
        .unwrap();
        assert!(reports[0].decisions.is_empty());
    }

    #[test]
    fn test_features_dump_resamples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.wav");
        write_silence(&path, 44100, 44100);

        let frames = extract_frame_features(&DetectorConfig::default(), &path).unwrap();
        // One second at 22050 Hz with hop 512
        assert_eq!(frames.len(), 44);
        assert_eq!(frames[1].frame, 1);
    }

    #[test]
    fn test_compare_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.wav");
        write_silence(&path, 22050, 11025);

        let comparison = compare_files(&DetectorConfig::default(), &path, &path).unwrap();
        assert_eq!(comparison.clap_difference, 0);
        assert_eq!(comparison.whistle_difference, 0);
    }
}
