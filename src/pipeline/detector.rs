// Sound event detector
// Runs features -> scoring -> filtering -> quality for one buffer at a time
// and keeps an append-only history of results

use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::audio::features::{FeatureProvider, SpectralFeatureProvider};
use crate::audio::ingest::{calculate_sha256, ingest_wav, load_wav, AudioError};
use crate::audio::resample::resample_to_rate;
use crate::config::{ConfigError, DetectorConfig};
use crate::events::explainability::DetectionDecision;
use crate::events::filter::FilterMode;
use crate::events::heuristic::HeuristicScorer;
use crate::events::types::{Detection, DetectionCandidate, EventClass, FeatureFrameSet};
use crate::pipeline::results::{ClassDetections, DetectionEntry, DetectionResult, ResultsError};
use crate::pipeline::trace::{TraceBuilder, TraceEntry, TraceError, TraceStage, TraceWriter};
use crate::quality::{QualityAnalyzer, QualityReport};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// Everything computed for one buffer
#[derive(Debug, Clone)]
pub struct Analysis {
    pub frames: FeatureFrameSet,

    /// Filtered clap detections in frame order
    pub claps: Vec<Detection>,

    /// Filtered whistle detections in frame order
    pub whistles: Vec<Detection>,

    pub quality: QualityReport,
}

impl Analysis {
    pub fn detections(&self, class: EventClass) -> &[Detection] {
        match class {
            EventClass::Clap => &self.claps,
            EventClass::Whistle => &self.whistles,
        }
    }

    /// Both classes pooled and ordered by frame
    pub fn all_detections(&self) -> Vec<Detection> {
        let mut all: Vec<Detection> = self.claps.iter().chain(&self.whistles).copied().collect();
        all.sort_by_key(|d| d.frame_index);
        all
    }
}

/// Outcome of one file in a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub file: String,
    pub result: Result<DetectionResult, DetectError>,
}

/// Clap and whistle detector
///
/// Owns its feature provider, scorer and history. Independent detectors share
/// nothing and may run on separate threads.
pub struct SoundEventDetector<P: FeatureProvider = SpectralFeatureProvider> {
    config: DetectorConfig,
    provider: P,
    scorer: HeuristicScorer,
    quality: QualityAnalyzer,
    trace: Option<TraceWriter>,
    history: Vec<DetectionResult>,
}

impl SoundEventDetector<SpectralFeatureProvider> {
    /// Create a detector with the spectral feature provider
    pub fn new(config: DetectorConfig) -> Result<Self, DetectError> {
        let provider = SpectralFeatureProvider::new(
            config.frame_length,
            config.hop_length,
            config.features.clone(),
        );
        Self::with_provider(config, provider)
    }
}

impl<P: FeatureProvider> SoundEventDetector<P> {
    /// Create a detector with a custom feature provider
    pub fn with_provider(config: DetectorConfig, provider: P) -> Result<Self, DetectError> {
        config.validate()?;
        Ok(SoundEventDetector {
            scorer: HeuristicScorer::with_config(config.scoring.clone()),
            quality: QualityAnalyzer::new(config.quality.clone()),
            config,
            provider,
            trace: None,
            history: Vec::new(),
        })
    }

    /// Append stage progress of every run to a JSONL trace
    pub fn with_trace(mut self, writer: TraceWriter) -> Self {
        self.trace = Some(writer);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Results of every completed run, oldest first
    pub fn history(&self) -> &[DetectionResult] {
        &self.history
    }

    /// Analyze a mono buffer already at the configured sample rate
    ///
    /// Pure: the same samples always give the same analysis and nothing is
    /// recorded in the history.
    pub fn analyze_samples(&self, samples: &[f32]) -> Analysis {
        self.run_stages(samples, None)
    }

    /// Detect events in a mono buffer and record the result
    ///
    /// Buffers at another sample rate are resampled first.
    pub fn detect_buffer(
        &mut self,
        label: &str,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<DetectionResult, DetectError> {
        self.detect_with_fingerprint(label, samples, sample_rate, None)
            .map(|(result, _)| result)
    }

    /// Load a WAV file, mix it to mono and detect events in it
    pub fn detect_file(&mut self, path: &Path) -> Result<DetectionResult, DetectError> {
        self.detect_file_with_analysis(path).map(|(result, _)| result)
    }

    /// Like `detect_file`, also handing back the analysis behind the result
    pub fn detect_file_with_analysis(
        &mut self,
        path: &Path,
    ) -> Result<(DetectionResult, Analysis), DetectError> {
        let label = path.display().to_string();
        let loaded = load_wav(path)?;
        let mono = loaded.audio.to_mono();
        self.detect_with_fingerprint(&label, &mono, loaded.audio.sample_rate, Some(loaded.sha256))
    }

    /// Detect events in an in-memory WAV file
    pub fn detect_wav_bytes(
        &mut self,
        label: &str,
        data: &[u8],
    ) -> Result<DetectionResult, DetectError> {
        let audio = ingest_wav(data)?;
        let mono = audio.to_mono();
        self.detect_with_fingerprint(label, &mono, audio.sample_rate, Some(calculate_sha256(data)))
            .map(|(result, _)| result)
    }

    /// Process files in order; failures are logged and reported, not fatal
    pub fn batch_process<S: AsRef<Path>>(&mut self, paths: &[S]) -> Vec<BatchOutcome> {
        log::info!("Batch processing {} files", paths.len());

        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let result = self.detect_file(path);
                if let Err(ref err) = result {
                    log::warn!("Skipping {}: {}", path.display(), err);
                }
                BatchOutcome {
                    file: path.display().to_string(),
                    result,
                }
            })
            .collect()
    }

    /// Gate-by-gate explanation of every detection in an analysis
    pub fn explain(&self, analysis: &Analysis) -> Vec<DetectionDecision> {
        let normalized = self.scorer.normalize(&analysis.frames);
        analysis
            .all_detections()
            .iter()
            .map(|detection| {
                let breakdown = self.scorer.breakdown(
                    detection.class,
                    &analysis.frames,
                    &normalized,
                    detection.frame_index,
                );
                DetectionDecision::from_scoring_data(detection, &analysis.frames, breakdown)
            })
            .collect()
    }

    fn detect_with_fingerprint(
        &mut self,
        label: &str,
        samples: &[f32],
        sample_rate: u32,
        input_sha256: Option<String>,
    ) -> Result<(DetectionResult, Analysis), DetectError> {
        if sample_rate == 0 {
            return Err(DetectError::InvalidSampleRate(sample_rate));
        }

        let run_id = Uuid::new_v4();
        let tracer = TraceBuilder::new(run_id, label);
        let samples = resample_to_rate(samples, sample_rate, self.config.sample_rate)?;
        self.emit(tracer.stage_with_data(
            TraceStage::Load,
            format!("Loaded {} samples", samples.len()),
            serde_json::json!({ "input_sample_rate": sample_rate }),
        ));

        let analysis = self.run_stages(&samples, Some(&tracer));

        let sr = self.config.sample_rate;
        let entries = |detections: &[Detection]| -> Vec<DetectionEntry> {
            detections
                .iter()
                .map(|d| DetectionEntry::from_detection(d, analysis.frames.hop_length, sr))
                .collect()
        };

        let result = DetectionResult {
            run_id,
            file: label.to_string(),
            input_sha256,
            timestamp: Utc::now(),
            duration_secs: samples.len() as f64 / sr as f64,
            sample_rate: sr,
            hop_length: analysis.frames.hop_length,
            detections: ClassDetections {
                claps: entries(&analysis.claps),
                whistles: entries(&analysis.whistles),
            },
            quality: analysis.quality.clone(),
        };

        log::info!(
            "{}: {} clap(s), {} whistle(s)",
            label,
            result.detections.claps.len(),
            result.detections.whistles.len()
        );
        self.emit(tracer.stage(TraceStage::Complete, "Detection complete"));

        self.history.push(result.clone());
        Ok((result, analysis))
    }

    fn run_stages(&self, samples: &[f32], tracer: Option<&TraceBuilder>) -> Analysis {
        let trace = |stage: TraceStage, message: String, data: serde_json::Value| {
            if let Some(builder) = tracer {
                self.emit(builder.stage_with_data(stage, message, data));
            }
        };

        let frames = self.provider.extract(samples, self.config.sample_rate);
        trace(
            TraceStage::Features,
            format!("Extracted {} frames", frames.len()),
            serde_json::json!({ "frames": frames.len() }),
        );

        let normalized = self.scorer.normalize(&frames);

        let clap_candidates =
            self.scorer
                .score_clap(&frames, &normalized, self.config.clap_threshold);
        trace(
            TraceStage::ClapScoring,
            format!("{} clap candidates", clap_candidates.len()),
            serde_json::json!({ "candidates": clap_candidates.len() }),
        );

        let whistle_candidates =
            self.scorer
                .score_whistle(&frames, &normalized, self.config.whistle_threshold);
        trace(
            TraceStage::WhistleScoring,
            format!("{} whistle candidates", whistle_candidates.len()),
            serde_json::json!({ "candidates": whistle_candidates.len() }),
        );

        let filter = |class: EventClass, candidates: &[DetectionCandidate]| -> Vec<Detection> {
            FilterMode::for_class(class, &self.config.filter, &frames)
                .apply(candidates)
                .into_iter()
                .map(|c| Detection::from_candidate(c, class))
                .collect()
        };
        let claps = filter(EventClass::Clap, &clap_candidates);
        let whistles = filter(EventClass::Whistle, &whistle_candidates);
        trace(
            TraceStage::Filtering,
            format!("{} claps, {} whistles", claps.len(), whistles.len()),
            serde_json::json!({ "claps": claps.len(), "whistles": whistles.len() }),
        );

        let pooled: Vec<Detection> = claps.iter().chain(&whistles).copied().collect();
        let quality = self.quality.analyze(samples, &frames, &pooled);
        trace(
            TraceStage::Quality,
            format!("SNR {:.1} dB", quality.snr_db),
            serde_json::to_value(QualitySnapshot::from(&quality)).unwrap_or_default(),
        );

        Analysis {
            frames,
            claps,
            whistles,
            quality,
        }
    }

    fn emit(&self, entry: TraceEntry) {
        if let Some(writer) = &self.trace {
            if let Err(err) = writer.write(&entry) {
                log::warn!("Failed to write trace to {}: {}", writer.path().display(), err);
            }
        }
    }
}

#[derive(Serialize)]
struct QualitySnapshot {
    snr_db: f64,
    audio_quality: String,
}

impl From<&QualityReport> for QualitySnapshot {
    fn from(report: &QualityReport) -> Self {
        QualitySnapshot {
            snr_db: report.snr_db,
            audio_quality: report.quality.to_string(),
        }
    }
}
