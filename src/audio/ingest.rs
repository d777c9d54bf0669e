// Audio ingestion module
// Reads WAV files, extracts metadata, and normalizes audio samples

use hound::{SampleFormat, WavReader};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio source unavailable: {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid audio data")]
    InvalidData,

    #[error("Failed to set up resampler: {0}")]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),

    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
}

#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples normalized to f32 in range [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz (e.g., 22050, 44100)
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Bit depth of original audio (8, 16, 24, 32)
    pub bit_depth: u16,

    /// Duration in milliseconds
    pub duration_ms: i64,

    /// Total number of frames (samples / channels)
    pub frame_count: usize,
}

impl AudioData {
    /// Get duration in seconds as f64
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .take(self.frame_count)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// A decoded WAV file together with the fingerprint of its bytes
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    pub audio: AudioData,

    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Read and decode a WAV file from disk
///
/// Missing or unreadable files are reported as `SourceUnavailable`.
pub fn load_wav(path: impl AsRef<Path>) -> Result<LoadedAudio, AudioError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| AudioError::SourceUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let audio = ingest_wav(&data)?;
    log::info!(
        "Loaded {}: {} Hz, {} channel(s), {:.2}s",
        path.display(),
        audio.sample_rate,
        audio.channels,
        audio.duration_secs()
    );

    Ok(LoadedAudio {
        audio,
        sha256: calculate_sha256(&data),
    })
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Ingest a WAV file from raw bytes
/// Returns AudioData with normalized samples and metadata
pub fn ingest_wav(data: &[u8]) -> Result<AudioData, AudioError> {
    let cursor = Cursor::new(data);
    let mut reader = WavReader::new(cursor)?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels;
    let bit_depth = spec.bits_per_sample;
    let sample_format = spec.sample_format;

    if channels == 0 || sample_rate == 0 {
        return Err(AudioError::InvalidData);
    }

    // Read and normalize samples to f32 [-1.0, 1.0]
    let samples: Vec<f32> = match (sample_format, bit_depth) {
        (SampleFormat::Int, 8) => {
            // hound yields 8-bit PCM already centred on zero
            reader
                .samples::<i8>()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|s| s as f32 / 128.0)
                .collect()
        }
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f32 / 8388608.0)
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f32 / 2147483648.0)
            .collect(),
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} {}-bit audio",
                sample_format, bit_depth
            )));
        }
    };

    let frame_count = samples.len() / channels as usize;
    let duration_ms = (frame_count as f64 * 1000.0 / sample_rate as f64) as i64;

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        bit_depth,
        duration_ms,
        frame_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_audio_data_to_mono() {
        // Create stereo audio: [L, R, L, R, L, R]
        let audio_data = AudioData {
            samples: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            sample_rate: 44100,
            channels: 2,
            bit_depth: 16,
            duration_ms: 1,
            frame_count: 3,
        };

        let mono = audio_data.to_mono();

        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.15).abs() < 1e-6);
        assert!((mono[1] - 0.35).abs() < 1e-6);
        assert!((mono[2] - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_ingest_16_bit_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[16384, -16384, 0, 0]);

        let audio = ingest_wav(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frame_count, 2);
        assert_eq!(audio.samples, vec![0.5, -0.5, 0.0, 0.0]);
        assert_eq!(audio.to_mono(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_ingest_rejects_garbage() {
        assert!(matches!(
            ingest_wav(b"not a wav file"),
            Err(AudioError::WavReadError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.wav");

        match load_wav(&missing) {
            Err(AudioError::SourceUnavailable { path, .. }) => {
                assert!(path.ends_with("missing.wav"));
            }
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_load_wav_fingerprints_bytes() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[0, 100, -100, 0]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, &bytes).unwrap();

        let loaded = load_wav(&path).unwrap();
        assert_eq!(loaded.sha256, calculate_sha256(&bytes));
        assert_eq!(loaded.audio.frame_count, 4);
    }

    #[test]
    fn test_calculate_sha256() {
        assert_eq!(
            calculate_sha256(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
