//! Detector configuration
//!
//! Every tunable of the pipeline lives here with its default value. A JSON file
//! may override any subset of fields; missing fields keep their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::audio::features::FeatureConfig;
use crate::events::filter::FilterConfig;
use crate::events::heuristic::ScoringConfig;
use crate::quality::QualityConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Analysis sample rate; inputs at other rates are resampled
    pub sample_rate: u32,

    /// STFT frame length in samples
    pub frame_length: usize,

    /// Hop between frames in samples
    pub hop_length: usize,

    /// Minimum clap score (exclusive)
    pub clap_threshold: f32,

    /// Minimum whistle score (exclusive)
    pub whistle_threshold: f32,

    pub features: FeatureConfig,
    pub scoring: ScoringConfig,
    pub filter: FilterConfig,
    pub quality: QualityConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            frame_length: 2048,
            hop_length: 512,
            clap_threshold: 0.55,
            whistle_threshold: 0.50,
            features: FeatureConfig::default(),
            scoring: ScoringConfig::default(),
            filter: FilterConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Load and validate configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: DetectorConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path_str.clone(),
                source,
            })?;
        config.validate()?;

        log::info!("[Config] Loaded configuration from {}", path_str);
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any error
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("[Config] {}. Using defaults.", err);
                Self::default()
            }
        }
    }

    /// Check that the configuration describes a usable analysis
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if self.frame_length == 0 {
            return Err(ConfigError::Invalid("frame_length must be positive".into()));
        }
        if self.hop_length == 0 {
            return Err(ConfigError::Invalid("hop_length must be positive".into()));
        }
        if self.hop_length > self.frame_length {
            return Err(ConfigError::Invalid(format!(
                "hop_length ({}) exceeds frame_length ({})",
                self.hop_length, self.frame_length
            )));
        }
        for (name, value) in [
            ("clap_threshold", self.clap_threshold),
            ("whistle_threshold", self.whistle_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.features.n_mels == 0 || self.features.n_mfcc == 0 {
            return Err(ConfigError::Invalid(
                "n_mels and n_mfcc must be positive".into(),
            ));
        }
        if self.filter.clap_min_separation_secs < 0.0
            || self.filter.whistle_min_duration_secs < 0.0
            || self.quality.noise_window_secs < 0.0
        {
            return Err(ConfigError::Invalid("durations must not be negative".into()));
        }
        Ok(())
    }

    /// Seconds per analysis frame
    pub fn frame_duration_secs(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64
    }
}
