// Sound Events - clap and whistle detection for mono audio
// Module declarations

pub mod audio;
pub mod commands;
pub mod config;
pub mod events;
pub mod pipeline;
pub mod quality;

pub use audio::{FeatureProvider, SpectralFeatureProvider};
pub use config::{ConfigError, DetectorConfig};
pub use events::{Detection, EventClass, FeatureFrameSet};
pub use pipeline::{DetectError, DetectionResult, SoundEventDetector};
pub use quality::{QualityLabel, QualityReport};
