// Audio processing module
// Handles WAV ingestion, resampling and frame-level feature extraction

pub mod features;
pub mod hpss;
pub mod ingest;
pub mod resample;
pub mod spectral;

pub use features::{FeatureConfig, FeatureProvider, SpectralFeatureProvider};
pub use ingest::{calculate_sha256, ingest_wav, load_wav, AudioData, AudioError, LoadedAudio};
pub use resample::{resample_to_rate, SincResampler};
