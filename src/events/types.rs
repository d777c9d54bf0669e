// Event detection types
// Defines event classes, per-frame feature channels, and detection records

use serde::{Deserialize, Serialize};

/// Classes of sound events the detector recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    /// Hand claps, finger snaps, knocks
    /// Characteristics: broadband transient, high ZCR, percussive energy, strong onset
    Clap,

    /// Whistles and other sustained pure tones
    /// Characteristics: low ZCR, harmonic energy, stable spectrum, concentrated pitch class
    Whistle,
}

impl EventClass {
    pub const ALL: [EventClass; 2] = [EventClass::Clap, EventClass::Whistle];

    /// Parse from string representation
    /// Accepts singular and plural forms in any case
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clap" | "claps" => Some(EventClass::Clap),
            "whistle" | "whistles" => Some(EventClass::Whistle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::Clap => "clap",
            EventClass::Whistle => "whistle",
        }
    }

    /// Human-readable name for reports
    pub fn display_name(&self) -> &'static str {
        match self {
            EventClass::Clap => "Clap",
            EventClass::Whistle => "Whistle",
        }
    }
}

impl std::fmt::Display for EventClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named frequency subbands used for energy ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subband {
    Bass,
    LowMid,
    Mid,
    HighMid,
    High,
    UltraHigh,
}

impl Subband {
    pub const ALL: [Subband; 6] = [
        Subband::Bass,
        Subband::LowMid,
        Subband::Mid,
        Subband::HighMid,
        Subband::High,
        Subband::UltraHigh,
    ];

    /// Frequency range in Hz as [low, high)
    /// The ultra-high band ends at Nyquist
    pub fn range_hz(&self, sample_rate: u32) -> (f32, f32) {
        match self {
            Subband::Bass => (0.0, 250.0),
            Subband::LowMid => (250.0, 500.0),
            Subband::Mid => (500.0, 2000.0),
            Subband::HighMid => (2000.0, 4000.0),
            Subband::High => (4000.0, 8000.0),
            Subband::UltraHigh => (8000.0, (sample_rate / 2) as f32),
        }
    }

    fn index(&self) -> usize {
        match self {
            Subband::Bass => 0,
            Subband::LowMid => 1,
            Subband::Mid => 2,
            Subband::HighMid => 3,
            Subband::High => 4,
            Subband::UltraHigh => 5,
        }
    }
}

/// Per-frame magnitude sums for each subband
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubbandEnergies {
    bands: [Vec<f32>; 6],
}

impl SubbandEnergies {
    /// All bands zero for `frame_count` frames
    pub fn zeros(frame_count: usize) -> Self {
        SubbandEnergies {
            bands: std::array::from_fn(|_| vec![0.0; frame_count]),
        }
    }

    pub fn band(&self, band: Subband) -> &[f32] {
        &self.bands[band.index()]
    }

    pub fn band_mut(&mut self, band: Subband) -> &mut Vec<f32> {
        &mut self.bands[band.index()]
    }

    /// Ratio of high-band to bass-band energy per frame
    /// Claps spread energy upwards; steady low sounds do not
    pub fn high_to_bass_ratio(&self) -> Vec<f32> {
        self.band(Subband::High)
            .iter()
            .zip(self.band(Subband::Bass))
            .map(|(high, bass)| high / (bass + 1e-8))
            .collect()
    }

    fn len(&self) -> usize {
        self.bands[0].len()
    }
}

/// Frame-level feature channels produced by a feature provider
///
/// Every channel holds one value per analysis frame. Frame `i` is centred on
/// sample `i * hop_length`, so its timestamp is `i * hop_length / sample_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrameSet {
    pub sample_rate: u32,
    pub hop_length: usize,

    /// Zero-crossing rate (crossings per sample)
    pub zcr: Vec<f32>,

    /// Spectral centroid (Hz)
    pub spectral_centroid: Vec<f32>,

    /// Frequency (Hz) below which 85% of the magnitude lies
    pub spectral_rolloff: Vec<f32>,

    /// Root-mean-square amplitude of the frame
    pub rms: Vec<f32>,

    /// Energy of the harmonic (sustained) component
    pub harmonic_energy: Vec<f32>,

    /// Energy of the percussive (transient) component
    pub percussive_energy: Vec<f32>,

    /// Half-wave rectified spectral flux
    pub onset_strength: Vec<f32>,

    /// Max over mean of the magnitude spectrum
    pub peak_to_average: Vec<f32>,

    pub subbands: SubbandEnergies,

    /// Standard deviation of the dB mel spectrum across bands
    pub spectral_variation: Vec<f32>,

    /// Variance of the MFCC coefficients within the frame
    pub mfcc_variance: Vec<f32>,

    /// L2 norm of the pitch-class energy distribution
    /// Near 1.0 for a single pitch, low for noise, zero for silence
    pub chroma_energy: Vec<f32>,
}

impl FeatureFrameSet {
    /// A frame set with every channel zeroed
    pub fn zeros(frame_count: usize, sample_rate: u32, hop_length: usize) -> Self {
        let zeros = || vec![0.0; frame_count];
        FeatureFrameSet {
            sample_rate,
            hop_length,
            zcr: zeros(),
            spectral_centroid: zeros(),
            spectral_rolloff: zeros(),
            rms: zeros(),
            harmonic_energy: zeros(),
            percussive_energy: zeros(),
            onset_strength: zeros(),
            peak_to_average: zeros(),
            subbands: SubbandEnergies::zeros(frame_count),
            spectral_variation: zeros(),
            mfcc_variance: zeros(),
            chroma_energy: zeros(),
        }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.zcr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zcr.is_empty()
    }

    /// Check that every channel has the same frame count
    pub fn is_consistent(&self) -> bool {
        let n = self.len();
        [
            &self.spectral_centroid,
            &self.spectral_rolloff,
            &self.rms,
            &self.harmonic_energy,
            &self.percussive_energy,
            &self.onset_strength,
            &self.peak_to_average,
            &self.spectral_variation,
            &self.mfcc_variance,
            &self.chroma_energy,
        ]
        .iter()
        .all(|channel| channel.len() == n)
            && self.subbands.len() == n
    }

    /// Duration of one hop in seconds
    pub fn frame_duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.hop_length as f64 / self.sample_rate as f64
    }

    /// Timestamp of a frame in seconds
    pub fn frame_to_secs(&self, frame_index: usize) -> f64 {
        frame_index as f64 * self.frame_duration_secs()
    }

    /// Number of whole frames spanning `secs` (truncated)
    pub fn secs_to_frames(&self, secs: f64) -> usize {
        if self.hop_length == 0 {
            return 0;
        }
        (secs * self.sample_rate as f64 / self.hop_length as f64) as usize
    }

    /// Snapshot of every channel at one frame
    pub fn frame(&self, frame_index: usize) -> Option<FrameFeatures> {
        if frame_index >= self.len() {
            return None;
        }
        let i = frame_index;
        Some(FrameFeatures {
            frame: i,
            time: self.frame_to_secs(i),
            zcr: self.zcr[i],
            spectral_centroid: self.spectral_centroid[i],
            spectral_rolloff: self.spectral_rolloff[i],
            rms: self.rms[i],
            harmonic_energy: self.harmonic_energy[i],
            percussive_energy: self.percussive_energy[i],
            onset_strength: self.onset_strength[i],
            peak_to_average: self.peak_to_average[i],
            subband_energy: Subband::ALL.map(|band| self.subbands.band(band)[i]),
            spectral_variation: self.spectral_variation[i],
            mfcc_variance: self.mfcc_variance[i],
            chroma_energy: self.chroma_energy[i],
        })
    }
}

/// All feature values of a single frame, for export and inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameFeatures {
    pub frame: usize,
    pub time: f64,
    pub zcr: f32,
    pub spectral_centroid: f32,
    pub spectral_rolloff: f32,
    pub rms: f32,
    pub harmonic_energy: f32,
    pub percussive_energy: f32,
    pub onset_strength: f32,
    pub peak_to_average: f32,
    /// Ordered bass, low-mid, mid, high-mid, high, ultra-high
    pub subband_energy: [f32; 6],
    pub spectral_variation: f32,
    pub mfcc_variance: f32,
    pub chroma_energy: f32,
}

/// A scored frame that passed its class threshold but has not been filtered yet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionCandidate {
    pub frame_index: usize,

    /// Heuristic membership score [0.0, 1.0]
    pub score: f32,
}

impl DetectionCandidate {
    pub fn new(frame_index: usize, score: f32) -> Self {
        DetectionCandidate { frame_index, score }
    }
}

/// A finalized event detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub frame_index: usize,

    /// Heuristic membership score [0.0, 1.0]
    pub score: f32,

    pub class: EventClass,
}

impl Detection {
    pub fn new(frame_index: usize, score: f32, class: EventClass) -> Self {
        Detection {
            frame_index,
            score,
            class,
        }
    }

    pub fn from_candidate(candidate: DetectionCandidate, class: EventClass) -> Self {
        Detection::new(candidate.frame_index, candidate.score, class)
    }

    /// Timestamp in seconds: frame_index * hop_length / sample_rate
    pub fn time_secs(&self, hop_length: usize, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.frame_index as f64 * hop_length as f64 / sample_rate as f64
    }

    /// Score expressed as a percentage
    pub fn confidence_percent(&self) -> f32 {
        self.score * 100.0
    }
}
