// Event detection module
// Feature normalization, heuristic scoring, peak picking and candidate filtering

pub mod explainability;
pub mod filter;
pub mod heuristic;
pub mod normalize;
pub mod peaks;
pub mod types;

pub use explainability::DetectionDecision;
pub use filter::{FilterConfig, FilterMode};
pub use heuristic::{
    ClassRule, Gate, GateBreakdown, GateFeature, HeuristicScorer, NormalizedFeatures,
    ScoringConfig,
};
pub use normalize::{FeatureScaler, NormalizedChannel};
pub use peaks::{find_peaks, Peak};
pub use types::{
    Detection, DetectionCandidate, EventClass, FeatureFrameSet, FrameFeatures, Subband,
    SubbandEnergies,
};
