// Pipeline execution and monitoring module
// Orchestrates detection runs, their results and their trace

pub mod detector;
pub mod results;
pub mod trace;

pub use detector::{Analysis, BatchOutcome, DetectError, SoundEventDetector};
pub use results::{
    ClassDetections, DetectionComparison, DetectionEntry, DetectionResult, ResultsError,
};
pub use trace::{read_trace_file, TraceBuilder, TraceEntry, TraceError, TraceStage, TraceWriter};
