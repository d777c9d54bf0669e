// Pipeline progress tracing
// Append-only JSONL trace of detection runs, one line per stage event

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Stages of a detection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    Load,
    Features,
    ClapScoring,
    WhistleScoring,
    Filtering,
    Quality,
    Complete,
}

impl TraceStage {
    /// Fraction of the run finished once this stage completes
    pub fn progress(&self) -> f32 {
        match self {
            TraceStage::Load => 0.1,
            TraceStage::Features => 0.4,
            TraceStage::ClapScoring => 0.55,
            TraceStage::WhistleScoring => 0.7,
            TraceStage::Filtering => 0.8,
            TraceStage::Quality => 0.9,
            TraceStage::Complete => 1.0,
        }
    }
}

/// A single trace entry in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 timestamp of when this entry was created
    pub timestamp: String,

    pub run_id: Uuid,

    /// Input file or caller label
    pub file: String,

    pub stage: TraceStage,

    /// Progress [0.0, 1.0]
    pub progress: f32,

    /// Human-readable message describing the stage outcome
    pub message: String,

    /// Optional structured data (candidate counts, frame counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Helper builder for trace entries of one run
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    run_id: Uuid,
    file: String,
}

impl TraceBuilder {
    pub fn new(run_id: Uuid, file: impl Into<String>) -> Self {
        TraceBuilder {
            run_id,
            file: file.into(),
        }
    }

    /// Entry marking a finished stage
    pub fn stage(&self, stage: TraceStage, message: impl Into<String>) -> TraceEntry {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            run_id: self.run_id,
            file: self.file.clone(),
            stage,
            progress: stage.progress(),
            message: message.into(),
            data: None,
        }
    }

    /// Entry marking a finished stage, with structured data
    pub fn stage_with_data(
        &self,
        stage: TraceStage,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> TraceEntry {
        TraceEntry {
            data: Some(data),
            ..self.stage(stage, message)
        }
    }
}

/// Pipeline trace writer
/// Manages append-only JSONL trace file
#[derive(Debug, Clone)]
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append a trace entry to the file
    /// Creates file if it doesn't exist
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    /// Append several entries with a single open
    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            file.write_all(entry.to_json_line()?.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}
