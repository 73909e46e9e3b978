//! Artifact output.
//!
//! Layout: `{dir}/{name}.json`, one file per series plus `summary.json` and
//! the supplemental dashboard documents. Every write goes to `{name}.json.tmp`
//! first and is renamed into place, so readers see either the previous file
//! or the complete new one.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::snapshot::SummaryDocument;
use crate::error::PipelineError;
use crate::models::DataPoint;

pub const SUMMARY: &str = "summary";

pub trait ArtifactSink: Send + Sync {
    /// Writes an ordered `[{date, value}]` array under `name`.
    fn write_series(&self, name: &str, points: &[DataPoint]) -> Result<(), PipelineError>;

    fn write_document(&self, name: &str, document: &Value) -> Result<(), PipelineError>;

    fn write_summary(&self, summary: &SummaryDocument) -> Result<(), PipelineError> {
        self.write_document(SUMMARY, &serde_json::to_value(summary)?)
    }
}

pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn write_atomic(&self, name: &str, json: &str) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(name);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, json)?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = json.len(), "artifact written");
        Ok(())
    }
}

impl ArtifactSink for JsonFileSink {
    fn write_series(&self, name: &str, points: &[DataPoint]) -> Result<(), PipelineError> {
        self.write_atomic(name, &serde_json::to_string_pretty(points)?)
    }

    fn write_document(&self, name: &str, document: &Value) -> Result<(), PipelineError> {
        self.write_atomic(name, &serde_json::to_string_pretty(document)?)
    }
}
