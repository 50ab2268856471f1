//! Persisted report artifact — the hand-off from pipeline to presentation.
//!
//! The flattened row sequence is written as a pretty JSON array of row
//! objects at a well-known path. The presentation side re-reads it and must
//! tolerate the file being absent (pipeline not yet run) or malformed
//! (corrupt partial write); both states are explicit here, and neither is
//! retried automatically.

use std::path::Path;

use tracing::{info, warn};

use brandlens_shared::{BrandLensError, FlattenedRow, Result};

/// Write the flattened rows to `path`, creating parent directories.
pub fn write_rows(path: &Path, rows: &[FlattenedRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| BrandLensError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(rows)
        .map_err(|e| BrandLensError::Report(format!("failed to serialize rows: {e}")))?;

    std::fs::write(path, json).map_err(|e| BrandLensError::io(path, e))?;

    info!(path = %path.display(), rows = rows.len(), "report artifact written");
    Ok(())
}

/// Outcome of reading the artifact on the presentation side.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportState {
    /// Artifact present and well-formed.
    Ready(Vec<FlattenedRow>),
    /// Artifact absent — the pipeline has not produced one yet.
    NotReady,
    /// Artifact present but unreadable or structurally invalid.
    Invalid(String),
}

/// Read the artifact at `path`, tolerating absence and corruption.
pub fn read_rows(path: &Path) -> ReportState {
    if !path.exists() {
        return ReportState::NotReady;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "report artifact unreadable");
            return ReportState::Invalid(e.to_string());
        }
    };

    match serde_json::from_str::<Vec<FlattenedRow>>(&content) {
        Ok(rows) => ReportState::Ready(rows),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "report artifact invalid");
            ReportState::Invalid(e.to_string())
        }
    }
}
