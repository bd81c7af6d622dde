//! Workflow snapshots on disk
//!
//! The CLI keeps one workflow run in a JSON file between invocations so the
//! user can continue where they left off.

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use contentflow_utils::atomic_write::write_file_atomic;
use contentflow_utils::error::ContentFlowError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::WorkflowContext;

/// Current on-disk format.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub context: WorkflowContext,
}

fn snapshot_error(path: &Utf8Path, reason: impl Into<String>) -> ContentFlowError {
    ContentFlowError::Snapshot {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Write `context` to `path` atomically.
///
/// # Errors
///
/// Returns `Snapshot` if serialization or the write fails.
pub fn save(path: &Utf8Path, context: &WorkflowContext) -> Result<WorkflowSnapshot, ContentFlowError> {
    let snapshot = WorkflowSnapshot {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        context: context.clone(),
    };
    let json = serde_json::to_string_pretty(&snapshot).map_err(|e| snapshot_error(path, e.to_string()))?;
    write_file_atomic(path, &json).map_err(|e| snapshot_error(path, format!("{e:#}")))?;
    debug!(path = %path, step = %context.current_step(), "Saved workflow snapshot");
    Ok(snapshot)
}

/// Read a snapshot written by [`save`].
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Snapshot` if it is not a
/// snapshot of the current version.
pub fn load(path: &Utf8Path) -> Result<WorkflowSnapshot, ContentFlowError> {
    let raw = std::fs::read_to_string(path)?;
    let snapshot: WorkflowSnapshot = serde_json::from_str(&raw)
        .map_err(|e| snapshot_error(path, format!("not a workflow snapshot: {e}")))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(snapshot_error(
            path,
            format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            ),
        ));
    }
    Ok(snapshot)
}

/// Load the saved context, or start a new one when no snapshot exists.
///
/// # Errors
///
/// See [`load`]. A missing file is not an error.
pub fn load_or_new(
    path: &Utf8Path,
    session_id: impl FnOnce() -> String,
) -> Result<WorkflowContext, ContentFlowError> {
    if !path.exists() {
        debug!(path = %path, "No workflow snapshot, starting a new run");
        return Ok(WorkflowContext::new(session_id()));
    }
    Ok(load(path)?.context)
}
