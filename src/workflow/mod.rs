pub mod poller;
pub mod resolution;
pub mod state;
pub mod store;

pub use poller::{poll_status_once, PollOutcome, PollerError, StatusPoller, STATUS_POLL_INTERVAL_MS};
pub use resolution::{InterruptResolver, ResolutionOutcome};
pub use state::{
    InterruptPayload, LogEntry, LogLevel, NodeStatus, NodeStatusInfo, NodeStatusPatch,
    SecurityFinding, Severity, UiStatus, WorkflowState,
};
pub use store::WorkflowStore;

use crate::api::{AnalysisType, ApiError, BackendClient};
use crate::shared::logging::append_client_log;
use crate::shared::time::now_rfc3339;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("an analysis job is already running; reset it first")]
    AlreadyRunning,
    #[error("failed to read upload file {path}: {source}")]
    ReadUpload {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Uploads a file for analysis and arms the store for polling: the returned
/// thread id becomes the job id, `started_at` is stamped with local time and
/// the ui status flips to running. On upload failure the store lands in the
/// error state.
pub fn start_analysis(
    store: &WorkflowStore,
    client: &BackendClient,
    file_path: &Path,
    analysis_type: AnalysisType,
) -> Result<String, WorkflowError> {
    if store.snapshot().ui_status == UiStatus::Running {
        return Err(WorkflowError::AlreadyRunning);
    }

    let file_bytes = fs::read(file_path).map_err(|source| WorkflowError::ReadUpload {
        path: file_path.display().to_string(),
        source,
    })?;
    let file_name = file_path
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("upload");

    match client.start_analysis(file_name, &file_bytes, analysis_type) {
        Ok(response) => {
            // Leftover nodes and logs from the previous run must not bleed
            // into the new one.
            store.reset();
            store.set_job_id(Some(response.thread_id.clone()));
            store.set_started_at(Some(now_rfc3339()));
            store.set_ui_status(UiStatus::Running);
            append_client_log(
                store.paths(),
                "info",
                "workflow.started",
                &format!("job {} type {analysis_type}", response.thread_id),
            );
            Ok(response.thread_id)
        }
        Err(err) => {
            store.set_error(Some(err.to_string()));
            store.set_ui_status(UiStatus::Error);
            Err(err.into())
        }
    }
}
