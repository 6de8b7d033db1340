use crate::api::{BackendClient, JobStatus, StatusResponse};
use crate::shared::logging::append_client_log;
use crate::shared::time::now_rfc3339;
use crate::workflow::state::{NodeStatusInfo, NodeStatusPatch, UiStatus};
use crate::workflow::store::WorkflowStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Fixed cadence between status fetches while a job is active.
pub const STATUS_POLL_INTERVAL_MS: u64 = 2_000;
/// How often the loop re-checks the entry condition while inactive, so a
/// freshly started job gets its first fetch promptly.
pub(crate) const IDLE_RECHECK_MS: u64 = 100;

const DEFAULT_JOB_ERROR: &str = "unknown error";

/// What a single poll tick did. `Failed` is the backend reporting the job
/// dead; `TransientFailure` is the transport failing, which leaves the
/// workflow running and polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Entry condition does not hold: no fetch was issued.
    Inactive,
    /// The job id or status changed while the fetch was in flight; the
    /// response was discarded without touching the store.
    Stale,
    TransientFailure(String),
    Running,
    Interrupted,
    Completed,
    Failed,
}

/// Executes one poll tick against the store: fetch, stale-guard, merge.
/// Never returns an error; every failure mode is folded into the outcome and
/// recorded in the store.
pub fn poll_status_once(store: &WorkflowStore, client: &BackendClient) -> PollOutcome {
    let before = store.snapshot();
    let job_id = match (before.ui_status, before.job_id) {
        (UiStatus::Running, Some(job_id)) => job_id,
        _ => return PollOutcome::Inactive,
    };

    let response = match client.fetch_status(&job_id) {
        Ok(response) => response,
        Err(err) => {
            let message = err.to_string();
            // A reset or re-target while the fetch was in flight makes this
            // failure moot; it must not stamp an error on the new state.
            if !store.mutate_while_running(&job_id, |state| {
                state.error = Some(message.clone());
            }) {
                return PollOutcome::Stale;
            }
            append_client_log(store.paths(), "warn", "poller.fetch.failed", &message);
            return PollOutcome::TransientFailure(message);
        }
    };

    apply_status_response(store, &job_id, response)
}

/// Merges one status response into the store and decides the ui-status
/// transition. An interrupt payload, when present, wins over the completed
/// and error checks within the same tick.
///
/// The whole merge runs under one store lock, with the job id and running
/// status re-checked inside it: a tick started against job A never mutates
/// state for job B, and a reset landing mid-tick discards the response
/// outright instead of being half overwritten by its tail.
pub(crate) fn apply_status_response(
    store: &WorkflowStore,
    job_id: &str,
    response: StatusResponse,
) -> PollOutcome {
    let mut outcome = PollOutcome::Running;
    let mut log_line: Option<(&'static str, &'static str, String)> = None;

    let applied = store.mutate_while_running(job_id, |state| {
        if !response.logs.is_empty() {
            state.logs = response.logs;
        }

        for (node_id, entry) in response.node_statuses {
            let slot = state
                .node_statuses
                .entry(node_id.clone())
                .or_insert_with(|| NodeStatusInfo::pending(node_id));
            NodeStatusPatch {
                status: Some(entry.status),
                started_at: entry.started_at,
                completed_at: entry.completed_at,
                error: entry.error,
            }
            .apply_to(slot);
        }

        if let Some(payload) = response.interrupt_payload {
            log_line = Some((
                "info",
                "workflow.interrupted",
                format!(
                    "node {} raised {} finding(s)",
                    payload.node_id,
                    payload.findings.len()
                ),
            ));
            state.interrupt_payload = Some(payload);
            state.ui_status = UiStatus::Interrupted;
            outcome = PollOutcome::Interrupted;
            return;
        }

        match response.status {
            JobStatus::Completed => {
                state.ui_status = UiStatus::Completed;
                state.completed_at = Some(now_rfc3339());
                log_line = Some(("info", "workflow.completed", "job completed".to_string()));
                outcome = PollOutcome::Completed;
            }
            JobStatus::Error => {
                let message = response
                    .error
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_JOB_ERROR.to_string());
                state.error = Some(message.clone());
                state.ui_status = UiStatus::Error;
                log_line = Some(("error", "workflow.failed", message));
                outcome = PollOutcome::Failed;
            }
            // An `interrupted` status without a payload carries nothing to
            // act on; keep polling until the payload shows up.
            JobStatus::Running | JobStatus::Interrupted => {}
        }
    });

    if !applied {
        return PollOutcome::Stale;
    }
    if let Some((level, event, message)) = log_line {
        append_client_log(store.paths(), level, event, &message);
    }
    outcome
}

pub(crate) fn run_status_poller_loop(
    store: Arc<WorkflowStore>,
    client: BackendClient,
    interval: Duration,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        let outcome = poll_status_once(&store, &client);
        let pause = match outcome {
            PollOutcome::Inactive | PollOutcome::Stale => Duration::from_millis(IDLE_RECHECK_MS),
            _ => interval,
        };
        if !sleep_with_stop(&stop, pause) {
            break;
        }
    }
}

fn sleep_with_stop(stop: &AtomicBool, total: Duration) -> bool {
    let mut remaining = total;
    while remaining > Duration::from_millis(0) {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(Duration::from_millis(50));
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    !stop.load(Ordering::Relaxed)
}

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("a status poller is already attached to this store")]
    AlreadyAttached,
}

/// Owns the polling thread for one store. Fetches happen on that single
/// thread, so ticks for a job are strictly sequential and at most one fetch
/// is in flight at a time. The store-level claim taken in [`spawn`] keeps a
/// second poller from ever double-polling the same store.
///
/// [`spawn`]: StatusPoller::spawn
#[derive(Debug)]
pub struct StatusPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    store: Arc<WorkflowStore>,
}

impl StatusPoller {
    pub fn spawn(
        store: Arc<WorkflowStore>,
        client: BackendClient,
        interval: Duration,
    ) -> Result<Self, PollerError> {
        if !store.try_claim_poller() {
            return Err(PollerError::AlreadyAttached);
        }
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let store = Arc::clone(&store);
            let stop = Arc::clone(&stop);
            thread::spawn(move || run_status_poller_loop(store, client, interval, stop))
        };
        Ok(Self {
            stop,
            handle: Some(handle),
            store,
        })
    }

    /// Signals the loop to stop, joins the thread and releases the store's
    /// poller claim. Dropping the handle does the same.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            self.store.release_poller();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
