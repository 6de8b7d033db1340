use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::logging::append_client_log;
use crate::shared::paths::ClientPaths;
use crate::workflow::state::{
    InterruptPayload, LogEntry, NodeStatusInfo, NodeStatusPatch, UiStatus, WorkflowState,
};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Single source of truth for the workflow view, mutated through named
/// operations only. Every mutation persists the whole state to the snapshot
/// file under the state root; persistence is a cache, so write failures are
/// logged and swallowed, never returned to the caller.
#[derive(Debug)]
pub struct WorkflowStore {
    paths: ClientPaths,
    state: Mutex<WorkflowState>,
    poller_attached: AtomicBool,
}

impl WorkflowStore {
    /// Opens the store rooted at `state_root`, restoring the persisted
    /// snapshot when one exists. A missing or unparsable snapshot falls back
    /// to the initial state without error.
    pub fn open(state_root: impl Into<PathBuf>) -> Self {
        let paths = ClientPaths::new(state_root);
        let state = load_snapshot(&paths).unwrap_or_default();
        Self {
            paths,
            state: Mutex::new(state),
            poller_attached: AtomicBool::new(false),
        }
    }

    pub fn paths(&self) -> &ClientPaths {
        &self.paths
    }

    /// A consistent copy of the current state. No torn reads: the single
    /// lock means a snapshot always reflects a whole mutation or none of it.
    pub fn snapshot(&self) -> WorkflowState {
        self.lock_state().clone()
    }

    pub fn set_job_id(&self, job_id: Option<String>) {
        self.mutate(|state| state.job_id = job_id);
    }

    pub fn set_ui_status(&self, status: UiStatus) {
        self.mutate(|state| state.ui_status = status);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.mutate(|state| state.error = error);
    }

    pub fn set_started_at(&self, timestamp: Option<String>) {
        self.mutate(|state| state.started_at = timestamp);
    }

    pub fn set_completed_at(&self, timestamp: Option<String>) {
        self.mutate(|state| state.completed_at = timestamp);
    }

    /// Wholesale replacement: callers pass the authoritative current log
    /// list from the backend, not an increment.
    pub fn set_logs(&self, logs: Vec<LogEntry>) {
        self.mutate(|state| state.logs = logs);
    }

    pub fn add_log(&self, entry: LogEntry) {
        self.mutate(|state| state.logs.push(entry));
    }

    pub fn set_interrupt_payload(&self, payload: Option<InterruptPayload>) {
        self.mutate(|state| state.interrupt_payload = payload);
    }

    /// Upsert for one node entry: an absent entry is created (pending unless
    /// the patch carries a status), a present entry has only the patch's
    /// populated fields overwritten.
    pub fn update_node_status(&self, node_id: &str, patch: NodeStatusPatch) {
        self.mutate(|state| {
            let entry = state
                .node_statuses
                .entry(node_id.to_string())
                .or_insert_with(|| NodeStatusInfo::pending(node_id));
            patch.apply_to(entry);
        });
    }

    /// Restores the entire state to its initial value regardless of what it
    /// currently holds.
    pub fn reset(&self) {
        self.mutate(|state| *state = WorkflowState::initial());
    }

    /// Runs `apply` under a single lock acquisition and a single persist, but
    /// only while the state still targets `expected_job_id` and is running.
    /// Returns false without touching the state otherwise, so a reset or
    /// re-target landing before the lock is taken can never be half
    /// overwritten by a merge that started earlier.
    pub(crate) fn mutate_while_running(
        &self,
        expected_job_id: &str,
        apply: impl FnOnce(&mut WorkflowState),
    ) -> bool {
        let snapshot = {
            let mut guard = self.lock_state();
            if guard.job_id.as_deref() != Some(expected_job_id)
                || guard.ui_status != UiStatus::Running
            {
                return false;
            }
            apply(&mut guard);
            guard.clone()
        };
        self.persist(&snapshot);
        true
    }

    /// Claims the single poller slot for this store. At most one poller loop
    /// may drive a store at a time; the claim is released by
    /// [`release_poller`](Self::release_poller).
    pub(crate) fn try_claim_poller(&self) -> bool {
        self.poller_attached
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_poller(&self) {
        self.poller_attached.store(false, Ordering::Release);
    }

    fn mutate(&self, apply: impl FnOnce(&mut WorkflowState)) {
        let snapshot = {
            let mut guard = self.lock_state();
            apply(&mut guard);
            guard.clone()
        };
        self.persist(&snapshot);
    }

    fn lock_state(&self) -> MutexGuard<'_, WorkflowState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, state: &WorkflowState) {
        let Ok(body) = serde_json::to_vec_pretty(state) else {
            return;
        };
        let path = self.paths.workflow_snapshot_path();
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                append_client_log(&self.paths, "warn", "store.persist.failed", &err.to_string());
                return;
            }
        }
        if let Err(err) = atomic_write_file(&path, &body) {
            append_client_log(&self.paths, "warn", "store.persist.failed", &err.to_string());
        }
    }
}

fn load_snapshot(paths: &ClientPaths) -> Option<WorkflowState> {
    let raw = fs::read_to_string(paths.workflow_snapshot_path()).ok()?;
    serde_json::from_str(&raw).ok()
}
