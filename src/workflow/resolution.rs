use crate::api::{BackendClient, ResumeDecision, ResumeStatus};
use crate::shared::logging::append_client_log;
use crate::workflow::state::UiStatus;
use crate::workflow::store::WorkflowStore;
use std::sync::atomic::{AtomicBool, Ordering};

const DEFAULT_RESUME_ERROR: &str = "failed to resume workflow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Approve succeeded and the backend reports the job running again.
    Resumed,
    /// Reject completed; the workflow is over. Carries the server message
    /// when one was provided.
    Aborted { message: Option<String> },
    /// The resume call failed (server-reported or transport). The interrupt
    /// is abandoned, not retried.
    Failed { message: String },
    /// No pending interrupt, payload or job id: the call was a no-op.
    NotInterrupted,
    /// Another approve/reject is still in flight for this resolver.
    AlreadyInFlight,
}

/// Turns a pending interrupt back into a running job (approve) or a
/// terminated one (reject). One resolver guards one interrupt flow:
/// resolutions are single-flight, so a second call while one is pending is
/// refused without touching the store.
#[derive(Debug, Default)]
pub struct InterruptResolver {
    in_flight: AtomicBool,
}

impl InterruptResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approve(&self, store: &WorkflowStore, client: &BackendClient) -> ResolutionOutcome {
        self.resolve(store, client, ResumeDecision::Approve)
    }

    pub fn reject(&self, store: &WorkflowStore, client: &BackendClient) -> ResolutionOutcome {
        self.resolve(store, client, ResumeDecision::Reject)
    }

    pub fn resolve(
        &self,
        store: &WorkflowStore,
        client: &BackendClient,
        decision: ResumeDecision,
    ) -> ResolutionOutcome {
        let snapshot = store.snapshot();
        let Some(job_id) = snapshot.job_id else {
            return ResolutionOutcome::NotInterrupted;
        };
        if snapshot.ui_status != UiStatus::Interrupted || snapshot.interrupt_payload.is_none() {
            return ResolutionOutcome::NotInterrupted;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return ResolutionOutcome::AlreadyInFlight;
        }

        let outcome = match client.resume(&job_id, decision) {
            Ok(response) => match decision {
                ResumeDecision::Approve if response.status == ResumeStatus::Running => {
                    store.set_interrupt_payload(None);
                    store.set_ui_status(UiStatus::Running);
                    append_client_log(store.paths(), "info", "workflow.resumed", &job_id);
                    ResolutionOutcome::Resumed
                }
                ResumeDecision::Approve => {
                    let message = response
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_RESUME_ERROR.to_string());
                    self.abandon(store, &job_id, message.clone());
                    ResolutionOutcome::Failed { message }
                }
                ResumeDecision::Reject => {
                    // Reject always aborts; the response's status field is
                    // ignored on purpose (observed backend contract).
                    let message = response.message.filter(|m| !m.trim().is_empty());
                    store.set_interrupt_payload(None);
                    if let Some(message) = &message {
                        store.set_error(Some(message.clone()));
                    }
                    store.set_ui_status(UiStatus::Error);
                    append_client_log(store.paths(), "info", "workflow.rejected", &job_id);
                    ResolutionOutcome::Aborted { message }
                }
            },
            Err(err) => {
                let message = err.to_string();
                self.abandon(store, &job_id, message.clone());
                ResolutionOutcome::Failed { message }
            }
        };

        self.in_flight.store(false, Ordering::Release);
        outcome
    }

    /// Resume failed: the workflow is considered abandoned. The payload is
    /// cleared so it never outlives the interrupted state.
    fn abandon(&self, store: &WorkflowStore, job_id: &str, message: String) {
        store.set_interrupt_payload(None);
        store.set_error(Some(message.clone()));
        store.set_ui_status(UiStatus::Error);
        append_client_log(
            store.paths(),
            "error",
            "workflow.resume.failed",
            &format!("{job_id}: {message}"),
        );
    }
}
