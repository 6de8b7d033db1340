use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which mode the client-side workflow view is in. Exactly one value at a
/// time; transitions are driven by the status poller and interrupt
/// resolution, never by the store itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiStatus {
    Idle,
    Running,
    Completed,
    Error,
    Interrupted,
}

impl UiStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UiStatus::Completed | UiStatus::Error)
    }
}

impl std::fmt::Display for UiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiStatus::Idle => write!(f, "idle"),
            UiStatus::Running => write!(f, "running"),
            UiStatus::Completed => write!(f, "completed"),
            UiStatus::Error => write!(f, "error"),
            UiStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Backend-reported state of one workflow node. Transitions are monotonic in
/// practice (pending -> running -> completed/failed) but the client trusts
/// the backend's latest snapshot and overwrites without checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "pending"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Completed => write!(f, "completed"),
            NodeStatus::Failed => write!(f, "failed"),
            NodeStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Debug => write!(f, "debug"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub node: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatusInfo {
    pub node_id: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl NodeStatusInfo {
    pub fn pending(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            status: NodeStatus::Pending,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}

/// Partial update for one node entry. `Some` fields overwrite, `None` fields
/// preserve whatever the entry already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStatusPatch {
    pub status: Option<NodeStatus>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
}

impl NodeStatusPatch {
    pub fn status(status: NodeStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, entry: &mut NodeStatusInfo) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(started_at) = &self.started_at {
            entry.started_at = Some(started_at.clone());
        }
        if let Some(completed_at) = &self.completed_at {
            entry.completed_at = Some(completed_at.clone());
        }
        if let Some(error) = &self.error {
            entry.error = Some(error.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFinding {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
}

/// Backend-signaled pause requiring a human approve/reject decision before
/// the job continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptPayload {
    pub node_id: String,
    pub findings: Vec<SecurityFinding>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The full client-side view of one analysis job. Persisted wholesale after
/// every mutation and restored at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    #[serde(default)]
    pub job_id: Option<String>,
    pub ui_status: UiStatus,
    #[serde(default)]
    pub node_statuses: BTreeMap<String, NodeStatusInfo>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub interrupt_payload: Option<InterruptPayload>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl WorkflowState {
    pub fn initial() -> Self {
        Self {
            job_id: None,
            ui_status: UiStatus::Idle,
            node_statuses: BTreeMap::new(),
            logs: Vec::new(),
            interrupt_payload: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::initial()
    }
}
