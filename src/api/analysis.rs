use crate::api::{ApiError, BackendClient};
use crate::workflow::state::{InterruptPayload, LogEntry, NodeStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisType {
    Security,
    Performance,
    Quality,
}

impl AnalysisType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::Security => "security",
            AnalysisType::Performance => "performance",
            AnalysisType::Quality => "quality",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw {
            "security" => Ok(AnalysisType::Security),
            "performance" => Ok(AnalysisType::Performance),
            "quality" => Ok(AnalysisType::Quality),
            other => Err(format!(
                "unknown analysis type `{other}`; expected security, performance or quality"
            )),
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartAnalysisResponse {
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub status: String,
}

/// The backend's own view of the job, as reported by `/api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Error,
    Interrupted,
}

/// One node entry inside a status response. The backend keys entries by node
/// id and uses snake_case field names on this part of the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeStatusEntry {
    pub status: NodeStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Full poll response. `logs` is the complete history each tick, not a delta.
/// Log entries and the interrupt payload arrive in the same shape the client
/// persists, so they deserialize straight into the domain types.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub node_statuses: BTreeMap<String, NodeStatusEntry>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub interrupt_payload: Option<InterruptPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeDecision {
    Approve,
    Reject,
}

impl ResumeDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            ResumeDecision::Approve => "approve",
            ResumeDecision::Reject => "reject",
        }
    }
}

impl std::fmt::Display for ResumeDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
struct ResumeRequest<'a> {
    #[serde(rename = "threadId")]
    thread_id: &'a str,
    decision: ResumeDecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Running,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeResponse {
    pub status: ResumeStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl BackendClient {
    /// Uploads a file for analysis. The returned thread id identifies the
    /// remote job for all later status and resume calls.
    pub fn start_analysis(
        &self,
        file_name: &str,
        file_bytes: &[u8],
        analysis_type: AnalysisType,
    ) -> Result<StartAnalysisResponse, ApiError> {
        self.post_multipart(
            "/api/start-analysis",
            &[
                ("file", Some(file_name), file_bytes),
                ("analysisType", None, analysis_type.as_str().as_bytes()),
            ],
        )
    }

    pub fn fetch_status(&self, thread_id: &str) -> Result<StatusResponse, ApiError> {
        self.get_json("/api/status", &[("threadId", thread_id)])
    }

    pub fn resume(
        &self,
        thread_id: &str,
        decision: ResumeDecision,
    ) -> Result<ResumeResponse, ApiError> {
        self.post_json(
            "/api/resume",
            &ResumeRequest {
                thread_id,
                decision,
            },
        )
    }
}
