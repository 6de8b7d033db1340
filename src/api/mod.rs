pub mod analysis;
pub mod auth;
pub mod client;
pub mod metrics;

pub use analysis::{
    AnalysisType, JobStatus, NodeStatusEntry, ResumeDecision, ResumeResponse, ResumeStatus,
    StartAnalysisResponse, StatusResponse,
};
pub use auth::{LoginRequest, LoginResponse, User};
pub use client::BackendClient;
pub use metrics::{BreakdownEntry, MetricsSummary, TimeSeriesPoint, METRICS_POLL_INTERVAL_MS};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("session is not authenticated")]
    Unauthorized,
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}
