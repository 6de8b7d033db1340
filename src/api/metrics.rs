use crate::api::{ApiError, BackendClient};
use serde::Deserialize;

/// Refresh cadence the dashboard uses for the metrics endpoints.
pub const METRICS_POLL_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub error_rate: f64,
    pub avg_response_time: f64,
    pub active_users: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeSeriesPoint {
    pub time: String,
    pub requests: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BreakdownEntry {
    pub service: String,
    pub errors: u64,
    pub warnings: u64,
}

impl BackendClient {
    pub fn metrics_summary(&self) -> Result<MetricsSummary, ApiError> {
        self.get_json("/metrics/summary", &[])
    }

    pub fn metrics_timeseries(&self) -> Result<Vec<TimeSeriesPoint>, ApiError> {
        self.get_json("/metrics/timeseries", &[])
    }

    pub fn metrics_breakdown(&self) -> Result<Vec<BreakdownEntry>, ApiError> {
        self.get_json("/metrics/breakdown", &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_decodes_the_camel_case_wire_shape() {
        let raw = r#"{"totalRequests": 120, "errorRate": 0.02, "avgResponseTime": 41.5, "activeUsers": 7}"#;
        let summary: MetricsSummary = serde_json::from_str(raw).expect("summary parses");
        assert_eq!(summary.total_requests, 120);
        assert_eq!(summary.active_users, 7);
    }
}
