//! Load test metric types.

use serde::{Deserialize, Serialize};

/// Change in the engine process's resource usage across an endpoint window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDelta {
    /// Resident set size change in KiB.
    pub memory_kb: i64,
    /// User + system CPU time consumed in milliseconds.
    pub cpu_time_ms: i64,
}

/// Load statistics for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointMetric {
    pub endpoint: String,
    /// Number of virtual users that drove this endpoint.
    pub concurrency: u32,
    pub total_requests: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub requests_per_second: f64,
    /// fail / total * 100, 0 when nothing was sent.
    pub error_rate: f64,
    /// Best-effort; absent where process stats are unavailable.
    pub resource_delta: Option<ResourceDelta>,
}

impl EndpointMetric {
    /// Zero-credit metric used when the load phase could not run.
    pub fn unavailable(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            concurrency: 0,
            total_requests: 0,
            success_count: 0,
            fail_count: 0,
            avg_latency_ms: 0.0,
            min_latency_ms: 0.0,
            max_latency_ms: 0.0,
            p50_latency_ms: 0.0,
            p95_latency_ms: 0.0,
            p99_latency_ms: 0.0,
            requests_per_second: 0.0,
            error_rate: 100.0,
            resource_delta: None,
        }
    }
}
