//! Load test engine: concurrent synthetic traffic against a set of endpoints.
//!
//! Every endpoint gets its own group of virtual users, and all groups run at
//! the same time. Each virtual user hands its samples back through its own
//! join handle, so no collection is shared between tasks.

pub mod resources;
pub mod stats;

use crate::client::{elapsed_of, ProbeClient, ProbeRequest};
use rand::Rng;
use readyprobe_common::{Error, Result};
use readyprobe_report_schema::EndpointMetric;
use resources::ResourceSnapshot;
use serde::{Deserialize, Serialize};
use stats::{summarize, CallSample};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Load phase settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Paths to exercise, relative to the target.
    pub endpoints: Vec<String>,
    /// Virtual users per endpoint.
    pub concurrency: u32,
    /// Sequential calls issued by each virtual user.
    pub requests_per_user: u32,
    /// Window over which virtual user start times are spread.
    pub ramp_up_ms: u64,
    /// Length of each endpoint's test window; users stop issuing calls once
    /// it has elapsed. Zero disables the bound.
    pub duration_ms: u64,
    /// Upper bound of the random think time between calls.
    pub max_think_time_ms: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["/".to_string(), "/api/health".to_string()],
            concurrency: 10,
            requests_per_user: 10,
            ramp_up_ms: 2_000,
            duration_ms: 30_000,
            max_think_time_ms: 100,
        }
    }
}

impl LoadConfig {
    pub fn ramp_up(&self) -> Duration {
        Duration::from_millis(self.ramp_up_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Start offset of virtual user `index` on a linear ramp.
    pub fn start_offset(&self, index: u32) -> Duration {
        if self.concurrency == 0 {
            return Duration::ZERO;
        }
        self.ramp_up() * index / self.concurrency
    }
}

/// Drives virtual users against every configured endpoint.
pub struct LoadTestEngine {
    client: Arc<dyn ProbeClient>,
    config: LoadConfig,
}

impl LoadTestEngine {
    pub fn new(client: Arc<dyn ProbeClient>, config: LoadConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Run the load test. Returns one metric per endpoint, in configured order.
    pub async fn run(&self) -> Result<Vec<EndpointMetric>> {
        if self.config.endpoints.is_empty() {
            return Err(Error::LoadTest("no endpoints configured".to_string()));
        }

        info!(
            "Load testing {} endpoint(s) on {} with {} virtual users x {} requests",
            self.config.endpoints.len(),
            self.client.base_url(),
            self.config.concurrency,
            self.config.requests_per_user
        );

        // Fan out one task group per endpoint.
        let handles: Vec<_> = self
            .config
            .endpoints
            .iter()
            .map(|endpoint| {
                let client = Arc::clone(&self.client);
                let config = self.config.clone();
                let endpoint = endpoint.clone();
                tokio::spawn(async move { test_endpoint(client, config, endpoint).await })
            })
            .collect();

        // Fan in, keeping endpoint order.
        let mut metrics = Vec::with_capacity(handles.len());
        for (endpoint, handle) in self.config.endpoints.iter().zip(handles) {
            match handle.await {
                Ok(metric) => metrics.push(metric),
                Err(e) => {
                    warn!("Load task for {} aborted: {}", endpoint, e);
                    metrics.push(EndpointMetric::unavailable(endpoint));
                }
            }
        }

        Ok(metrics)
    }
}

async fn test_endpoint(
    client: Arc<dyn ProbeClient>,
    config: LoadConfig,
    endpoint: String,
) -> EndpointMetric {
    let before = ResourceSnapshot::capture();
    let window_start = Instant::now();
    let deadline = (config.duration_ms > 0).then(|| window_start + config.duration());

    let users: Vec<_> = (0..config.concurrency)
        .map(|index| {
            let client = Arc::clone(&client);
            let endpoint = endpoint.clone();
            let start_at = window_start + config.start_offset(index);
            let requests = config.requests_per_user;
            let max_think = config.max_think_time_ms;
            tokio::spawn(async move {
                run_virtual_user(client, endpoint, start_at, requests, max_think, deadline).await
            })
        })
        .collect();

    let mut samples = Vec::new();
    for (index, user) in users.into_iter().enumerate() {
        match user.await {
            Ok(user_samples) => samples.extend(user_samples),
            Err(e) => warn!("Virtual user {} on {} aborted: {}", index, endpoint, e),
        }
    }

    let delta = match (before, ResourceSnapshot::capture()) {
        (Some(before), Some(after)) => Some(before.delta_to(&after)),
        _ => None,
    };

    let metric = summarize(
        &endpoint,
        config.concurrency,
        &samples,
        config.duration(),
        delta,
    );
    info!(
        "{}: {} requests, {:.1}% errors, avg {:.1}ms",
        endpoint, metric.total_requests, metric.error_rate, metric.avg_latency_ms
    );
    metric
}

async fn run_virtual_user(
    client: Arc<dyn ProbeClient>,
    endpoint: String,
    start_at: Instant,
    requests: u32,
    max_think_time_ms: u64,
    deadline: Option<Instant>,
) -> Vec<CallSample> {
    tokio::time::sleep_until(start_at).await;

    let request = ProbeRequest::get(endpoint.as_str());
    let mut samples = Vec::new();
    for call in 0..requests {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!("{}: test window closed after {} calls", endpoint, call);
            break;
        }

        let exchange = client.send(&request).await;
        samples.push(CallSample {
            latency: elapsed_of(&exchange),
            success: matches!(exchange, Ok(ref response) if response.is_success()),
        });

        if call + 1 < requests && max_think_time_ms > 0 {
            let think = rand::thread_rng().gen_range(0..=max_think_time_ms);
            tokio::time::sleep(Duration::from_millis(think)).await;
        }
    }
    samples
}
