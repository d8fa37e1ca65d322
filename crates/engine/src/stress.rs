//! Stress profile: the load phase repeated at escalating concurrency tiers.

use crate::client::ProbeClient;
use crate::load::{LoadConfig, LoadTestEngine};
use readyprobe_common::score::mean;
use readyprobe_common::{Result, Timestamp};
use readyprobe_report_schema::EndpointMetric;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Tiers and circuit-breaker threshold for a stress run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressProfile {
    /// Virtual-user counts, run in order.
    pub tiers: Vec<u32>,
    /// Mean error rate (percent) above which the run stops early.
    pub error_rate_threshold: f64,
}

impl Default for StressProfile {
    fn default() -> Self {
        Self {
            tiers: vec![10, 50, 100, 200, 500],
            error_rate_threshold: 50.0,
        }
    }
}

/// Summary of one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTier {
    pub concurrency: u32,
    /// Mean error rate across endpoints.
    pub error_rate: f64,
    /// Mean of endpoint average latencies.
    pub avg_latency_ms: f64,
    /// Sum of endpoint throughputs.
    pub requests_per_second: f64,
    pub endpoint_metrics: Vec<EndpointMetric>,
}

/// Result of a stress run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub target_address: String,
    pub started_at: Timestamp,
    pub tiers: Vec<StressTier>,
    /// First tier whose error rate exceeded the threshold.
    pub breaking_point: Option<u32>,
    /// Highest tier that stayed under the threshold.
    pub max_stable_concurrency: Option<u32>,
    pub stopped_early: bool,
}

/// Run `profile` against the target, reusing `base` for everything except
/// the concurrency.
pub async fn run_stress_profile(
    client: Arc<dyn ProbeClient>,
    base: &LoadConfig,
    profile: &StressProfile,
) -> Result<StressReport> {
    let started_at = Timestamp::now();
    let mut report = StressReport {
        target_address: client.base_url().to_string(),
        started_at,
        tiers: Vec::with_capacity(profile.tiers.len()),
        breaking_point: None,
        max_stable_concurrency: None,
        stopped_early: false,
    };

    for (index, &concurrency) in profile.tiers.iter().enumerate() {
        info!("Stress tier {}: {} virtual users", index + 1, concurrency);
        let config = LoadConfig {
            concurrency,
            ..base.clone()
        };
        let metrics = LoadTestEngine::new(Arc::clone(&client), config).run().await?;

        let tier = StressTier {
            concurrency,
            error_rate: mean(metrics.iter().map(|m| m.error_rate)),
            avg_latency_ms: mean(metrics.iter().map(|m| m.avg_latency_ms)),
            requests_per_second: metrics.iter().map(|m| m.requests_per_second).sum(),
            endpoint_metrics: metrics,
        };
        let tripped = tier.error_rate > profile.error_rate_threshold;
        report.tiers.push(tier);

        if tripped {
            warn!(
                "Error rate exceeded {:.1}% at {} virtual users, stopping",
                profile.error_rate_threshold, concurrency
            );
            report.breaking_point = Some(concurrency);
            report.stopped_early = index + 1 < profile.tiers.len();
            break;
        }
        report.max_stable_concurrency = Some(concurrency);
    }

    Ok(report)
}
