//! Latency and throughput statistics for one endpoint.

use readyprobe_common::score::percentage;
use readyprobe_report_schema::{EndpointMetric, ResourceDelta};
use std::time::Duration;

/// One call made by a virtual user.
#[derive(Debug, Clone, Copy)]
pub struct CallSample {
    pub latency: Duration,
    pub success: bool,
}

/// Nearest-rank percentile over sorted values; 0 for an empty slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Summarize the samples of one endpoint window.
pub fn summarize(
    endpoint: &str,
    concurrency: u32,
    samples: &[CallSample],
    test_duration: Duration,
    resource_delta: Option<ResourceDelta>,
) -> EndpointMetric {
    let total = samples.len() as u64;
    let successes = samples.iter().filter(|s| s.success).count() as u64;
    let failures = total - successes;

    let mut latencies: Vec<f64> = samples
        .iter()
        .map(|s| s.latency.as_secs_f64() * 1000.0)
        .collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    let avg = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    };

    let seconds = test_duration.as_secs_f64();
    let rps = if seconds > 0.0 {
        total as f64 / seconds
    } else {
        0.0
    };

    EndpointMetric {
        endpoint: endpoint.to_string(),
        concurrency,
        total_requests: total,
        success_count: successes,
        fail_count: failures,
        avg_latency_ms: avg,
        min_latency_ms: latencies.first().copied().unwrap_or(0.0),
        max_latency_ms: latencies.last().copied().unwrap_or(0.0),
        p50_latency_ms: percentile(&latencies, 50.0),
        p95_latency_ms: percentile(&latencies, 95.0),
        p99_latency_ms: percentile(&latencies, 99.0),
        requests_per_second: rps,
        error_rate: percentage(failures, total),
        resource_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ms: u64, success: bool) -> CallSample {
        CallSample {
            latency: Duration::from_millis(ms),
            success,
        }
    }

    #[test]
    fn test_summarize_mixed_samples() {
        let samples = vec![
            sample(10, true),
            sample(20, true),
            sample(30, false),
            sample(40, true),
        ];
        let metric = summarize("/api", 2, &samples, Duration::from_secs(2), None);

        assert_eq!(metric.total_requests, 4);
        assert_eq!(metric.success_count, 3);
        assert_eq!(metric.fail_count, 1);
        assert_eq!(metric.error_rate, 25.0);
        assert!((metric.avg_latency_ms - 25.0).abs() < 1e-9);
        assert_eq!(metric.min_latency_ms, 10.0);
        assert_eq!(metric.max_latency_ms, 40.0);
        assert_eq!(metric.p50_latency_ms, 20.0);
        assert_eq!(metric.p99_latency_ms, 40.0);
        assert_eq!(metric.requests_per_second, 2.0);
    }

    #[test]
    fn test_summarize_empty_window_is_defined() {
        let metric = summarize("/api", 0, &[], Duration::from_secs(10), None);
        assert_eq!(metric.total_requests, 0);
        assert_eq!(metric.error_rate, 0.0);
        assert_eq!(metric.avg_latency_ms, 0.0);
        assert_eq!(metric.requests_per_second, 0.0);
        assert!(!metric.error_rate.is_nan());
    }

    #[test]
    fn test_all_failures() {
        let samples = vec![sample(5, false), sample(7, false)];
        let metric = summarize("/down", 1, &samples, Duration::ZERO, None);
        assert_eq!(metric.error_rate, 100.0);
        assert_eq!(metric.requests_per_second, 0.0);
    }
}
