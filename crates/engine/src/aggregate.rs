//! Report aggregation: the composite score, tier and recommendation list.

use chrono::Utc;
use readyprobe_common::score::{clamp_score, mean, MAX_SCORE};
use readyprobe_common::{RunId, Timestamp};
use readyprobe_report_schema::{
    ComplianceReport, CompositeReport, EndpointMetric, PhaseFailure, ReadinessTier, SubScores,
    VulnerabilityReport, REPORT_SCHEMA_VERSION,
};
use std::collections::HashSet;

pub const PERFORMANCE_WEIGHT: f64 = 0.30;
pub const SECURITY_WEIGHT: f64 = 0.35;
pub const COMPLIANCE_WEIGHT: f64 = 0.35;

/// Sub-scores below this trigger generic advice.
pub const ADVICE_THRESHOLD: f64 = 80.0;

/// Mean of `100 - error_rate` across endpoints; 0 with no endpoints.
pub fn performance_score(metrics: &[EndpointMetric]) -> f64 {
    clamp_score(mean(metrics.iter().map(|m| MAX_SCORE - m.error_rate)))
}

/// `round(0.30 * performance + 0.35 * security + 0.35 * compliance)`.
pub fn overall_score(scores: &SubScores) -> u32 {
    let weighted = PERFORMANCE_WEIGHT * clamp_score(scores.performance)
        + SECURITY_WEIGHT * clamp_score(scores.security)
        + COMPLIANCE_WEIGHT * clamp_score(scores.compliance);
    clamp_score(weighted).round() as u32
}

/// Threshold-triggered advice followed by the de-duplicated finding and
/// failure recommendations, in first-seen order.
pub fn recommendations(
    scores: &SubScores,
    vulnerability: &VulnerabilityReport,
    compliance: &ComplianceReport,
) -> Vec<String> {
    let mut advice = Vec::new();
    if scores.performance < ADVICE_THRESHOLD {
        advice.push(
            "Improve reliability under load: investigate failing endpoints, add capacity and tune timeouts"
                .to_string(),
        );
    }
    if scores.security < ADVICE_THRESHOLD {
        advice.push(
            "Remediate critical and high severity vulnerabilities before production rollout"
                .to_string(),
        );
    }
    if scores.compliance < ADVICE_THRESHOLD {
        advice.push(
            "Close compliance gaps in the failing controls and document the remaining exceptions"
                .to_string(),
        );
    }

    let specific = vulnerability
        .findings
        .iter()
        .filter_map(|f| f.recommendation.clone())
        .chain(
            compliance
                .failures
                .iter()
                .flat_map(|f| f.recommendations.iter().cloned()),
        );

    let mut seen = HashSet::new();
    advice
        .into_iter()
        .chain(specific)
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

/// Identity of a run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    pub target_address: String,
    pub started_at: Timestamp,
}

/// Merge the three phase outputs into one report.
pub fn assemble(
    run: RunContext,
    endpoint_metrics: Vec<EndpointMetric>,
    vulnerability_report: VulnerabilityReport,
    compliance_report: ComplianceReport,
    phase_failures: Vec<PhaseFailure>,
) -> CompositeReport {
    let scores = SubScores {
        performance: performance_score(&endpoint_metrics),
        security: clamp_score(vulnerability_report.security_score),
        compliance: clamp_score(compliance_report.overall_score),
    };
    let overall = overall_score(&scores);
    let recommendations = recommendations(&scores, &vulnerability_report, &compliance_report);

    CompositeReport {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        run_id: run.run_id,
        target_address: run.target_address,
        timestamp: run.started_at,
        completed_at: Utc::now(),
        endpoint_metrics,
        vulnerability_report,
        compliance_report,
        scores,
        overall_score: overall,
        readiness_tier: ReadinessTier::from_score(overall as f64),
        recommendations,
        phase_failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readyprobe_report_schema::{
        ComplianceFailure, Finding, Framework, ProbeCategory, RiskLevel, Severity,
    };

    fn scores(performance: f64, security: f64, compliance: f64) -> SubScores {
        SubScores {
            performance,
            security,
            compliance,
        }
    }

    fn metric(error_rate: f64) -> EndpointMetric {
        EndpointMetric {
            error_rate,
            ..EndpointMetric::unavailable("/")
        }
    }

    #[test]
    fn test_performance_score() {
        assert_eq!(performance_score(&[]), 0.0);
        assert_eq!(performance_score(&[metric(0.0), metric(20.0)]), 90.0);
        assert_eq!(performance_score(&[EndpointMetric::unavailable("/x")]), 0.0);
    }

    #[test]
    fn test_overall_weights() {
        assert_eq!(overall_score(&scores(100.0, 100.0, 100.0)), 100);
        assert_eq!(overall_score(&scores(0.0, 0.0, 0.0)), 0);
        assert_eq!(overall_score(&scores(100.0, 0.0, 0.0)), 30);
        assert_eq!(overall_score(&scores(0.0, 100.0, 0.0)), 35);
        assert_eq!(overall_score(&scores(80.0, 67.0, 50.0)), 65);
    }

    #[test]
    fn test_decreasing_one_score_never_raises_overall() {
        for held in [0.0, 50.0, 100.0] {
            for x in 1..=100 {
                let high = x as f64;
                let low = high - 1.0;
                assert!(overall_score(&scores(low, held, held)) <= overall_score(&scores(high, held, held)));
                assert!(overall_score(&scores(held, low, held)) <= overall_score(&scores(held, high, held)));
                assert!(overall_score(&scores(held, held, low)) <= overall_score(&scores(held, held, high)));
            }
        }
    }

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            (90, ReadinessTier::EnterpriseReady),
            (89, ReadinessTier::NearlyReady),
            (75, ReadinessTier::NearlyReady),
            (74, ReadinessTier::NeedsImprovement),
            (60, ReadinessTier::NeedsImprovement),
            (59, ReadinessTier::SignificantIssues),
        ];
        for (score, tier) in cases {
            assert_eq!(ReadinessTier::from_score(score as f64), tier, "{}", score);
        }
    }

    #[test]
    fn test_recommendations_dedup_in_order() {
        let mut vulnerability = VulnerabilityReport::unavailable();
        for name in ["a", "b", "c"] {
            vulnerability.findings.push(Finding {
                test_name: name.to_string(),
                category: ProbeCategory::Configuration,
                severity: Severity::Medium,
                description: String::new(),
                evidence: None,
                recommendation: Some(if name == "b" { "fix b" } else { "fix a" }.to_string()),
            });
        }
        let mut compliance = ComplianceReport::unavailable("test", "/src");
        compliance.failures.push(ComplianceFailure {
            control_id: "GDPR-ART7".to_string(),
            name: String::new(),
            framework: Framework::Gdpr,
            category: "privacy".to_string(),
            requirement: String::new(),
            score: 0.0,
            risk_level: RiskLevel::Critical,
            details: String::new(),
            recommendations: vec!["fix b".to_string(), "record consent".to_string()],
        });

        let recs = recommendations(&scores(100.0, 90.0, 50.0), &vulnerability, &compliance);
        assert_eq!(recs.len(), 4);
        assert!(recs[0].starts_with("Close compliance gaps"));
        assert_eq!(&recs[1..], &["fix a", "fix b", "record consent"]);
    }

    #[test]
    fn test_no_advice_for_healthy_scores() {
        let recs = recommendations(
            &scores(100.0, 100.0, 80.0),
            &VulnerabilityReport::unavailable(),
            &ComplianceReport::unavailable("test", "/src"),
        );
        assert!(recs.is_empty());
    }

    #[test]
    fn test_assemble_all_phases_failed() {
        let run = RunContext {
            run_id: RunId::from("run-test"),
            target_address: "http://target".to_string(),
            started_at: Timestamp::now(),
        };
        let report = assemble(
            run,
            vec![EndpointMetric::unavailable("/")],
            VulnerabilityReport::unavailable(),
            ComplianceReport::unavailable("test", "/src"),
            Vec::new(),
        );
        assert_eq!(report.overall_score, 0);
        assert_eq!(report.readiness_tier, ReadinessTier::SignificantIssues);
        assert_eq!(report.recommendations.len(), 3);
    }
}
