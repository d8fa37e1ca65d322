//! Security score arithmetic.

use readyprobe_common::score::{clamp_score, MAX_SCORE};
use readyprobe_report_schema::{Finding, SecurityTier, SeverityCounts};

/// `max(0, 100 - sum of severity weights)` over confirmed findings.
pub fn security_score(findings: &[Finding]) -> f64 {
    let deducted: f64 = findings.iter().map(|f| f.severity.weight()).sum();
    clamp_score(MAX_SCORE - deducted)
}

/// Per-severity counts of `findings`.
pub fn count_by_severity(findings: &[Finding]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for finding in findings {
        counts.add(finding.severity);
    }
    counts
}

pub fn security_tier(score: f64) -> SecurityTier {
    SecurityTier::from_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use readyprobe_report_schema::{ProbeCategory, Severity};

    fn finding(severity: Severity) -> Finding {
        Finding {
            test_name: format!("{}_probe", severity),
            category: ProbeCategory::Injection,
            severity,
            description: String::new(),
            evidence: None,
            recommendation: None,
        }
    }

    #[test]
    fn test_critical_plus_medium() {
        let findings = vec![finding(Severity::Critical), finding(Severity::Medium)];
        assert_eq!(security_score(&findings), 67.0);
        assert_eq!(security_tier(67.0), SecurityTier::Fair);
    }

    #[test]
    fn test_no_findings_is_perfect() {
        assert_eq!(security_score(&[]), 100.0);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let findings: Vec<_> = (0..5).map(|_| finding(Severity::Critical)).collect();
        assert_eq!(security_score(&findings), 0.0);
    }

    #[test]
    fn test_more_findings_never_raise_the_score() {
        let mut findings = Vec::new();
        let mut previous = security_score(&findings);
        for severity in [
            Severity::Info,
            Severity::Low,
            Severity::High,
            Severity::Medium,
            Severity::Critical,
            Severity::High,
        ] {
            findings.push(finding(severity));
            let score = security_score(&findings);
            assert!(score <= previous);
            previous = score;
        }
    }

    #[test]
    fn test_info_findings_are_free() {
        let findings = vec![finding(Severity::Info), finding(Severity::Info)];
        assert_eq!(security_score(&findings), 100.0);
        assert_eq!(count_by_severity(&findings).info, 2);
    }
}
