//! Vulnerability battery report types.

use crate::taxonomy::{ProbeCategory, SecurityTier, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static description of one security probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeDefinition {
    /// Unique probe name (e.g. "sql_injection").
    pub name: String,
    pub category: ProbeCategory,
    pub severity: Severity,
    /// What the probe looks for.
    pub description: String,
}

/// Outcome of running one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Name of the probe definition this result belongs to.
    pub probe: String,
    /// The probe executed without error.
    pub passed: bool,
    /// The probe confirmed a vulnerability.
    pub vulnerable: bool,
    pub details: String,
    pub evidence: Option<String>,
    pub recommendation: Option<String>,
    /// Wall-clock time spent in the probe.
    pub duration_ms: u64,
}

/// A confirmed vulnerability, enriched with its probe's classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub test_name: String,
    pub category: ProbeCategory,
    pub severity: Severity,
    pub description: String,
    pub evidence: Option<String>,
    pub recommendation: Option<String>,
}

impl Finding {
    /// Build a finding from a vulnerable result. Returns `None` for results
    /// that did not confirm a vulnerability.
    pub fn from_result(definition: &ProbeDefinition, result: &ProbeResult) -> Option<Self> {
        if !result.vulnerable {
            return None;
        }
        Some(Self {
            test_name: definition.name.clone(),
            category: definition.category,
            severity: definition.severity,
            description: format!("{}: {}", definition.description, result.details),
            evidence: result.evidence.clone(),
            recommendation: result.recommendation.clone(),
        })
    }
}

/// Number of findings per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub info: u32,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    pub fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// Output of the vulnerability probe battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub generated_at: DateTime<Utc>,
    /// Number of probes that ran (one result each).
    pub probes_executed: u32,
    /// Probes whose execution errored.
    pub probes_failed: u32,
    /// Confirmed findings in probe order.
    pub findings: Vec<Finding>,
    pub severity_counts: SeverityCounts,
    /// Bounded 0-100 security score.
    pub security_score: f64,
    pub tier: SecurityTier,
    /// Every probe result in execution order.
    pub results: Vec<ProbeResult>,
}

impl VulnerabilityReport {
    /// Zero-credit report used when the whole phase could not run.
    pub fn unavailable() -> Self {
        Self {
            generated_at: Utc::now(),
            probes_executed: 0,
            probes_failed: 0,
            findings: Vec::new(),
            severity_counts: SeverityCounts::default(),
            security_score: 0.0,
            tier: SecurityTier::Poor,
            results: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> ProbeDefinition {
        ProbeDefinition {
            name: "reflected_xss".to_string(),
            category: ProbeCategory::Injection,
            severity: Severity::High,
            description: "Reflected cross-site scripting".to_string(),
        }
    }

    #[test]
    fn test_finding_only_for_vulnerable_results() {
        let mut result = ProbeResult {
            probe: "reflected_xss".to_string(),
            passed: true,
            vulnerable: false,
            details: "payload escaped".to_string(),
            evidence: None,
            recommendation: None,
            duration_ms: 3,
        };
        assert!(Finding::from_result(&definition(), &result).is_none());

        result.vulnerable = true;
        result.details = "payload echoed".to_string();
        let finding = Finding::from_result(&definition(), &result).unwrap();
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.test_name, "reflected_xss");
        assert!(finding.description.ends_with("payload echoed"));
    }

    #[test]
    fn test_severity_counts() {
        let mut counts = SeverityCounts::default();
        counts.add(Severity::Critical);
        counts.add(Severity::Medium);
        counts.add(Severity::Medium);
        assert_eq!(counts.get(Severity::Medium), 2);
        assert_eq!(counts.total(), 3);
    }
}
