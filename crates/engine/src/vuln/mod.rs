//! Vulnerability probe battery.
//!
//! Probes run one after another against the target. Each one appends exactly
//! one result to the battery's result log; a probe that errors or overruns its
//! timeout is recorded according to the [`ExecutionFailurePolicy`] and never
//! stops the battery.

pub mod catalog;
pub mod checks;
pub mod scoring;

use crate::client::ProbeClient;
use async_trait::async_trait;
use chrono::Utc;
use readyprobe_common::{Error, Result};
use readyprobe_report_schema::{
    Finding, ProbeDefinition, ProbeResult, ResultLog, VulnerabilityReport,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub use catalog::{builtin_catalog, BuiltinProbe, ProbeKind};

/// Maximum length of an evidence excerpt stored in a report.
pub const MAX_EVIDENCE_CHARS: usize = 512;

/// How a probe or control that failed to execute is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionFailurePolicy {
    /// An errored probe counts as "no evidence of vulnerability".
    #[default]
    FailOpen,
    /// An errored probe counts as a finding of the probe's own severity.
    FailClosed,
}

/// Paths and parameters the built-in probes aim at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeTargets {
    /// Endpoint that reflects a query parameter (search-like).
    pub search_path: String,
    pub search_param: String,
    /// Credential login endpoint accepting a JSON body.
    pub login_path: String,
    /// Endpoint that must require administrator authorization.
    pub admin_path: String,
    /// Endpoint returning a single user-owned record.
    pub resource_path: String,
    /// Endpoint that serves files by name.
    pub file_path: String,
    pub file_param: String,
    /// Failed logins attempted by the brute-force probe.
    pub brute_force_attempts: u32,
}

impl Default for ProbeTargets {
    fn default() -> Self {
        Self {
            search_path: "/api/search".to_string(),
            search_param: "q".to_string(),
            login_path: "/api/auth/login".to_string(),
            admin_path: "/api/admin/users".to_string(),
            resource_path: "/api/users/1".to_string(),
            file_path: "/api/files".to_string(),
            file_param: "path".to_string(),
            brute_force_attempts: 10,
        }
    }
}

/// What a probe concluded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub vulnerable: bool,
    pub details: String,
    pub evidence: Option<String>,
    pub recommendation: Option<String>,
}

impl ProbeOutcome {
    /// The probe's signal was not observed.
    pub fn secure(details: impl Into<String>) -> Self {
        Self {
            vulnerable: false,
            details: details.into(),
            evidence: None,
            recommendation: None,
        }
    }

    /// The probe's signal was observed.
    pub fn vulnerable(
        details: impl Into<String>,
        evidence: impl AsRef<str>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            vulnerable: true,
            details: details.into(),
            evidence: Some(excerpt(evidence.as_ref())),
            recommendation: Some(recommendation.into()),
        }
    }

    /// The target never answered, so there is nothing to judge.
    pub fn unreachable() -> Self {
        Self::secure("target unreachable; no evidence of vulnerability")
    }
}

/// Truncate evidence to [`MAX_EVIDENCE_CHARS`] on a char boundary.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(MAX_EVIDENCE_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// A single security probe.
#[async_trait]
pub trait SecurityProbe: Send + Sync {
    fn definition(&self) -> &ProbeDefinition;

    /// Run the probe. `Err` means the probe could not execute, not that the
    /// target is vulnerable.
    async fn run(&self, client: &dyn ProbeClient) -> Result<ProbeOutcome>;
}

/// Runs a catalog of probes and scores the findings.
pub struct VulnerabilityBattery<'a> {
    client: &'a dyn ProbeClient,
    probes: &'a [Box<dyn SecurityProbe>],
    probe_timeout: Duration,
    policy: ExecutionFailurePolicy,
}

impl<'a> VulnerabilityBattery<'a> {
    pub fn new(
        client: &'a dyn ProbeClient,
        probes: &'a [Box<dyn SecurityProbe>],
        probe_timeout: Duration,
        policy: ExecutionFailurePolicy,
    ) -> Self {
        Self {
            client,
            probes,
            probe_timeout,
            policy,
        }
    }

    /// Run every probe in catalog order.
    pub async fn run(&self) -> Result<VulnerabilityReport> {
        if self.probes.is_empty() {
            return Err(Error::Config("probe catalog is empty".to_string()));
        }
        info!(
            "Running {} security probes against {}",
            self.probes.len(),
            self.client.base_url()
        );

        let mut log = ResultLog::with_capacity(self.probes.len());
        let mut findings = Vec::new();
        let mut failed = 0u32;

        for probe in self.probes {
            let definition = probe.definition();
            if log.contains(&definition.name) {
                warn!("Duplicate probe name {} ignored", definition.name);
                continue;
            }
            let start = Instant::now();
            let outcome = match tokio::time::timeout(self.probe_timeout, probe.run(self.client)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::Timeout {
                    operation: format!("probe {}", definition.name),
                    millis: self.probe_timeout.as_millis() as u64,
                }),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(outcome) => {
                    debug!(
                        "Probe {}: {}",
                        definition.name,
                        if outcome.vulnerable { "VULNERABLE" } else { "ok" }
                    );
                    ProbeResult {
                        probe: definition.name.clone(),
                        passed: true,
                        vulnerable: outcome.vulnerable,
                        details: outcome.details,
                        evidence: outcome.evidence,
                        recommendation: outcome.recommendation,
                        duration_ms,
                    }
                }
                Err(e) => {
                    warn!("Probe {} failed to execute: {}", definition.name, e);
                    self.execution_failure(definition, &e, duration_ms)
                }
            };

            let finding = Finding::from_result(definition, &result);
            let executed = result.passed;
            if !log.append(definition.name.clone(), result) {
                continue;
            }
            if !executed {
                failed += 1;
            }
            findings.extend(finding);
        }

        let security_score = scoring::security_score(&findings);
        let report = VulnerabilityReport {
            generated_at: Utc::now(),
            probes_executed: log.len() as u32,
            probes_failed: failed,
            severity_counts: scoring::count_by_severity(&findings),
            security_score,
            tier: scoring::security_tier(security_score),
            findings,
            results: log.into_results(),
        };

        info!(
            "Security score {:.0} ({}), {} finding(s)",
            report.security_score,
            report.tier,
            report.findings.len()
        );
        Ok(report)
    }

    fn execution_failure(
        &self,
        definition: &ProbeDefinition,
        error: &Error,
        duration_ms: u64,
    ) -> ProbeResult {
        let details = format!("execution failed: {}", error);
        match self.policy {
            ExecutionFailurePolicy::FailOpen => ProbeResult {
                probe: definition.name.clone(),
                passed: false,
                vulnerable: false,
                details,
                evidence: None,
                recommendation: None,
                duration_ms,
            },
            ExecutionFailurePolicy::FailClosed => ProbeResult {
                probe: definition.name.clone(),
                passed: false,
                vulnerable: true,
                details,
                evidence: None,
                recommendation: Some(format!(
                    "Investigate why the {} probe could not run and re-test",
                    definition.name
                )),
                duration_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Exchange, ProbeRequest};
    use readyprobe_report_schema::{ProbeCategory, Severity};

    struct NullClient;

    #[async_trait]
    impl ProbeClient for NullClient {
        async fn send(&self, _request: &ProbeRequest) -> Exchange {
            unreachable!("scripted probes never call the client")
        }

        fn base_url(&self) -> &str {
            "http://null"
        }
    }

    enum Behaviour {
        Vulnerable,
        Secure,
        Errors,
        Hangs,
    }

    struct ScriptedProbe {
        definition: ProbeDefinition,
        behaviour: Behaviour,
    }

    impl ScriptedProbe {
        fn boxed(name: &str, severity: Severity, behaviour: Behaviour) -> Box<dyn SecurityProbe> {
            Box::new(Self {
                definition: ProbeDefinition {
                    name: name.to_string(),
                    category: ProbeCategory::Injection,
                    severity,
                    description: format!("{} probe", name),
                },
                behaviour,
            })
        }
    }

    #[async_trait]
    impl SecurityProbe for ScriptedProbe {
        fn definition(&self) -> &ProbeDefinition {
            &self.definition
        }

        async fn run(&self, _client: &dyn ProbeClient) -> Result<ProbeOutcome> {
            match self.behaviour {
                Behaviour::Vulnerable => Ok(ProbeOutcome::vulnerable(
                    "signal observed",
                    "evidence",
                    "fix it",
                )),
                Behaviour::Secure => Ok(ProbeOutcome::secure("signal absent")),
                Behaviour::Errors => Err(Error::ProbeExecution {
                    probe: self.definition.name.clone(),
                    reason: "boom".to_string(),
                }),
                Behaviour::Hangs => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(ProbeOutcome::secure("late"))
                }
            }
        }
    }

    fn battery<'a>(
        probes: &'a [Box<dyn SecurityProbe>],
        policy: ExecutionFailurePolicy,
    ) -> VulnerabilityBattery<'a> {
        VulnerabilityBattery::new(&NullClient, probes, Duration::from_millis(100), policy)
    }

    #[tokio::test]
    async fn test_findings_and_score() {
        let probes = vec![
            ScriptedProbe::boxed("critical_one", Severity::Critical, Behaviour::Vulnerable),
            ScriptedProbe::boxed("clean", Severity::High, Behaviour::Secure),
            ScriptedProbe::boxed("medium_one", Severity::Medium, Behaviour::Vulnerable),
        ];

        let report = battery(&probes, ExecutionFailurePolicy::FailOpen)
            .run()
            .await
            .unwrap();
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].test_name, "critical_one");
        assert_eq!(report.findings[1].test_name, "medium_one");
        assert_eq!(report.security_score, 67.0);
        assert_eq!(report.severity_counts.critical, 1);
        assert_eq!(report.severity_counts.medium, 1);
    }

    #[tokio::test]
    async fn test_erroring_probes_fail_open() {
        let probes = vec![
            ScriptedProbe::boxed("a", Severity::Critical, Behaviour::Errors),
            ScriptedProbe::boxed("b", Severity::High, Behaviour::Errors),
            ScriptedProbe::boxed("c", Severity::Low, Behaviour::Errors),
        ];

        let report = battery(&probes, ExecutionFailurePolicy::FailOpen)
            .run()
            .await
            .unwrap();
        assert_eq!(report.results.len(), 3);
        assert!(report.results.iter().all(|r| !r.vulnerable && !r.passed));
        assert!(report.results[0].details.starts_with("execution failed"));
        assert_eq!(report.probes_failed, 3);
        assert_eq!(report.security_score, 100.0);
    }

    #[tokio::test]
    async fn test_duplicate_erroring_name_counted_once() {
        let probes = vec![
            ScriptedProbe::boxed("twice", Severity::High, Behaviour::Errors),
            ScriptedProbe::boxed("twice", Severity::High, Behaviour::Errors),
        ];

        let report = battery(&probes, ExecutionFailurePolicy::FailOpen)
            .run()
            .await
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.probes_executed, 1);
        assert_eq!(report.probes_failed, 1);
    }

    #[tokio::test]
    async fn test_erroring_probes_fail_closed() {
        let probes = vec![
            ScriptedProbe::boxed("a", Severity::Critical, Behaviour::Errors),
            ScriptedProbe::boxed("b", Severity::Low, Behaviour::Secure),
        ];

        let report = battery(&probes, ExecutionFailurePolicy::FailClosed)
            .run()
            .await
            .unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.security_score, 75.0);
    }

    #[tokio::test]
    async fn test_hanging_probe_times_out_and_battery_continues() {
        let probes = vec![
            ScriptedProbe::boxed("slow", Severity::High, Behaviour::Hangs),
            ScriptedProbe::boxed("after", Severity::High, Behaviour::Vulnerable),
        ];

        let report = battery(&probes, ExecutionFailurePolicy::FailOpen)
            .run()
            .await
            .unwrap();
        assert_eq!(report.results.len(), 2);
        assert!(report.results[0].details.contains("Timed out"));
        assert!(report.results[1].vulnerable);
        assert_eq!(report.security_score, 85.0);
    }

    #[tokio::test]
    async fn test_empty_catalog_is_a_phase_error() {
        let probes: Vec<Box<dyn SecurityProbe>> = Vec::new();
        assert!(battery(&probes, ExecutionFailurePolicy::FailOpen)
            .run()
            .await
            .is_err());
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(MAX_EVIDENCE_CHARS + 10);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), MAX_EVIDENCE_CHARS + 3);
        assert_eq!(excerpt("short"), "short");
    }
}
