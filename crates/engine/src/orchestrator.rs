//! Orchestrator: drives the three phases of a run, aggregates and persists.
//!
//! A run moves linearly through [`RunState`]. A phase that fails as a whole
//! is replaced by its zero-credit result and recorded in the report, so a
//! full-suite run always ends with a complete report.

use crate::aggregate::{assemble, RunContext};
use crate::client::{HttpProbeClient, ProbeClient};
use crate::compliance::{
    builtin_controls, ComplianceCheck, ComplianceEvaluator, SourceInspector, RULESET_VERSION,
};
use crate::config::SuiteConfig;
use crate::load::LoadTestEngine;
use crate::store::ReportStore;
use crate::stress::{run_stress_profile, StressReport};
use crate::vuln::{builtin_catalog, SecurityProbe, VulnerabilityBattery};
use readyprobe_common::{Error, Result, RunId, Timestamp};
use readyprobe_report_schema::{
    ComplianceReport, CompositeReport, EndpointMetric, Phase, PhaseFailure, VulnerabilityReport,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Position of a run in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    LoadTest,
    PenetrationTest,
    ComplianceTest,
    Aggregate,
    Persisted,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::LoadTest => "load_test",
            RunState::PenetrationTest => "penetration_test",
            RunState::ComplianceTest => "compliance_test",
            RunState::Aggregate => "aggregate",
            RunState::Persisted => "persisted",
            RunState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Terminal status of a full-suite run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Persisted { path: PathBuf },
    /// The report could not be written; it is still returned in memory.
    PersistFailed { error: String },
}

/// What a full-suite run hands back.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: CompositeReport,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self.status, RunStatus::Persisted { .. })
    }
}

/// Runs assessments against one target.
pub struct Orchestrator {
    config: SuiteConfig,
    client: Arc<dyn ProbeClient>,
    probes: Vec<Box<dyn SecurityProbe>>,
    checks: Arc<Vec<Box<dyn ComplianceCheck>>>,
    state: RunState,
}

impl Orchestrator {
    /// Build an orchestrator with the HTTP client and the built-in catalogs.
    pub fn new(config: SuiteConfig) -> Result<Self> {
        let client = HttpProbeClient::new(&config.target, config.request_timeout())?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Build an orchestrator around an existing client.
    pub fn with_client(config: SuiteConfig, client: Arc<dyn ProbeClient>) -> Self {
        let probes = builtin_catalog(&config.probes);
        Self {
            config,
            client,
            probes,
            checks: Arc::new(builtin_controls()),
            state: RunState::Idle,
        }
    }

    /// Replace the probe catalog.
    pub fn with_probes(mut self, probes: Vec<Box<dyn SecurityProbe>>) -> Self {
        self.probes = probes;
        self
    }

    /// Replace the control catalog.
    pub fn with_checks(mut self, checks: Vec<Box<dyn ComplianceCheck>>) -> Self {
        self.checks = Arc::new(checks);
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!("Run state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run load, penetration and compliance phases, aggregate and persist.
    pub async fn run_full_suite(&mut self) -> RunOutcome {
        self.state = RunState::Idle;
        let started_at = Timestamp::now();
        let run = RunContext {
            run_id: RunId::new(started_at),
            target_address: self.client.base_url().to_string(),
            started_at,
        };
        info!("Starting run {} against {}", run.run_id, run.target_address);
        let mut phase_failures = Vec::new();

        self.transition(RunState::LoadTest);
        let metrics = match self.load_phase().await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("Load phase failed, scoring it as unavailable: {}", e);
                phase_failures.push(PhaseFailure {
                    phase: Phase::LoadTest,
                    error: e.to_string(),
                });
                self.config
                    .load
                    .endpoints
                    .iter()
                    .map(|endpoint| EndpointMetric::unavailable(endpoint))
                    .collect()
            }
        };

        self.transition(RunState::PenetrationTest);
        let vulnerability = match self.penetration_phase().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Penetration phase failed, scoring it as unavailable: {}", e);
                phase_failures.push(PhaseFailure {
                    phase: Phase::PenetrationTest,
                    error: e.to_string(),
                });
                VulnerabilityReport::unavailable()
            }
        };

        self.transition(RunState::ComplianceTest);
        let compliance = match self.compliance_phase().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Compliance phase failed, scoring it as unavailable: {}", e);
                phase_failures.push(PhaseFailure {
                    phase: Phase::ComplianceTest,
                    error: e.to_string(),
                });
                ComplianceReport::unavailable(
                    RULESET_VERSION,
                    &self.config.compliance.source_root.display().to_string(),
                )
            }
        };

        self.transition(RunState::Aggregate);
        let report = assemble(run, metrics, vulnerability, compliance, phase_failures);
        info!(
            "Run {} scored {} ({})",
            report.run_id, report.overall_score, report.readiness_tier
        );

        let status = match ReportStore::open(&self.config.reports_dir)
            .and_then(|store| store.persist(&report))
        {
            Ok(path) => {
                self.transition(RunState::Persisted);
                RunStatus::Persisted { path }
            }
            Err(e) => {
                error!("Failed to persist report {}: {}", report.run_id, e);
                RunStatus::PersistFailed {
                    error: e.to_string(),
                }
            }
        };

        self.transition(RunState::Done);
        RunOutcome { report, status }
    }

    async fn load_phase(&self) -> Result<Vec<EndpointMetric>> {
        LoadTestEngine::new(Arc::clone(&self.client), self.config.load.clone())
            .run()
            .await
    }

    async fn penetration_phase(&self) -> Result<VulnerabilityReport> {
        VulnerabilityBattery::new(
            self.client.as_ref(),
            &self.probes,
            self.config.probe_timeout(),
            self.config.failure_policy,
        )
        .run()
        .await
    }

    /// File reads are synchronous, so the phase runs on the blocking pool.
    async fn compliance_phase(&self) -> Result<ComplianceReport> {
        let checks = Arc::clone(&self.checks);
        let inspector = SourceInspector::new(self.config.compliance.clone());
        tokio::task::spawn_blocking(move || {
            let corpus = inspector.load()?;
            ComplianceEvaluator::new(&checks).evaluate(&corpus)
        })
        .await
        .map_err(|e| Error::Other(format!("compliance task failed: {}", e)))?
    }

    /// Repeat the load phase at escalating concurrency tiers.
    pub async fn run_stress_profile(&self) -> Result<StressReport> {
        run_stress_profile(
            Arc::clone(&self.client),
            &self.config.load,
            &self.config.stress,
        )
        .await
    }
}
