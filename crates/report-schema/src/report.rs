//! Composite readiness report - the one artifact persisted per run.

use crate::control::ComplianceReport;
use crate::metrics::EndpointMetric;
use crate::probe::VulnerabilityReport;
use crate::taxonomy::ReadinessTier;
use chrono::{DateTime, Utc};
use readyprobe_common::{RunId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current report schema version.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// A test phase of a full assessment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    LoadTest,
    PenetrationTest,
    ComplianceTest,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::LoadTest => "load_test",
            Phase::PenetrationTest => "penetration_test",
            Phase::ComplianceTest => "compliance_test",
        };
        f.write_str(s)
    }
}

/// A phase that failed as a whole and was replaced by a zero-credit result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub error: String,
}

/// The three sub-scores feeding the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub performance: f64,
    pub security: f64,
    pub compliance: f64,
}

/// Full result of one assessment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeReport {
    pub schema_version: String,
    pub run_id: RunId,
    pub target_address: String,
    /// When the run started.
    pub timestamp: Timestamp,
    pub completed_at: DateTime<Utc>,
    pub endpoint_metrics: Vec<EndpointMetric>,
    pub vulnerability_report: VulnerabilityReport,
    pub compliance_report: ComplianceReport,
    pub scores: SubScores,
    /// Rounded 0-100 composite score.
    pub overall_score: u32,
    pub readiness_tier: ReadinessTier,
    pub recommendations: Vec<String>,
    pub phase_failures: Vec<PhaseFailure>,
}

/// One line of the append-only report history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub run_id: RunId,
    pub target_address: String,
    /// Artifact file name relative to the report directory.
    pub file: String,
    pub sha256: String,
    pub overall_score: u32,
    pub readiness_tier: ReadinessTier,
    pub written_at: DateTime<Utc>,
}
