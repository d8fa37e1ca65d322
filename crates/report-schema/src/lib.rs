//! Report schema definitions for readyprobe.
//!
//! This crate defines the structure of assessment results: probe and
//! control outcomes, load metrics, and the composite report persisted once
//! per run.

pub mod control;
pub mod log;
pub mod metrics;
pub mod probe;
pub mod report;
pub mod schema;
pub mod taxonomy;
pub mod validation;

pub use control::{
    CategorySummary, ComplianceFailure, ComplianceReport, ControlDefinition, ControlResult,
    FrameworkSummary,
};
pub use log::ResultLog;
pub use metrics::{EndpointMetric, ResourceDelta};
pub use probe::{Finding, ProbeDefinition, ProbeResult, SeverityCounts, VulnerabilityReport};
pub use report::{
    CompositeReport, HistoryEntry, Phase, PhaseFailure, SubScores, REPORT_SCHEMA_VERSION,
};
pub use taxonomy::{Framework, ProbeCategory, ReadinessTier, RiskLevel, SecurityTier, Severity};
pub use validation::{validate_report, validate_report_json};
