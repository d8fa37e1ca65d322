//! Compliance evaluator report types.

use crate::taxonomy::{Framework, RiskLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static description of one compliance control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDefinition {
    /// Framework-qualified id (e.g. "NIST-AC-7").
    pub id: String,
    pub name: String,
    /// Control category (e.g. "access_control", "cryptography").
    pub category: String,
    pub framework: Framework,
    /// Requirement text the control checks.
    pub requirement: String,
    /// Minimum score for the control to count as compliant.
    pub threshold: f64,
}

/// Outcome of evaluating one control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlResult {
    /// Id of the control definition this result belongs to.
    pub control_id: String,
    /// The check executed without error.
    pub passed: bool,
    pub compliant: bool,
    /// 0-100 partial-credit score.
    pub score: f64,
    pub details: String,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
}

/// A non-compliant control, enriched with its definition's classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceFailure {
    pub control_id: String,
    pub name: String,
    pub framework: Framework,
    pub category: String,
    pub requirement: String,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub details: String,
    pub recommendations: Vec<String>,
}

impl ComplianceFailure {
    /// Build a failure view from a non-compliant result.
    pub fn from_result(definition: &ControlDefinition, result: &ControlResult) -> Option<Self> {
        if result.compliant {
            return None;
        }
        Some(Self {
            control_id: definition.id.clone(),
            name: definition.name.clone(),
            framework: definition.framework,
            category: definition.category.clone(),
            requirement: definition.requirement.clone(),
            score: result.score,
            risk_level: result.risk_level,
            details: result.details.clone(),
            recommendations: result.recommendations.clone(),
        })
    }
}

/// Per-framework aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkSummary {
    pub framework: Framework,
    pub total_controls: u32,
    pub passed_controls: u32,
    /// passed / total * 100.
    pub compliance_percentage: f64,
    pub average_score: f64,
}

/// Per-category aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total_controls: u32,
    /// Mean of member control scores.
    pub score: f64,
}

/// Output of the compliance control evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub generated_at: DateTime<Utc>,
    /// Version of the rule table the controls were evaluated with.
    pub ruleset_version: String,
    /// Root of the inspected configuration surface.
    pub source_root: String,
    pub files_inspected: u32,
    pub controls_evaluated: u32,
    /// Controls whose check errored.
    pub controls_failed: u32,
    /// Mean of all control scores.
    pub overall_score: f64,
    /// passed / total * 100.
    pub compliance_percentage: f64,
    pub risk_level: RiskLevel,
    pub frameworks: Vec<FrameworkSummary>,
    pub categories: Vec<CategorySummary>,
    pub failures: Vec<ComplianceFailure>,
    /// Every control result in evaluation order.
    pub results: Vec<ControlResult>,
}

impl ComplianceReport {
    /// Zero-credit report used when the whole phase could not run.
    pub fn unavailable(ruleset_version: &str, source_root: &str) -> Self {
        Self {
            generated_at: Utc::now(),
            ruleset_version: ruleset_version.to_string(),
            source_root: source_root.to_string(),
            files_inspected: 0,
            controls_evaluated: 0,
            controls_failed: 0,
            overall_score: 0.0,
            compliance_percentage: 0.0,
            risk_level: RiskLevel::High,
            frameworks: Vec::new(),
            categories: Vec::new(),
            failures: Vec::new(),
            results: Vec::new(),
        }
    }
}
