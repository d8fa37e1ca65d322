//! Report validation utilities.

use crate::report::CompositeReport;
use crate::schema;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error type.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Score out of range for {field}: {value}")]
    ScoreOutOfRange { field: String, value: f64 },

    #[error("Inconsistent counts in {0}")]
    InconsistentCounts(String),

    #[error("Duplicate result for {0}")]
    DuplicateResult(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result of report validation.
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a serialized report against the JSON schema.
pub fn validate_report_json(report: &Value) -> Result<ValidationResult, ValidationError> {
    let mut result = ValidationResult::new();

    let schema_value = schema::report_schema();
    let compiled = JSONSchema::compile(&schema_value)
        .map_err(|e| ValidationError::SchemaError(e.to_string()))?;

    let validation = compiled.validate(report);
    if let Err(errors) = validation {
        for error in errors {
            result.add_error(ValidationError::SchemaError(format!(
                "{} at {}",
                error, error.instance_path
            )));
        }
    }

    Ok(result)
}

/// Validate a composite report: schema plus the invariants the schema
/// cannot express.
pub fn validate_report(report: &CompositeReport) -> Result<ValidationResult, ValidationError> {
    let report_json = serde_json::to_value(report)?;
    let mut result = validate_report_json(&report_json)?;

    let in_range = |v: f64| (0.0..=100.0).contains(&v);

    for (field, value) in [
        ("scores.performance", report.scores.performance),
        ("scores.security", report.scores.security),
        ("scores.compliance", report.scores.compliance),
    ] {
        if !in_range(value) {
            result.add_error(ValidationError::ScoreOutOfRange {
                field: field.to_string(),
                value,
            });
        }
    }

    for metric in &report.endpoint_metrics {
        if metric.success_count + metric.fail_count != metric.total_requests {
            result.add_error(ValidationError::InconsistentCounts(format!(
                "endpoint {}",
                metric.endpoint
            )));
        }
        if !in_range(metric.error_rate) {
            result.add_error(ValidationError::ScoreOutOfRange {
                field: format!("endpoint_metrics[{}].error_rate", metric.endpoint),
                value: metric.error_rate,
            });
        }
    }

    let vulns = &report.vulnerability_report;
    if vulns.severity_counts.total() as usize != vulns.findings.len() {
        result.add_error(ValidationError::InconsistentCounts(
            "vulnerability_report.severity_counts".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for probe in &vulns.results {
        if !seen.insert(probe.probe.as_str()) {
            result.add_error(ValidationError::DuplicateResult(probe.probe.clone()));
        }
    }

    let mut seen = HashSet::new();
    for control in &report.compliance_report.results {
        if !seen.insert(control.control_id.as_str()) {
            result.add_error(ValidationError::DuplicateResult(control.control_id.clone()));
        }
    }

    if !report.phase_failures.is_empty() {
        result.add_warning(format!(
            "{} phase(s) degraded to zero credit",
            report.phase_failures.len()
        ));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_report_json_missing_field() {
        let report = serde_json::json!({
            "schema_version": "1.0.0"
            // Missing required fields
        });

        let result = validate_report_json(&report).unwrap();
        assert!(!result.valid);
    }

    #[test]
    fn test_validate_report_json_rejects_unknown_tier() {
        let report = serde_json::json!({
            "schema_version": "1.0.0",
            "run_id": "run-20261019T120000.000Z-abcd1234",
            "target_address": "http://localhost:3000",
            "timestamp": "2026-10-19T12:00:00.000Z",
            "endpoint_metrics": [],
            "vulnerability_report": {
                "findings": [],
                "severity_counts": {},
                "security_score": 100,
                "tier": "excellent",
                "results": []
            },
            "compliance_report": {
                "ruleset_version": "2026.1",
                "overall_score": 100,
                "compliance_percentage": 100,
                "risk_level": "low",
                "results": []
            },
            "scores": { "performance": 100, "security": 100, "compliance": 100 },
            "overall_score": 100,
            "readiness_tier": "Production Ready",
            "recommendations": []
        });

        let result = validate_report_json(&report).unwrap();
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }
}
