//! JSON schema definitions for report validation.

/// JSON Schema for a persisted composite report.
pub const REPORT_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "$id": "https://readyprobe.dev/schemas/report.json",
  "title": "Readyprobe Composite Report",
  "type": "object",
  "required": [
    "schema_version", "run_id", "target_address", "timestamp",
    "endpoint_metrics", "vulnerability_report", "compliance_report",
    "scores", "overall_score", "readiness_tier", "recommendations"
  ],
  "properties": {
    "schema_version": {
      "type": "string",
      "pattern": "^\\d+\\.\\d+\\.\\d+$"
    },
    "run_id": {
      "type": "string",
      "pattern": "^run-"
    },
    "target_address": { "type": "string", "minLength": 1 },
    "timestamp": { "type": "string", "format": "date-time" },
    "completed_at": { "type": "string", "format": "date-time" },
    "endpoint_metrics": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["endpoint", "total_requests", "success_count", "fail_count", "error_rate"],
        "properties": {
          "endpoint": { "type": "string" },
          "total_requests": { "type": "integer", "minimum": 0 },
          "success_count": { "type": "integer", "minimum": 0 },
          "fail_count": { "type": "integer", "minimum": 0 },
          "avg_latency_ms": { "type": "number", "minimum": 0 },
          "requests_per_second": { "type": "number", "minimum": 0 },
          "error_rate": { "type": "number", "minimum": 0, "maximum": 100 }
        }
      }
    },
    "vulnerability_report": {
      "type": "object",
      "required": ["findings", "severity_counts", "security_score", "tier", "results"],
      "properties": {
        "security_score": { "type": "number", "minimum": 0, "maximum": 100 },
        "tier": { "type": "string", "enum": ["excellent", "good", "fair", "poor"] },
        "findings": {
          "type": "array",
          "items": {
            "type": "object",
            "required": ["test_name", "category", "severity", "description"],
            "properties": {
              "test_name": { "type": "string" },
              "category": {
                "type": "string",
                "enum": ["injection", "authentication", "authorization", "crypto", "configuration", "data_exposure"]
              },
              "severity": {
                "type": "string",
                "enum": ["critical", "high", "medium", "low", "info"]
              }
            }
          }
        }
      }
    },
    "compliance_report": {
      "type": "object",
      "required": ["ruleset_version", "overall_score", "compliance_percentage", "risk_level", "results"],
      "properties": {
        "overall_score": { "type": "number", "minimum": 0, "maximum": 100 },
        "compliance_percentage": { "type": "number", "minimum": 0, "maximum": 100 },
        "risk_level": { "type": "string", "enum": ["low", "medium", "high", "critical"] },
        "results": {
          "type": "array",
          "items": {
            "type": "object",
            "required": ["control_id", "compliant", "score", "risk_level"],
            "properties": {
              "control_id": { "type": "string" },
              "compliant": { "type": "boolean" },
              "score": { "type": "number", "minimum": 0, "maximum": 100 },
              "risk_level": { "type": "string", "enum": ["low", "medium", "high", "critical"] }
            }
          }
        }
      }
    },
    "scores": {
      "type": "object",
      "required": ["performance", "security", "compliance"],
      "properties": {
        "performance": { "type": "number", "minimum": 0, "maximum": 100 },
        "security": { "type": "number", "minimum": 0, "maximum": 100 },
        "compliance": { "type": "number", "minimum": 0, "maximum": 100 }
      }
    },
    "overall_score": { "type": "integer", "minimum": 0, "maximum": 100 },
    "readiness_tier": {
      "type": "string",
      "enum": ["Enterprise Ready", "Nearly Ready", "Needs Improvement", "Significant Issues"]
    },
    "recommendations": {
      "type": "array",
      "items": { "type": "string" }
    },
    "phase_failures": {
      "type": "array",
      "items": {
        "type": "object",
        "required": ["phase", "error"],
        "properties": {
          "phase": { "type": "string", "enum": ["load_test", "penetration_test", "compliance_test"] },
          "error": { "type": "string" }
        }
      }
    }
  }
}"#;

/// Get the report schema as a parsed JSON value.
pub fn report_schema() -> serde_json::Value {
    serde_json::from_str(REPORT_SCHEMA).expect("Invalid report schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_schema_parses() {
        let schema = report_schema();
        assert_eq!(schema["title"], "Readyprobe Composite Report");
    }
}
