//! Suite configuration, loaded from YAML.

use crate::compliance::InspectorConfig;
use crate::load::LoadConfig;
use crate::stress::StressProfile;
use crate::vuln::{ExecutionFailurePolicy, ProbeTargets};
use readyprobe_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a run needs besides the catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Base URL of the service under test.
    pub target: String,
    /// Per-call timeout of the probe client.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Upper bound on a single security probe, all of its calls included.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    pub load: LoadConfig,
    pub probes: ProbeTargets,
    pub compliance: InspectorConfig,
    /// Directory receiving report artifacts and the history index.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    pub failure_policy: ExecutionFailurePolicy,
    pub stress: StressProfile,
}

/// Upper bound on virtual users per endpoint, per stress tier included.
pub const MAX_CONCURRENCY: u32 = 10_000;

fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_probe_timeout_ms() -> u64 {
    60_000
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            target: "http://localhost:3000".to_string(),
            request_timeout_ms: default_request_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            load: LoadConfig::default(),
            probes: ProbeTargets::default(),
            compliance: InspectorConfig::default(),
            reports_dir: default_reports_dir(),
            failure_policy: ExecutionFailurePolicy::default(),
            stress: StressProfile::default(),
        }
    }
}

impl SuiteConfig {
    /// Load from a YAML (or JSON) file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Check the settings a run depends on. All problems are reported at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !(self.target.starts_with("http://") || self.target.starts_with("https://")) {
            errors.push(format!("target must be an http(s) URL, got '{}'", self.target));
        }
        if self.request_timeout_ms == 0 {
            errors.push("request_timeout_ms must be positive".to_string());
        }
        if self.probe_timeout_ms < self.request_timeout_ms {
            errors.push("probe_timeout_ms must be at least request_timeout_ms".to_string());
        }
        if self.load.endpoints.is_empty() {
            errors.push("load.endpoints must not be empty".to_string());
        }
        for endpoint in &self.load.endpoints {
            if !endpoint.starts_with('/') {
                errors.push(format!("endpoint '{}' must start with '/'", endpoint));
            }
        }
        if self.load.concurrency > MAX_CONCURRENCY {
            errors.push(format!(
                "load.concurrency must be at most {}, got {}",
                MAX_CONCURRENCY, self.load.concurrency
            ));
        }
        if self.load.duration_ms == 0 && self.load.requests_per_user > 0 {
            errors.push("load.duration_ms must be positive to bound the test window".to_string());
        }
        if self.compliance.extensions.is_empty() {
            errors.push("compliance.extensions must not be empty".to_string());
        }
        if self.stress.tiers.is_empty() {
            errors.push("stress.tiers must not be empty".to_string());
        }
        if let Some(&tier) = self.stress.tiers.iter().find(|&&t| t > MAX_CONCURRENCY) {
            errors.push(format!(
                "stress tier {} exceeds the {} virtual user limit",
                tier, MAX_CONCURRENCY
            ));
        }
        if !(0.0..=100.0).contains(&self.stress.error_rate_threshold) {
            errors.push("stress.error_rate_threshold must be within 0-100".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_yaml_takes_defaults() {
        let config = SuiteConfig::from_yaml(
            r#"
target: https://staging.example.com
load:
  endpoints: ["/", "/api/products"]
  concurrency: 25
failure_policy: fail_closed
compliance:
  source_root: ./app
"#,
        )
        .unwrap();

        assert_eq!(config.target, "https://staging.example.com");
        assert_eq!(config.load.concurrency, 25);
        assert_eq!(config.load.requests_per_user, 10);
        assert_eq!(config.failure_policy, ExecutionFailurePolicy::FailClosed);
        assert_eq!(config.compliance.source_root, PathBuf::from("./app"));
        assert!(!config.compliance.extensions.is_empty());
        assert_eq!(config.request_timeout_ms, 5_000);
        assert_eq!(config.stress.tiers, vec![10, 50, 100, 200, 500]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(SuiteConfig::from_yaml("{}").unwrap(), SuiteConfig::default());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut config = SuiteConfig {
            target: "localhost:3000".to_string(),
            ..SuiteConfig::default()
        };
        config.load.endpoints = vec!["api".to_string()];
        config.stress.tiers.clear();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("http(s) URL"));
        assert!(message.contains("must start with '/'"));
        assert!(message.contains("stress.tiers"));
    }

    #[test]
    fn test_load_size_is_bounded() {
        let mut config = SuiteConfig::default();
        config.load.concurrency = u32::MAX;
        config.load.requests_per_user = u32::MAX;
        config.load.duration_ms = 0;
        config.stress.tiers = vec![10, 20_000];

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("load.concurrency must be at most 10000"));
        assert!(message.contains("load.duration_ms must be positive"));
        assert!(message.contains("stress tier 20000"));

        config.load.concurrency = MAX_CONCURRENCY;
        config.load.duration_ms = 1_000;
        config.stress.tiers = vec![10];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(SuiteConfig::from_yaml("failure_policy: maybe").is_err());
    }
}
