//! Classification vocabularies shared by probes, controls and reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a security probe's finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Points deducted from the security score per confirmed finding.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 25.0,
            Severity::High => 15.0,
            Severity::Medium => 8.0,
            Severity::Low => 3.0,
            Severity::Info => 0.0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        };
        f.write_str(s)
    }
}

/// Category a security probe belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeCategory {
    Injection,
    Authentication,
    Authorization,
    Crypto,
    Configuration,
    DataExposure,
}

impl fmt::Display for ProbeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeCategory::Injection => "injection",
            ProbeCategory::Authentication => "authentication",
            ProbeCategory::Authorization => "authorization",
            ProbeCategory::Crypto => "crypto",
            ProbeCategory::Configuration => "configuration",
            ProbeCategory::DataExposure => "data_exposure",
        };
        f.write_str(s)
    }
}

/// Regulatory or industry framework a control is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "NIST")]
    Nist,
    #[serde(rename = "ISO27001")]
    Iso27001,
    #[serde(rename = "SOC2")]
    Soc2,
    #[serde(rename = "PCI_DSS")]
    PciDss,
    #[serde(rename = "GDPR")]
    Gdpr,
    #[serde(rename = "SOX")]
    Sox,
}

impl Framework {
    pub const ALL: [Framework; 6] = [
        Framework::Nist,
        Framework::Iso27001,
        Framework::Soc2,
        Framework::PciDss,
        Framework::Gdpr,
        Framework::Sox,
    ];
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Framework::Nist => "NIST",
            Framework::Iso27001 => "ISO27001",
            Framework::Soc2 => "SOC2",
            Framework::PciDss => "PCI_DSS",
            Framework::Gdpr => "GDPR",
            Framework::Sox => "SOX",
        };
        f.write_str(s)
    }
}

/// Risk attached to a control result or a whole compliance report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Risk of a single control given its score and verdict.
    pub fn for_control(score: f64, compliant: bool) -> Self {
        match (compliant, score) {
            (true, s) if s >= 90.0 => RiskLevel::Low,
            (true, _) => RiskLevel::Medium,
            (false, s) if s >= 40.0 => RiskLevel::High,
            (false, _) => RiskLevel::Critical,
        }
    }

    /// Overall risk of a compliance report given its mean score.
    pub fn for_overall(score: f64) -> Self {
        if score >= 90.0 {
            RiskLevel::Low
        } else if score >= 70.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Qualitative label for the security score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SecurityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            SecurityTier::Excellent
        } else if score >= 75.0 {
            SecurityTier::Good
        } else if score >= 60.0 {
            SecurityTier::Fair
        } else {
            SecurityTier::Poor
        }
    }
}

impl fmt::Display for SecurityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecurityTier::Excellent => "excellent",
            SecurityTier::Good => "good",
            SecurityTier::Fair => "fair",
            SecurityTier::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// Qualitative label for the composite readiness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessTier {
    #[serde(rename = "Enterprise Ready")]
    EnterpriseReady,
    #[serde(rename = "Nearly Ready")]
    NearlyReady,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    #[serde(rename = "Significant Issues")]
    SignificantIssues,
}

impl ReadinessTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ReadinessTier::EnterpriseReady
        } else if score >= 75.0 {
            ReadinessTier::NearlyReady
        } else if score >= 60.0 {
            ReadinessTier::NeedsImprovement
        } else {
            ReadinessTier::SignificantIssues
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadinessTier::EnterpriseReady => "Enterprise Ready",
            ReadinessTier::NearlyReady => "Nearly Ready",
            ReadinessTier::NeedsImprovement => "Needs Improvement",
            ReadinessTier::SignificantIssues => "Significant Issues",
        }
    }
}

impl fmt::Display for ReadinessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
