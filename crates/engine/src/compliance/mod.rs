//! Compliance control evaluator.
//!
//! Controls inspect the target's source tree read-only. Each control is
//! evaluated independently; one that errors is recorded with zero credit and
//! critical risk without affecting the others.

pub mod inspector;
pub mod rules;

use chrono::Utc;
use readyprobe_common::score::{clamp_score, mean, percentage};
use readyprobe_common::{Error, Result};
use readyprobe_report_schema::{
    CategorySummary, ComplianceFailure, ComplianceReport, ControlDefinition, ControlResult,
    Framework, FrameworkSummary, ResultLog, RiskLevel,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub use inspector::{InspectorConfig, SourceCorpus, SourceInspector};
pub use rules::{ControlSpec, RULESET_VERSION};

/// Score and explanation produced by one control.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlEvaluation {
    pub score: f64,
    pub details: String,
    pub recommendations: Vec<String>,
}

/// A single compliance control.
pub trait ComplianceCheck: Send + Sync {
    fn definition(&self) -> &ControlDefinition;

    /// Evaluate against `corpus`. `Err` means the check could not run.
    fn evaluate(&self, corpus: &SourceCorpus) -> Result<ControlEvaluation>;
}

/// A control backed by a row of the rule table.
pub struct RuleControl {
    spec: &'static ControlSpec,
    definition: ControlDefinition,
}

impl RuleControl {
    pub fn new(spec: &'static ControlSpec) -> Self {
        Self {
            spec,
            definition: spec.definition(),
        }
    }
}

impl ComplianceCheck for RuleControl {
    fn definition(&self) -> &ControlDefinition {
        &self.definition
    }

    fn evaluate(&self, corpus: &SourceCorpus) -> Result<ControlEvaluation> {
        let mut score = 0u32;
        let mut met = Vec::new();
        let mut recommendations = Vec::new();

        for (signal, weight) in self.spec.rules {
            let hit = rules::evaluate_signal(signal, corpus)?;
            debug!(
                "{} / {}: met={} at {:?}",
                self.spec.id, signal.id, hit.met, hit.location
            );
            if hit.met {
                score += weight;
                met.push(signal.description);
            } else {
                recommendations.push(match hit.location {
                    Some(location) => format!("{} (see {})", signal.remediation, location),
                    None => signal.remediation.to_string(),
                });
            }
        }

        let details = if met.is_empty() {
            format!("0/{} signals met", self.spec.rules.len())
        } else {
            format!(
                "{}/{} signals met: {}",
                met.len(),
                self.spec.rules.len(),
                met.join("; ")
            )
        };
        Ok(ControlEvaluation {
            score: clamp_score(score as f64),
            details,
            recommendations,
        })
    }
}

/// Every control in the rule table.
pub fn builtin_controls() -> Vec<Box<dyn ComplianceCheck>> {
    rules::CONTROLS
        .iter()
        .map(|spec| Box::new(RuleControl::new(spec)) as Box<dyn ComplianceCheck>)
        .collect()
}

/// Runs a set of controls and aggregates their results.
pub struct ComplianceEvaluator<'a> {
    checks: &'a [Box<dyn ComplianceCheck>],
}

impl<'a> ComplianceEvaluator<'a> {
    pub fn new(checks: &'a [Box<dyn ComplianceCheck>]) -> Self {
        Self { checks }
    }

    /// Evaluate every control against `corpus`, in order.
    pub fn evaluate(&self, corpus: &SourceCorpus) -> Result<ComplianceReport> {
        if self.checks.is_empty() {
            return Err(Error::Config("control catalog is empty".to_string()));
        }
        info!(
            "Evaluating {} compliance controls over {} files",
            self.checks.len(),
            corpus.len()
        );

        let mut log = ResultLog::with_capacity(self.checks.len());
        let mut failures = Vec::new();
        let mut errored = 0u32;

        for check in self.checks {
            let definition = check.definition();
            if log.contains(&definition.id) {
                warn!("Duplicate control id {} ignored", definition.id);
                continue;
            }
            let result = match check.evaluate(corpus) {
                Ok(evaluation) => {
                    let compliant = evaluation.score >= definition.threshold;
                    ControlResult {
                        control_id: definition.id.clone(),
                        passed: true,
                        compliant,
                        score: evaluation.score,
                        details: evaluation.details,
                        recommendations: evaluation.recommendations,
                        risk_level: RiskLevel::for_control(evaluation.score, compliant),
                    }
                }
                Err(e) => {
                    warn!("Control {} failed to execute: {}", definition.id, e);
                    ControlResult {
                        control_id: definition.id.clone(),
                        passed: false,
                        compliant: false,
                        score: 0.0,
                        details: format!("execution failed: {}", e),
                        recommendations: vec![format!(
                            "Investigate why control {} could not be evaluated",
                            definition.id
                        )],
                        risk_level: RiskLevel::Critical,
                    }
                }
            };

            let failure = ComplianceFailure::from_result(definition, &result);
            let executed = result.passed;
            if !log.append(definition.id.clone(), result) {
                continue;
            }
            if !executed {
                errored += 1;
            }
            failures.extend(failure);
        }

        let results = log.into_results();
        let definitions: Vec<&ControlDefinition> =
            self.checks.iter().map(|c| c.definition()).collect();
        let overall_score = clamp_score(mean(results.iter().map(|r| r.score)));
        let passed = results.iter().filter(|r| r.compliant).count() as u64;

        let report = ComplianceReport {
            generated_at: Utc::now(),
            ruleset_version: RULESET_VERSION.to_string(),
            source_root: corpus.root().display().to_string(),
            files_inspected: corpus.len() as u32,
            controls_evaluated: results.len() as u32,
            controls_failed: errored,
            overall_score,
            compliance_percentage: percentage(passed, results.len() as u64),
            risk_level: RiskLevel::for_overall(overall_score),
            frameworks: framework_summaries(&definitions, &results),
            categories: category_summaries(&definitions, &results),
            failures,
            results,
        };

        info!(
            "Compliance score {:.1} ({:.0}% of controls passed), risk {}",
            report.overall_score, report.compliance_percentage, report.risk_level
        );
        Ok(report)
    }
}

/// Pair each result with its definition by id.
fn paired<'r>(
    definitions: &[&'r ControlDefinition],
    results: &'r [ControlResult],
) -> Vec<(&'r ControlDefinition, &'r ControlResult)> {
    results
        .iter()
        .filter_map(|result| {
            definitions
                .iter()
                .find(|d| d.id == result.control_id)
                .map(|d| (*d, result))
        })
        .collect()
}

pub fn framework_summaries(
    definitions: &[&ControlDefinition],
    results: &[ControlResult],
) -> Vec<FrameworkSummary> {
    let mut grouped: BTreeMap<Framework, Vec<&ControlResult>> = BTreeMap::new();
    for (definition, result) in paired(definitions, results) {
        grouped.entry(definition.framework).or_default().push(result);
    }

    grouped
        .into_iter()
        .map(|(framework, members)| {
            let passed = members.iter().filter(|r| r.compliant).count() as u64;
            FrameworkSummary {
                framework,
                total_controls: members.len() as u32,
                passed_controls: passed as u32,
                compliance_percentage: percentage(passed, members.len() as u64),
                average_score: mean(members.iter().map(|r| r.score)),
            }
        })
        .collect()
}

pub fn category_summaries(
    definitions: &[&ControlDefinition],
    results: &[ControlResult],
) -> Vec<CategorySummary> {
    let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (definition, result) in paired(definitions, results) {
        grouped
            .entry(definition.category.as_str())
            .or_default()
            .push(result.score);
    }

    grouped
        .into_iter()
        .map(|(category, scores)| CategorySummary {
            category: category.to_string(),
            total_controls: scores.len() as u32,
            score: mean(scores),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixture {
    //! A source tree that satisfies every built-in control.

    use std::fs;
    use std::path::Path;

    const FILES: &[(&str, &str)] = &[
        (
            "src/auth.js",
            r#"const bcrypt = require('bcrypt');
const rateLimit = require('express-rate-limit');
const { authenticator } = require('otplib'); // totp second factor
const MAX_LOGIN_ATTEMPTS = 5; // account lockout threshold
function requireRole(role) { return (req, res, next) => next(); }
const SESSION_TIMEOUT = 15 * 60;
const jwtSecret = process.env.JWT_SECRET;
module.exports = { expiresIn: '15m' };
"#,
        ),
        (
            "src/audit.js",
            r#"const winston = require('winston');
const auditLog = winston.createLogger({ level: 'info' });
function redactEmail(email) { return email.replace(/.+@/, '***@'); }
module.exports = { auditLog, redactEmail };
"#,
        ),
        (
            "src/server.js",
            r#"const helmet = require('helmet');
const https = require('https');
const Sentry = require('@sentry/node');
app.use(helmet());
app.get('/healthz', (req, res) => res.send('ok'));
const allowedOrigins = ['https://app.example.com'];
const server = https.createServer({ minVersion: 'TLSv1.2' }, app);
app.use(errorHandler);
"#,
        ),
        (
            "src/db.js",
            r#"const { PrismaClient } = require('@prisma/client');
const { z } = require('zod');
const userSchema = z.object({ email: z.string().email() });
// field-level encryption with aes-256-gcm, keys held in KMS
async function nightlyBackup() { /* pg_dump to object storage */ }
const RETENTION_DAYS = 365;
"#,
        ),
        (
            "src/privacy.js",
            r#"// Privacy policy: /legal/privacy
function recordConsent(userId) {}
async function deleteAccount(userId) {}
async function exportUserData(userId) {}
const stripe = require('stripe')(process.env.STRIPE_KEY);
"#,
        ),
        (
            "test/auth.test.js",
            "describe('auth', () => { it('hashes', () => {}); });\n",
        ),
        ("package-lock.json", "{\"lockfileVersion\": 3}\n"),
        (".github/dependabot.yml", "version: 2\n"),
        (".github/workflows/ci.yml", "on: [push]\n"),
        ("CODEOWNERS", "* @platform-team\n"),
        ("CHANGELOG.md", "# Changelog\n"),
        ("SECURITY.md", "Report vulnerabilities to security@example.com\n"),
        (".env.example", "JWT_SECRET=\n"),
        (".gitignore", "node_modules\n.env\n"),
        ("Dockerfile", "FROM node:20-alpine\nUSER node\nCMD [\"node\", \"src/server.js\"]\n"),
    ];

    pub fn write_compliant_tree(root: &Path) {
        for (path, content) in FILES {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct BrokenCheck(ControlDefinition);

    impl ComplianceCheck for BrokenCheck {
        fn definition(&self) -> &ControlDefinition {
            &self.0
        }

        fn evaluate(&self, _corpus: &SourceCorpus) -> Result<ControlEvaluation> {
            Err(Error::ControlExecution {
                control: self.0.id.clone(),
                reason: "unreadable".to_string(),
            })
        }
    }

    fn load(root: &std::path::Path) -> SourceCorpus {
        SourceInspector::new(InspectorConfig {
            source_root: root.to_path_buf(),
            ..InspectorConfig::default()
        })
        .load()
        .unwrap()
    }

    #[test]
    fn test_compliant_tree_scores_100() {
        let dir = TempDir::new().unwrap();
        fixture::write_compliant_tree(dir.path());
        let corpus = load(dir.path());

        let checks = builtin_controls();
        let report = ComplianceEvaluator::new(&checks).evaluate(&corpus).unwrap();
        let failing: Vec<_> = report
            .results
            .iter()
            .filter(|r| r.score < 100.0)
            .map(|r| format!("{}: {:?}", r.control_id, r.recommendations))
            .collect();
        assert!(failing.is_empty(), "{:#?}", failing);
        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.compliance_percentage, 100.0);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.frameworks.len(), 6);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_empty_tree_fails_with_recommendations() {
        let dir = TempDir::new().unwrap();
        let corpus = load(dir.path());

        let checks = builtin_controls();
        let report = ComplianceEvaluator::new(&checks).evaluate(&corpus).unwrap();
        assert_eq!(report.results.len(), rules::CONTROLS.len());
        assert!(report.overall_score < 40.0);
        assert_eq!(report.risk_level, RiskLevel::High);
        assert!(!report.failures.is_empty());
        assert!(report.failures.iter().all(|f| !f.recommendations.is_empty()));
    }

    #[test]
    fn test_broken_control_is_isolated() {
        let dir = TempDir::new().unwrap();
        fixture::write_compliant_tree(dir.path());
        let corpus = load(dir.path());

        let mut checks = builtin_controls();
        let mut definition = rules::CONTROLS[0].definition();
        definition.id = "BROKEN-1".to_string();
        checks.insert(1, Box::new(BrokenCheck(definition)));

        let report = ComplianceEvaluator::new(&checks).evaluate(&corpus).unwrap();
        assert_eq!(report.controls_failed, 1);
        let broken = &report.results[1];
        assert_eq!(broken.control_id, "BROKEN-1");
        assert_eq!(broken.score, 0.0);
        assert!(!broken.passed);
        assert_eq!(broken.risk_level, RiskLevel::Critical);
        assert!(broken.details.starts_with("execution failed"));
        assert_eq!(report.results[0].score, 100.0);
        assert_eq!(report.results[2].score, 100.0);
    }

    #[test]
    fn test_duplicate_broken_control_counted_once() {
        let dir = TempDir::new().unwrap();
        let corpus = load(dir.path());

        let mut definition = rules::CONTROLS[0].definition();
        definition.id = "BROKEN-1".to_string();
        let checks: Vec<Box<dyn ComplianceCheck>> = vec![
            Box::new(BrokenCheck(definition.clone())),
            Box::new(BrokenCheck(definition)),
        ];

        let report = ComplianceEvaluator::new(&checks).evaluate(&corpus).unwrap();
        assert_eq!(report.controls_evaluated, 1);
        assert_eq!(report.controls_failed, 1);
        assert_eq!(report.results.len(), 1);
    }

    #[test]
    fn test_summaries() {
        let definition = |id: &str, framework, category: &str| ControlDefinition {
            id: id.to_string(),
            name: id.to_string(),
            category: category.to_string(),
            framework,
            requirement: String::new(),
            threshold: 70.0,
        };
        let result = |id: &str, score: f64| ControlResult {
            control_id: id.to_string(),
            passed: true,
            compliant: score >= 70.0,
            score,
            details: String::new(),
            recommendations: Vec::new(),
            risk_level: RiskLevel::for_control(score, score >= 70.0),
        };
        let a = definition("A", Framework::Gdpr, "privacy");
        let b = definition("B", Framework::Gdpr, "privacy");
        let c = definition("C", Framework::Sox, "logging");
        let definitions = vec![&a, &b, &c];
        let results = vec![result("A", 100.0), result("B", 40.0), result("C", 70.0)];

        let frameworks = framework_summaries(&definitions, &results);
        assert_eq!(frameworks.len(), 2);
        let gdpr = frameworks.iter().find(|f| f.framework == Framework::Gdpr).unwrap();
        assert_eq!(gdpr.total_controls, 2);
        assert_eq!(gdpr.passed_controls, 1);
        assert_eq!(gdpr.compliance_percentage, 50.0);
        assert_eq!(gdpr.average_score, 70.0);

        let categories = category_summaries(&definitions, &results);
        assert_eq!(categories[0].category, "logging");
        assert_eq!(categories[1].category, "privacy");
        assert_eq!(categories[1].score, 70.0);
    }

    #[test]
    fn test_empty_catalog_is_a_phase_error() {
        let corpus = SourceCorpus::new("/tmp", Vec::new());
        assert!(ComplianceEvaluator::new(&[]).evaluate(&corpus).is_err());
    }
}
