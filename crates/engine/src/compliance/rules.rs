//! Versioned compliance rule table.
//!
//! Each control is scored from a few weighted signals. A signal is a textual
//! fact about the source tree; all signals are evaluated by [`evaluate_signal`].

use super::inspector::SourceCorpus;
use readyprobe_common::{Error, Result};
use readyprobe_report_schema::{ControlDefinition, Framework};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

/// Version recorded in every compliance report.
pub const RULESET_VERSION: &str = "2026.10";

/// How a signal is detected.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    /// Pattern occurs in at least one inspected file.
    SourcePattern(&'static str),
    /// Pattern occurs in no inspected file.
    SourceAbsent(&'static str),
    /// One of these paths exists under the root.
    FileExists(&'static [&'static str]),
    /// One of these files contains the pattern.
    FileContains(&'static [&'static str], &'static str),
}

#[derive(Debug)]
pub struct Signal {
    pub id: &'static str,
    pub matcher: Matcher,
    /// Shown when the signal is met.
    pub description: &'static str,
    /// Shown when it is not.
    pub remediation: &'static str,
}

/// Result of one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalHit {
    pub met: bool,
    /// Where the deciding match was found, if anywhere.
    pub location: Option<String>,
}

/// Compiled signal patterns, keyed by pattern text. Patterns that fail to
/// compile are never cached.
static COMPILED: LazyLock<Mutex<HashMap<&'static str, Regex>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn compiled(signal: &Signal, pattern: &'static str) -> Result<Regex> {
    let mut cache = COMPILED.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern).map_err(|e| Error::ControlExecution {
        control: signal.id.to_string(),
        reason: format!("invalid pattern: {}", e),
    })?;
    cache.insert(pattern, regex.clone());
    Ok(regex)
}

pub fn evaluate_signal(signal: &Signal, corpus: &SourceCorpus) -> Result<SignalHit> {
    let compile = |pattern: &'static str| compiled(signal, pattern);

    let hit = match signal.matcher {
        Matcher::SourcePattern(pattern) => {
            let location = corpus.find(&compile(pattern)?).map(|m| m.to_string());
            SignalHit {
                met: location.is_some(),
                location,
            }
        }
        Matcher::SourceAbsent(pattern) => {
            let location = corpus.find(&compile(pattern)?).map(|m| m.to_string());
            SignalHit {
                met: location.is_none(),
                location,
            }
        }
        Matcher::FileExists(candidates) => {
            let location = corpus.existing(candidates);
            SignalHit {
                met: location.is_some(),
                location,
            }
        }
        Matcher::FileContains(candidates, pattern) => {
            let location = corpus
                .file_matching(candidates, &compile(pattern)?)?
                .map(|m| m.to_string());
            SignalHit {
                met: location.is_some(),
                location,
            }
        }
    };
    Ok(hit)
}

/// One control: a framework requirement scored from weighted signals.
#[derive(Debug)]
pub struct ControlSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub framework: Framework,
    pub requirement: &'static str,
    pub threshold: f64,
    /// Signals with weights summing to 100.
    pub rules: &'static [(&'static Signal, u32)],
}

impl ControlSpec {
    pub fn definition(&self) -> ControlDefinition {
        ControlDefinition {
            id: self.id.to_string(),
            name: self.name.to_string(),
            category: self.category.to_string(),
            framework: self.framework,
            requirement: self.requirement.to_string(),
            threshold: self.threshold,
        }
    }
}

// Signals

pub static PASSWORD_HASHING: Signal = Signal {
    id: "password_hashing",
    matcher: Matcher::SourcePattern(r"(?i)\b(bcrypt|argon2|scrypt|pbkdf2)"),
    description: "passwords hashed with an adaptive function",
    remediation: "Hash passwords with bcrypt, scrypt or argon2",
};

pub static MFA: Signal = Signal {
    id: "mfa",
    matcher: Matcher::SourcePattern(r"(?i)(totp|two[_-]?factor|\b2fa\b|\bmfa\b|otpauth|webauthn)"),
    description: "multi-factor authentication support",
    remediation: "Offer multi-factor authentication for privileged and user accounts",
};

pub static RATE_LIMITING: Signal = Signal {
    id: "rate_limiting",
    matcher: Matcher::SourcePattern(r"(?i)(rate[_-]?limit|throttl|slowapi|governor)"),
    description: "request rate limiting",
    remediation: "Rate-limit authentication and public API endpoints",
};

pub static ACCOUNT_LOCKOUT: Signal = Signal {
    id: "account_lockout",
    matcher: Matcher::SourcePattern(
        r"(?i)(lockout|max[_-]?(login[_-]?)?attempts|failed[_-]?(login[_-]?)?attempts|account[_-]?locked)",
    ),
    description: "account lockout after failed logins",
    remediation: "Lock or delay accounts after repeated failed logins",
};

pub static RBAC: Signal = Signal {
    id: "rbac",
    matcher: Matcher::SourcePattern(r"(?i)(rbac|has_?role|require_?role|permissions?\b|@PreAuthorize|authorize\()"),
    description: "role-based authorization",
    remediation: "Enforce role-based authorization on privileged operations",
};

pub static SESSION_TIMEOUT: Signal = Signal {
    id: "session_timeout",
    matcher: Matcher::SourcePattern(
        r"(?i)(session[_-]?timeout|idle[_-]?timeout|max[_-]?age|expires[_-]?in|token[_-]?expir)",
    ),
    description: "session or token expiry",
    remediation: "Expire sessions and tokens after a bounded idle period",
};

pub static AUDIT_LOGGING: Signal = Signal {
    id: "audit_logging",
    matcher: Matcher::SourcePattern(r"(?i)(audit[_-]?(log|trail|event)|auditlog)"),
    description: "audit trail of security-relevant events",
    remediation: "Record an audit trail of logins, permission changes and data access",
};

pub static STRUCTURED_LOGGING: Signal = Signal {
    id: "structured_logging",
    matcher: Matcher::SourcePattern(
        r"(?i)\b(winston|pino|bunyan|log4j|logback|tracing|structlog|logrus|serilog|getLogger)\b",
    ),
    description: "structured logging library",
    remediation: "Adopt a structured logging library with levels and context",
};

pub static TLS_CONFIG: Signal = Signal {
    id: "tls_config",
    matcher: Matcher::SourcePattern(
        r"(?i)(https\.createServer|tls[_-]?(cert|key|config)|ssl_certificate|rustls|min[_-]?tls|TLSv1\.[23])",
    ),
    description: "TLS termination configured",
    remediation: "Terminate TLS 1.2+ for all external traffic",
};

pub static HSTS_CONFIG: Signal = Signal {
    id: "hsts_config",
    matcher: Matcher::SourcePattern(r"(?i)(strict-transport-security|\bhsts\b|helmet)"),
    description: "HSTS configured",
    remediation: "Send Strict-Transport-Security on HTTPS responses",
};

pub static ENCRYPTION_AT_REST: Signal = Signal {
    id: "encryption_at_rest",
    matcher: Matcher::SourcePattern(
        r"(?i)(aes[-_]?256|aes-gcm|createCipheriv|encrypt(ed)?[_-]?(field|column|at[_-]?rest)|\bkms\b|fernet|pgcrypto)",
    ),
    description: "sensitive data encrypted at rest",
    remediation: "Encrypt sensitive fields or volumes at rest with managed keys",
};

pub static NO_HARDCODED_SECRETS: Signal = Signal {
    id: "no_hardcoded_secrets",
    matcher: Matcher::SourceAbsent(
        r#"(?i)(password|secret|api[_-]?key|private[_-]?key|access[_-]?token)\s*[:=]\s*["'][^"'\s$]{8,}["']"#,
    ),
    description: "no literal credentials in source",
    remediation: "Move credentials out of source into a secret manager or environment",
};

pub static SECRETS_FROM_ENV: Signal = Signal {
    id: "secrets_from_env",
    matcher: Matcher::SourcePattern(
        r"(process\.env\.|std::env::var|os\.environ|os\.getenv|System\.getenv|ENV\[)",
    ),
    description: "configuration read from the environment",
    remediation: "Read secrets and deployment settings from the environment",
};

pub static INPUT_VALIDATION: Signal = Signal {
    id: "input_validation",
    matcher: Matcher::SourcePattern(
        r"(?i)(\bjoi\.|\bzod\b|\byup\.|class-validator|pydantic|express-validator|@Valid\b|validator|validate\()",
    ),
    description: "request input validation",
    remediation: "Validate request input against explicit schemas",
};

pub static PARAMETERIZED_QUERIES: Signal = Signal {
    id: "parameterized_queries",
    matcher: Matcher::SourcePattern(
        r"(?i)(prepared[_ ]?statement|\.prepare\(|sqlx::query|\bknex\b|sequelize|prisma|typeorm|sqlalchemy|\bdiesel\b|parameterized)",
    ),
    description: "parameterized queries or an ORM",
    remediation: "Use parameterized queries or an ORM for all database access",
};

pub static NO_STRING_SQL: Signal = Signal {
    id: "no_string_sql",
    matcher: Matcher::SourceAbsent(
        r#"(?i)["'`]\s*(SELECT|INSERT INTO|UPDATE|DELETE FROM)\b[^"'`\n]*["'`]\s*\+"#,
    ),
    description: "no SQL built by string concatenation",
    remediation: "Replace concatenated SQL strings with bound parameters",
};

pub static SECURITY_HEADERS: Signal = Signal {
    id: "security_headers",
    matcher: Matcher::SourcePattern(
        r"(?i)(helmet|content-security-policy|x-frame-options|x-content-type-options)",
    ),
    description: "security headers set by the application",
    remediation: "Set CSP, X-Frame-Options and X-Content-Type-Options in middleware",
};

pub static CORS_ALLOWLIST: Signal = Signal {
    id: "cors_allowlist",
    matcher: Matcher::SourcePattern(r"(?i)(allowed[_-]?origins|cors[_-]?origins|allow_origins)"),
    description: "CORS origin allow-list",
    remediation: "Configure CORS with an explicit origin allow-list",
};

pub static DEBUG_DISABLED: Signal = Signal {
    id: "debug_disabled",
    matcher: Matcher::SourceAbsent(
        r#"(?i)(\bDEBUG\s*=\s*True\b|app\.debug\s*=\s*true|NODE_ENV\s*[:=]\s*["']?development)"#,
    ),
    description: "no debug mode enabled in committed configuration",
    remediation: "Disable debug mode in committed configuration",
};

pub static ERROR_HANDLER: Signal = Signal {
    id: "error_handler",
    matcher: Matcher::SourcePattern(
        r"(?i)(error[_-]?handler|@ExceptionHandler|exception_handler|catch_unwind|app\.use\(\(err)",
    ),
    description: "central error handler",
    remediation: "Install a central error handler that returns generic responses",
};

pub static DEPENDENCY_LOCKFILE: Signal = Signal {
    id: "dependency_lockfile",
    matcher: Matcher::FileExists(&[
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "Cargo.lock",
        "poetry.lock",
        "Pipfile.lock",
        "go.sum",
        "Gemfile.lock",
        "composer.lock",
    ]),
    description: "dependency versions locked",
    remediation: "Commit a dependency lockfile",
};

pub static DEPENDENCY_SCANNING: Signal = Signal {
    id: "dependency_scanning",
    matcher: Matcher::FileExists(&[
        ".github/dependabot.yml",
        ".github/dependabot.yaml",
        "renovate.json",
        ".snyk",
    ]),
    description: "automated dependency updates or scanning",
    remediation: "Enable Dependabot, Renovate or Snyk for dependency vulnerabilities",
};

pub static CI_PIPELINE: Signal = Signal {
    id: "ci_pipeline",
    matcher: Matcher::FileExists(&[
        ".github/workflows",
        ".gitlab-ci.yml",
        "Jenkinsfile",
        ".circleci/config.yml",
        "azure-pipelines.yml",
    ]),
    description: "continuous integration pipeline",
    remediation: "Run builds and tests in a CI pipeline on every change",
};

pub static CODE_REVIEW: Signal = Signal {
    id: "code_review",
    matcher: Matcher::FileExists(&[
        "CODEOWNERS",
        ".github/CODEOWNERS",
        "docs/CODEOWNERS",
        ".github/pull_request_template.md",
    ]),
    description: "code ownership and review rules",
    remediation: "Require reviews through CODEOWNERS or a pull request template",
};

pub static CHANGE_LOG: Signal = Signal {
    id: "change_log",
    matcher: Matcher::FileExists(&["CHANGELOG.md", "CHANGELOG", "HISTORY.md"]),
    description: "change log maintained",
    remediation: "Maintain a change log of released changes",
};

pub static TESTS_PRESENT: Signal = Signal {
    id: "tests_present",
    matcher: Matcher::SourcePattern(
        r"(describe\(|#\[test\]|#\[tokio::test\]|def test_|@Test\b|func Test\w+\()",
    ),
    description: "automated tests",
    remediation: "Add automated tests for security-relevant code paths",
};

pub static BACKUP: Signal = Signal {
    id: "backup",
    matcher: Matcher::SourcePattern(r"(?i)(backup|snapshot|pg_dump|point[_-]?in[_-]?time)"),
    description: "backup procedure",
    remediation: "Schedule and test backups of persistent data",
};

pub static HEALTH_CHECK: Signal = Signal {
    id: "health_check",
    matcher: Matcher::SourcePattern(r"(?i)(/health|healthz|readiness|liveness)"),
    description: "health check endpoint",
    remediation: "Expose health and readiness endpoints",
};

pub static MONITORING: Signal = Signal {
    id: "monitoring",
    matcher: Matcher::SourcePattern(
        r"(?i)(prometheus|opentelemetry|datadog|newrelic|sentry|statsd)",
    ),
    description: "metrics or error monitoring",
    remediation: "Export metrics and errors to a monitoring service",
};

pub static INCIDENT_RESPONSE: Signal = Signal {
    id: "incident_response",
    matcher: Matcher::FileExists(&[
        "SECURITY.md",
        ".github/SECURITY.md",
        "INCIDENT_RESPONSE.md",
        "docs/incident-response.md",
        "RUNBOOK.md",
        "docs/runbook.md",
    ]),
    description: "documented incident response",
    remediation: "Document a security contact and incident response procedure",
};

pub static PRIVACY_POLICY: Signal = Signal {
    id: "privacy_policy",
    matcher: Matcher::SourcePattern(r"(?i)privacy[ _-]?policy"),
    description: "privacy policy referenced",
    remediation: "Publish and link a privacy policy",
};

pub static CONSENT: Signal = Signal {
    id: "consent",
    matcher: Matcher::SourcePattern(r"(?i)(consent|opt[_-]?in|cookie[_-]?banner)"),
    description: "consent capture",
    remediation: "Record explicit, revocable consent before processing personal data",
};

pub static DATA_DELETION: Signal = Signal {
    id: "data_deletion",
    matcher: Matcher::SourcePattern(
        r"(?i)(delete[_-]?account|deleteUser|delete_user|right[_-]?to[_-]?(be[_-]?)?forgotten|erase[_-]?(user|personal))",
    ),
    description: "personal data erasure",
    remediation: "Implement account and personal data deletion on request",
};

pub static DATA_EXPORT: Signal = Signal {
    id: "data_export",
    matcher: Matcher::SourcePattern(
        r"(?i)(export[_-]?(user[_-]?)?data|data[_-]?portability|download[_-]?my[_-]?data)",
    ),
    description: "personal data export",
    remediation: "Let users export their data in a machine-readable format",
};

pub static DATA_RETENTION: Signal = Signal {
    id: "data_retention",
    matcher: Matcher::SourcePattern(r"(?i)(retention|expire[sd]?[_-]?after|purge)"),
    description: "data retention policy",
    remediation: "Define and enforce retention periods for stored records",
};

pub static PII_MASKING: Signal = Signal {
    id: "pii_masking",
    matcher: Matcher::SourcePattern(r"(?i)(redact|pseudonymi[sz]|anonymi[sz]|mask[_-]?(pii|email|card))"),
    description: "personal data masking",
    remediation: "Mask or pseudonymize personal data in logs and non-production copies",
};

pub static CARD_DATA_ABSENT: Signal = Signal {
    id: "card_data_absent",
    matcher: Matcher::SourceAbsent(r"\b4[0-9]{12}(?:[0-9]{3})?\b"),
    description: "no card numbers in source",
    remediation: "Remove primary account numbers from source and fixtures",
};

pub static TOKENIZATION: Signal = Signal {
    id: "tokenization",
    matcher: Matcher::SourcePattern(r"(?i)(stripe|braintree|adyen|tokeni[sz]|payment[_-]?intent)"),
    description: "card data tokenized by a processor",
    remediation: "Tokenize card data through a PCI-certified processor",
};

pub static ENV_EXAMPLE: Signal = Signal {
    id: "env_example",
    matcher: Matcher::FileExists(&[".env.example", ".env.sample", "config/example.env"]),
    description: "documented configuration template",
    remediation: "Commit a configuration template without real values",
};

pub static GITIGNORE_ENV: Signal = Signal {
    id: "gitignore_env",
    matcher: Matcher::FileContains(&[".gitignore"], r"(?m)^/?\.env\b"),
    description: "environment files excluded from version control",
    remediation: "Add .env files to .gitignore",
};

pub static CONTAINER_NONROOT: Signal = Signal {
    id: "container_nonroot",
    matcher: Matcher::FileContains(&["Dockerfile"], r"(?m)^USER\s+(node|app|appuser|nobody|nonroot|www-data|[1-9][0-9]*)\b"),
    description: "container runs as a non-root user",
    remediation: "Run the container as a non-root USER",
};

// Controls

pub static CONTROLS: &[ControlSpec] = &[
    ControlSpec {
        id: "NIST-AC-2",
        name: "Account management",
        category: "access_control",
        framework: Framework::Nist,
        requirement: "Accounts are authorized by role, expire when idle and are audited",
        threshold: 70.0,
        rules: &[(&RBAC, 40), (&SESSION_TIMEOUT, 30), (&AUDIT_LOGGING, 30)],
    },
    ControlSpec {
        id: "NIST-AC-7",
        name: "Unsuccessful logon attempts",
        category: "access_control",
        framework: Framework::Nist,
        requirement: "Consecutive invalid logon attempts are limited",
        threshold: 70.0,
        rules: &[(&RATE_LIMITING, 50), (&ACCOUNT_LOCKOUT, 50)],
    },
    ControlSpec {
        id: "NIST-IA-2",
        name: "Identification and authentication",
        category: "authentication",
        framework: Framework::Nist,
        requirement: "Users are uniquely authenticated with protected credentials and MFA",
        threshold: 70.0,
        rules: &[(&PASSWORD_HASHING, 50), (&MFA, 50)],
    },
    ControlSpec {
        id: "NIST-AU-2",
        name: "Event logging",
        category: "logging",
        framework: Framework::Nist,
        requirement: "Security-relevant events are logged",
        threshold: 70.0,
        rules: &[(&AUDIT_LOGGING, 50), (&STRUCTURED_LOGGING, 50)],
    },
    ControlSpec {
        id: "NIST-SC-8",
        name: "Transmission confidentiality",
        category: "cryptography",
        framework: Framework::Nist,
        requirement: "Transmitted information is protected by encryption",
        threshold: 70.0,
        rules: &[(&TLS_CONFIG, 60), (&HSTS_CONFIG, 40)],
    },
    ControlSpec {
        id: "NIST-SI-10",
        name: "Information input validation",
        category: "secure_development",
        framework: Framework::Nist,
        requirement: "Inputs are validated before use",
        threshold: 70.0,
        rules: &[
            (&INPUT_VALIDATION, 40),
            (&PARAMETERIZED_QUERIES, 30),
            (&NO_STRING_SQL, 30),
        ],
    },
    ControlSpec {
        id: "NIST-CM-6",
        name: "Configuration settings",
        category: "configuration",
        framework: Framework::Nist,
        requirement: "Secure configuration settings are established and documented",
        threshold: 70.0,
        rules: &[
            (&SECRETS_FROM_ENV, 30),
            (&GITIGNORE_ENV, 30),
            (&DEBUG_DISABLED, 20),
            (&CONTAINER_NONROOT, 20),
        ],
    },
    ControlSpec {
        id: "ISO-A.8.24",
        name: "Use of cryptography",
        category: "cryptography",
        framework: Framework::Iso27001,
        requirement: "Cryptography protects data at rest and in transit",
        threshold: 70.0,
        rules: &[(&ENCRYPTION_AT_REST, 50), (&TLS_CONFIG, 50)],
    },
    ControlSpec {
        id: "ISO-A.8.28",
        name: "Secure coding",
        category: "secure_development",
        framework: Framework::Iso27001,
        requirement: "Secure coding principles are applied to software development",
        threshold: 70.0,
        rules: &[
            (&INPUT_VALIDATION, 30),
            (&NO_HARDCODED_SECRETS, 40),
            (&TESTS_PRESENT, 30),
        ],
    },
    ControlSpec {
        id: "ISO-A.8.8",
        name: "Technical vulnerability management",
        category: "vulnerability_management",
        framework: Framework::Iso27001,
        requirement: "Vulnerable dependencies are identified and remediated",
        threshold: 70.0,
        rules: &[(&DEPENDENCY_LOCKFILE, 40), (&DEPENDENCY_SCANNING, 60)],
    },
    ControlSpec {
        id: "ISO-A.8.9",
        name: "Configuration management",
        category: "configuration",
        framework: Framework::Iso27001,
        requirement: "Configurations are documented and kept out of code",
        threshold: 70.0,
        rules: &[(&ENV_EXAMPLE, 30), (&SECRETS_FROM_ENV, 40), (&CORS_ALLOWLIST, 30)],
    },
    ControlSpec {
        id: "ISO-A.5.24",
        name: "Incident management planning",
        category: "incident_response",
        framework: Framework::Iso27001,
        requirement: "Incident response is planned and incidents are detectable",
        threshold: 70.0,
        rules: &[(&INCIDENT_RESPONSE, 50), (&MONITORING, 50)],
    },
    ControlSpec {
        id: "SOC2-CC6.1",
        name: "Logical access security",
        category: "access_control",
        framework: Framework::Soc2,
        requirement: "Logical access to information assets is restricted",
        threshold: 80.0,
        rules: &[(&PASSWORD_HASHING, 35), (&RBAC, 35), (&SESSION_TIMEOUT, 30)],
    },
    ControlSpec {
        id: "SOC2-CC7.2",
        name: "System monitoring",
        category: "monitoring",
        framework: Framework::Soc2,
        requirement: "System components are monitored for anomalies",
        threshold: 70.0,
        rules: &[
            (&MONITORING, 30),
            (&HEALTH_CHECK, 25),
            (&STRUCTURED_LOGGING, 25),
            (&ERROR_HANDLER, 20),
        ],
    },
    ControlSpec {
        id: "SOC2-CC8.1",
        name: "Change management",
        category: "change_management",
        framework: Framework::Soc2,
        requirement: "Changes are authorized, tested and approved before deployment",
        threshold: 70.0,
        rules: &[(&CI_PIPELINE, 40), (&CODE_REVIEW, 30), (&TESTS_PRESENT, 30)],
    },
    ControlSpec {
        id: "SOC2-A1.2",
        name: "Backup and recovery",
        category: "availability",
        framework: Framework::Soc2,
        requirement: "Data is backed up and recovery is monitored",
        threshold: 70.0,
        rules: &[(&BACKUP, 60), (&HEALTH_CHECK, 40)],
    },
    ControlSpec {
        id: "PCI-3.4",
        name: "Render PAN unreadable",
        category: "data_protection",
        framework: Framework::PciDss,
        requirement: "Primary account numbers are unreadable wherever stored",
        threshold: 80.0,
        rules: &[
            (&CARD_DATA_ABSENT, 50),
            (&TOKENIZATION, 25),
            (&ENCRYPTION_AT_REST, 25),
        ],
    },
    ControlSpec {
        id: "PCI-4.2",
        name: "Strong cryptography in transit",
        category: "cryptography",
        framework: Framework::PciDss,
        requirement: "Cardholder data is encrypted over open networks",
        threshold: 80.0,
        rules: &[(&TLS_CONFIG, 50), (&HSTS_CONFIG, 50)],
    },
    ControlSpec {
        id: "PCI-6.2",
        name: "Secure software development",
        category: "secure_development",
        framework: Framework::PciDss,
        requirement: "Software is developed securely against common attacks",
        threshold: 80.0,
        rules: &[
            (&PARAMETERIZED_QUERIES, 30),
            (&NO_STRING_SQL, 30),
            (&SECURITY_HEADERS, 20),
            (&DEBUG_DISABLED, 20),
        ],
    },
    ControlSpec {
        id: "PCI-8.3",
        name: "Strong authentication",
        category: "authentication",
        framework: Framework::PciDss,
        requirement: "Strong authentication is established for users",
        threshold: 80.0,
        rules: &[(&PASSWORD_HASHING, 40), (&MFA, 30), (&ACCOUNT_LOCKOUT, 30)],
    },
    ControlSpec {
        id: "PCI-10.2",
        name: "Audit logs",
        category: "logging",
        framework: Framework::PciDss,
        requirement: "Audit logs capture user activity and security events",
        threshold: 80.0,
        rules: &[(&AUDIT_LOGGING, 60), (&STRUCTURED_LOGGING, 40)],
    },
    ControlSpec {
        id: "GDPR-ART7",
        name: "Conditions for consent",
        category: "privacy",
        framework: Framework::Gdpr,
        requirement: "Consent is demonstrable and informed",
        threshold: 70.0,
        rules: &[(&CONSENT, 60), (&PRIVACY_POLICY, 40)],
    },
    ControlSpec {
        id: "GDPR-ART17",
        name: "Right to erasure",
        category: "privacy",
        framework: Framework::Gdpr,
        requirement: "Personal data can be erased on request",
        threshold: 70.0,
        rules: &[(&DATA_DELETION, 70), (&DATA_RETENTION, 30)],
    },
    ControlSpec {
        id: "GDPR-ART20",
        name: "Right to data portability",
        category: "privacy",
        framework: Framework::Gdpr,
        requirement: "Personal data can be exported in a machine-readable format",
        threshold: 70.0,
        rules: &[(&DATA_EXPORT, 70), (&PRIVACY_POLICY, 30)],
    },
    ControlSpec {
        id: "GDPR-ART32",
        name: "Security of processing",
        category: "data_protection",
        framework: Framework::Gdpr,
        requirement: "Personal data is protected by appropriate technical measures",
        threshold: 70.0,
        rules: &[
            (&ENCRYPTION_AT_REST, 40),
            (&PII_MASKING, 30),
            (&NO_HARDCODED_SECRETS, 30),
        ],
    },
    ControlSpec {
        id: "SOX-404-AC",
        name: "Access to financial systems",
        category: "access_control",
        framework: Framework::Sox,
        requirement: "Access to financial data is role-restricted and audited",
        threshold: 80.0,
        rules: &[(&RBAC, 50), (&AUDIT_LOGGING, 50)],
    },
    ControlSpec {
        id: "SOX-404-CM",
        name: "Change controls",
        category: "change_management",
        framework: Framework::Sox,
        requirement: "Changes to financial systems are reviewed and recorded",
        threshold: 70.0,
        rules: &[(&CODE_REVIEW, 40), (&CI_PIPELINE, 30), (&CHANGE_LOG, 30)],
    },
    ControlSpec {
        id: "SOX-802",
        name: "Record retention",
        category: "logging",
        framework: Framework::Sox,
        requirement: "Records are retained, backed up and auditable",
        threshold: 70.0,
        rules: &[(&DATA_RETENTION, 50), (&AUDIT_LOGGING, 30), (&BACKUP, 20)],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::inspector::SourceFile;
    use readyprobe_report_schema::Framework;
    use std::collections::HashSet;

    fn corpus(files: &[(&str, &str)]) -> SourceCorpus {
        SourceCorpus::new(
            "/nonexistent",
            files
                .iter()
                .map(|(path, content)| SourceFile {
                    path: path.to_string(),
                    content: content.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_weights_sum_to_100() {
        for control in CONTROLS {
            let total: u32 = control.rules.iter().map(|(_, w)| w).sum();
            assert_eq!(total, 100, "{}", control.id);
            assert!((2..=4).contains(&control.rules.len()), "{}", control.id);
            assert!(control.threshold == 70.0 || control.threshold == 80.0);
        }
    }

    #[test]
    fn test_ids_unique_and_every_framework_covered() {
        let ids: HashSet<_> = CONTROLS.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), CONTROLS.len());
        let frameworks: HashSet<_> = CONTROLS.iter().map(|c| c.framework).collect();
        assert_eq!(frameworks.len(), Framework::ALL.len());
    }

    #[test]
    fn test_every_pattern_compiles() {
        let empty = corpus(&[]);
        for control in CONTROLS {
            for (signal, _) in control.rules {
                assert!(evaluate_signal(signal, &empty).is_ok(), "{}", signal.id);
            }
        }
    }

    #[test]
    fn test_source_pattern_and_absent() {
        let files = corpus(&[("src/auth.js", "const hash = await bcrypt.hash(pw, 12);")]);
        let hit = evaluate_signal(&PASSWORD_HASHING, &files).unwrap();
        assert!(hit.met);
        assert_eq!(hit.location.as_deref(), Some("src/auth.js:1"));

        assert!(evaluate_signal(&NO_HARDCODED_SECRETS, &files).unwrap().met);
        let leaky = corpus(&[("config.js", "module.exports = { password: 'hunter2hunter2' };")]);
        let hit = evaluate_signal(&NO_HARDCODED_SECRETS, &leaky).unwrap();
        assert!(!hit.met);
        assert_eq!(hit.location.as_deref(), Some("config.js:1"));
    }

    #[test]
    fn test_string_sql_detected() {
        let files = corpus(&[(
            "db.js",
            "db.query(\"SELECT * FROM users WHERE id = \" + req.params.id);",
        )]);
        assert!(!evaluate_signal(&NO_STRING_SQL, &files).unwrap().met);

        let bound = corpus(&[("db.js", "db.query('SELECT * FROM users WHERE id = $1', [id]);")]);
        assert!(evaluate_signal(&NO_STRING_SQL, &bound).unwrap().met);
    }

    #[test]
    fn test_invalid_pattern_is_an_execution_error() {
        static BROKEN: Signal = Signal {
            id: "broken",
            matcher: Matcher::SourcePattern("(unclosed"),
            description: "",
            remediation: "",
        };
        let err = evaluate_signal(&BROKEN, &corpus(&[])).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_patterns_compiled_once() {
        let files = corpus(&[("src/auth.js", "const hash = await bcrypt.hash(pw, 12);")]);
        let Matcher::SourcePattern(pattern) = PASSWORD_HASHING.matcher else {
            panic!("password hashing is a source pattern");
        };

        assert!(evaluate_signal(&PASSWORD_HASHING, &files).unwrap().met);
        assert!(COMPILED.lock().unwrap().contains_key(pattern));
        assert!(evaluate_signal(&PASSWORD_HASHING, &files).unwrap().met);

        let empty = corpus(&[]);
        for control in CONTROLS {
            for (signal, _) in control.rules {
                evaluate_signal(signal, &empty).unwrap();
                let pattern = match signal.matcher {
                    Matcher::SourcePattern(p)
                    | Matcher::SourceAbsent(p)
                    | Matcher::FileContains(_, p) => p,
                    Matcher::FileExists(_) => continue,
                };
                assert!(COMPILED.lock().unwrap().contains_key(pattern), "{}", signal.id);
            }
        }
    }

    #[test]
    fn test_invalid_pattern_not_cached() {
        static BROKEN_CLASS: Signal = Signal {
            id: "broken_class",
            matcher: Matcher::SourcePattern("[unclosed"),
            description: "",
            remediation: "",
        };
        assert!(evaluate_signal(&BROKEN_CLASS, &corpus(&[])).is_err());
        assert!(evaluate_signal(&BROKEN_CLASS, &corpus(&[])).is_err());
        assert!(!COMPILED.lock().unwrap().contains_key("[unclosed"));
    }
}
