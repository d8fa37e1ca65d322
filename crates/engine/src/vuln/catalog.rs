//! Built-in probe catalog.

use super::checks::{access, injection, surface};
use super::{ProbeOutcome, ProbeTargets, SecurityProbe};
use crate::client::ProbeClient;
use async_trait::async_trait;
use readyprobe_common::Result;
use readyprobe_report_schema::{ProbeCategory, ProbeDefinition, Severity};

/// One variant per built-in probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    SqlInjection,
    NoSqlInjection,
    CommandInjection,
    ReflectedXss,
    PathTraversal,
    ForgedJwt,
    MissingAuthentication,
    Idor,
    BruteForce,
    WeakCredentials,
    MissingSecurityHeaders,
    CorsMisconfiguration,
    VerboseErrors,
    SensitiveFiles,
    InsecureCookies,
    HttpsEnforcement,
    ServerBanner,
}

impl ProbeKind {
    /// Every built-in probe in execution order.
    pub const ALL: [ProbeKind; 17] = [
        ProbeKind::SqlInjection,
        ProbeKind::NoSqlInjection,
        ProbeKind::CommandInjection,
        ProbeKind::ReflectedXss,
        ProbeKind::PathTraversal,
        ProbeKind::ForgedJwt,
        ProbeKind::MissingAuthentication,
        ProbeKind::Idor,
        ProbeKind::BruteForce,
        ProbeKind::WeakCredentials,
        ProbeKind::MissingSecurityHeaders,
        ProbeKind::CorsMisconfiguration,
        ProbeKind::VerboseErrors,
        ProbeKind::SensitiveFiles,
        ProbeKind::InsecureCookies,
        ProbeKind::HttpsEnforcement,
        ProbeKind::ServerBanner,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProbeKind::SqlInjection => "sql_injection",
            ProbeKind::NoSqlInjection => "nosql_injection",
            ProbeKind::CommandInjection => "command_injection",
            ProbeKind::ReflectedXss => "reflected_xss",
            ProbeKind::PathTraversal => "path_traversal",
            ProbeKind::ForgedJwt => "forged_jwt",
            ProbeKind::MissingAuthentication => "missing_authentication",
            ProbeKind::Idor => "idor",
            ProbeKind::BruteForce => "brute_force",
            ProbeKind::WeakCredentials => "weak_credentials",
            ProbeKind::MissingSecurityHeaders => "missing_security_headers",
            ProbeKind::CorsMisconfiguration => "cors_misconfiguration",
            ProbeKind::VerboseErrors => "verbose_errors",
            ProbeKind::SensitiveFiles => "sensitive_files",
            ProbeKind::InsecureCookies => "insecure_cookies",
            ProbeKind::HttpsEnforcement => "https_enforcement",
            ProbeKind::ServerBanner => "server_banner",
        }
    }

    pub fn category(self) -> ProbeCategory {
        use ProbeKind::*;
        match self {
            SqlInjection | NoSqlInjection | CommandInjection | ReflectedXss => ProbeCategory::Injection,
            ForgedJwt | BruteForce | WeakCredentials => ProbeCategory::Authentication,
            MissingAuthentication | Idor => ProbeCategory::Authorization,
            InsecureCookies | HttpsEnforcement => ProbeCategory::Crypto,
            MissingSecurityHeaders | CorsMisconfiguration | ServerBanner => {
                ProbeCategory::Configuration
            }
            PathTraversal | VerboseErrors | SensitiveFiles => ProbeCategory::DataExposure,
        }
    }

    pub fn severity(self) -> Severity {
        use ProbeKind::*;
        match self {
            SqlInjection | CommandInjection | ForgedJwt | WeakCredentials => Severity::Critical,
            NoSqlInjection | ReflectedXss | PathTraversal | MissingAuthentication | Idor
            | BruteForce | SensitiveFiles => Severity::High,
            MissingSecurityHeaders | CorsMisconfiguration | InsecureCookies | HttpsEnforcement => {
                Severity::Medium
            }
            VerboseErrors | ServerBanner => Severity::Low,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ProbeKind::SqlInjection => "SQL injection via query and login parameters",
            ProbeKind::NoSqlInjection => "Operator injection into document-store queries",
            ProbeKind::CommandInjection => "OS command injection via query parameters",
            ProbeKind::ReflectedXss => "Reflected cross-site scripting",
            ProbeKind::PathTraversal => "Directory traversal in file-serving endpoints",
            ProbeKind::ForgedJwt => "Forged or unsigned bearer tokens accepted",
            ProbeKind::MissingAuthentication => "Protected endpoints reachable without credentials",
            ProbeKind::Idor => "Insecure direct object reference",
            ProbeKind::BruteForce => "Login endpoint lacks attempt throttling",
            ProbeKind::WeakCredentials => "Default or common credentials accepted",
            ProbeKind::MissingSecurityHeaders => "Missing HTTP security headers",
            ProbeKind::CorsMisconfiguration => "Permissive cross-origin resource sharing",
            ProbeKind::VerboseErrors => "Stack traces or debug output in error responses",
            ProbeKind::SensitiveFiles => "Secrets, VCS metadata or backups served publicly",
            ProbeKind::InsecureCookies => "Cookies without HttpOnly, Secure or SameSite",
            ProbeKind::HttpsEnforcement => "Transport security not enforced",
            ProbeKind::ServerBanner => "Software versions disclosed in headers",
        }
    }

    pub fn definition(self) -> ProbeDefinition {
        ProbeDefinition {
            name: self.name().to_string(),
            category: self.category(),
            severity: self.severity(),
            description: self.description().to_string(),
        }
    }

    async fn check(self, client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
        match self {
            ProbeKind::SqlInjection => injection::sql_injection(client, targets).await,
            ProbeKind::NoSqlInjection => injection::nosql_injection(client, targets).await,
            ProbeKind::CommandInjection => injection::command_injection(client, targets).await,
            ProbeKind::ReflectedXss => injection::reflected_xss(client, targets).await,
            ProbeKind::PathTraversal => injection::path_traversal(client, targets).await,
            ProbeKind::ForgedJwt => access::forged_jwt(client, targets).await,
            ProbeKind::MissingAuthentication => access::missing_authentication(client, targets).await,
            ProbeKind::Idor => access::idor(client, targets).await,
            ProbeKind::BruteForce => access::brute_force(client, targets).await,
            ProbeKind::WeakCredentials => access::weak_credentials(client, targets).await,
            ProbeKind::MissingSecurityHeaders => {
                surface::missing_security_headers(client, targets).await
            }
            ProbeKind::CorsMisconfiguration => surface::cors_misconfiguration(client, targets).await,
            ProbeKind::VerboseErrors => surface::verbose_errors(client, targets).await,
            ProbeKind::SensitiveFiles => surface::sensitive_files(client, targets).await,
            ProbeKind::InsecureCookies => surface::insecure_cookies(client, targets).await,
            ProbeKind::HttpsEnforcement => surface::https_enforcement(client, targets).await,
            ProbeKind::ServerBanner => surface::server_banner(client, targets).await,
        }
    }
}

/// A built-in probe bound to the paths it targets.
pub struct BuiltinProbe {
    kind: ProbeKind,
    definition: ProbeDefinition,
    targets: ProbeTargets,
}

impl BuiltinProbe {
    pub fn new(kind: ProbeKind, targets: ProbeTargets) -> Self {
        Self {
            kind,
            definition: kind.definition(),
            targets,
        }
    }

    pub fn kind(&self) -> ProbeKind {
        self.kind
    }
}

#[async_trait]
impl SecurityProbe for BuiltinProbe {
    fn definition(&self) -> &ProbeDefinition {
        &self.definition
    }

    async fn run(&self, client: &dyn ProbeClient) -> Result<ProbeOutcome> {
        self.kind.check(client, &self.targets).await
    }
}

/// The full built-in catalog, in execution order.
pub fn builtin_catalog(targets: &ProbeTargets) -> Vec<Box<dyn SecurityProbe>> {
    ProbeKind::ALL
        .iter()
        .map(|&kind| Box::new(BuiltinProbe::new(kind, targets.clone())) as Box<dyn SecurityProbe>)
        .collect()
}
