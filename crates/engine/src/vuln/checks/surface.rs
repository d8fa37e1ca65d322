//! Probes of the target's HTTP surface: headers, cookies, errors and files.

use super::Attempts;
use crate::client::{ProbeClient, ProbeRequest, ProbeResponse};
use crate::vuln::{ProbeOutcome, ProbeTargets};
use readyprobe_common::Result;
use regex::Regex;
use std::sync::LazyLock;

/// Headers every HTML-serving response should carry.
const REQUIRED_HEADERS: &[&str] = &[
    "content-security-policy",
    "x-content-type-options",
    "x-frame-options",
];

/// Origin no legitimate deployment trusts.
const HOSTILE_ORIGIN: &str = "https://readyprobe-hostile.invalid";

/// Stack traces and framework debug pages.
static STACK_TRACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(Traceback \(most recent call last\)|Exception in thread|",
        r"\bat [\w$.<>]+\([\w./\\-]+:\d+(:\d+)?\)|at [\w.$]+\([\w]+\.java:\d+\)|",
        r"thread '[^']*' panicked at|/node_modules/|Whitelabel Error Page|",
        r"<title>Django Debug|Call Stack:|Fatal error: )"
    ))
    .unwrap()
});

/// Version numbers in banner headers.
static VERSION_BANNER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d+").unwrap());

static DOTENV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[A-Z][A-Z0-9_]*=\S").unwrap());
static GIT_CONFIG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[(core|remote \x22[^\x22]+\x22)\]").unwrap());
static SQL_DUMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(CREATE TABLE|INSERT INTO) `?\w+").unwrap());
static HTPASSWD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\w+:(\$apr1\$|\$2[aby]\$|\{SHA\})").unwrap());
static PRIVATE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-----BEGIN (RSA |EC |OPENSSH )?PRIVATE KEY-----").unwrap());

/// Paths that must not be served, with the fingerprint of their contents.
fn sensitive_paths() -> [(&'static str, &'static Regex); 6] {
    [
        ("/.env", &*DOTENV),
        ("/.git/config", &*GIT_CONFIG),
        ("/backup.sql", &*SQL_DUMP),
        ("/db.sql", &*SQL_DUMP),
        ("/.htpasswd", &*HTPASSWD),
        ("/id_rsa", &*PRIVATE_KEY),
    ]
}

/// Headers from `REQUIRED_HEADERS` absent in `response`. A CSP with
/// `frame-ancestors` stands in for X-Frame-Options.
pub fn missing_headers(response: &ProbeResponse) -> Vec<&'static str> {
    let csp = response.header("content-security-policy").unwrap_or_default();
    REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|name| response.header(name).is_none())
        .filter(|name| !(*name == "x-frame-options" && csp.contains("frame-ancestors")))
        .collect()
}

/// Cookie names paired with the protective attributes they lack.
pub fn weak_cookies(set_cookie: &str) -> Vec<(String, Vec<&'static str>)> {
    set_cookie
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.split(';').map(str::trim);
            let name = parts.next()?.split('=').next()?.to_string();
            let attributes: Vec<String> = parts.map(|p| p.to_ascii_lowercase()).collect();
            let has = |flag: &str| {
                attributes
                    .iter()
                    .any(|a| a == flag || a.starts_with(&format!("{}=", flag)))
            };
            let mut missing = Vec::new();
            if !has("httponly") {
                missing.push("HttpOnly");
            }
            if !has("secure") {
                missing.push("Secure");
            }
            if !has("samesite") {
                missing.push("SameSite");
            }
            (!missing.is_empty()).then_some((name, missing))
        })
        .collect()
}

pub async fn missing_security_headers(
    client: &dyn ProbeClient,
    _targets: &ProbeTargets,
) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let Some(response) = attempts.send(client, &ProbeRequest::get("/")).await else {
        return Ok(ProbeOutcome::unreachable());
    };

    let missing = missing_headers(&response);
    if missing.is_empty() {
        return Ok(ProbeOutcome::secure("security headers present"));
    }
    Ok(ProbeOutcome::vulnerable(
        format!("{} security header(s) missing", missing.len()),
        format!("missing: {}", missing.join(", ")),
        "Send Content-Security-Policy, X-Content-Type-Options: nosniff and X-Frame-Options on every response",
    ))
}

pub async fn cors_misconfiguration(
    client: &dyn ProbeClient,
    targets: &ProbeTargets,
) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();

    for path in ["/", targets.resource_path.as_str()] {
        let request = ProbeRequest::get(path).with_header("Origin", HOSTILE_ORIGIN);
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        let allowed = response.header("access-control-allow-origin").unwrap_or_default();
        let credentials = response
            .header("access-control-allow-credentials")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let reflected = allowed == HOSTILE_ORIGIN;
        let wildcard_with_credentials = allowed == "*" && credentials;
        if reflected || wildcard_with_credentials {
            return Ok(ProbeOutcome::vulnerable(
                format!("{} trusts arbitrary origins", path),
                format!(
                    "Access-Control-Allow-Origin: {}; Allow-Credentials: {}",
                    allowed, credentials
                ),
                "Restrict CORS to an explicit allow-list of trusted origins",
            ));
        }
    }

    Ok(attempts.conclude("hostile origin not trusted"))
}

pub async fn verbose_errors(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let requests = [
        ProbeRequest::get("/readyprobe-missing-route/%ff"),
        ProbeRequest::post(&targets.login_path)
            .with_header("Content-Type", "application/json")
            .with_body("{\"username\": "),
        ProbeRequest::get(&targets.resource_path).with_query("id", "[]"),
    ];

    for request in &requests {
        let Some(response) = attempts.send(client, request).await else {
            continue;
        };
        if let Some(found) = STACK_TRACE.find(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                format!("{} {} exposed internal error details", request.method, request.path),
                found.as_str(),
                "Return generic error bodies and log details server-side only",
            ));
        }
    }

    Ok(attempts.conclude("error responses are generic"))
}

pub async fn sensitive_files(client: &dyn ProbeClient, _targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let mut exposed = Vec::new();

    for (path, fingerprint) in sensitive_paths() {
        let Some(response) = attempts.send(client, &ProbeRequest::get(path)).await else {
            continue;
        };
        if response.is_success() && fingerprint.is_match(&response.body) {
            exposed.push(path);
        }
    }

    if exposed.is_empty() {
        return Ok(attempts.conclude("no sensitive files served"));
    }
    Ok(ProbeOutcome::vulnerable(
        format!("{} sensitive file(s) served", exposed.len()),
        exposed.join(", "),
        "Keep secrets, VCS metadata and backups out of the served document root",
    ))
}

pub async fn insecure_cookies(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let requests = [
        ProbeRequest::get("/"),
        ProbeRequest::post(&targets.login_path).with_json(&serde_json::json!({
            "username": "readyprobe",
            "password": "readyprobe",
        })),
    ];

    let mut findings = Vec::new();
    for request in &requests {
        let Some(response) = attempts.send(client, request).await else {
            continue;
        };
        if let Some(cookies) = response.header("set-cookie") {
            findings.extend(weak_cookies(cookies));
        }
    }

    if findings.is_empty() {
        return Ok(attempts.conclude("cookies carry protective attributes"));
    }
    let evidence = findings
        .iter()
        .map(|(name, missing)| format!("{} lacks {}", name, missing.join("/")))
        .collect::<Vec<_>>()
        .join("; ");
    Ok(ProbeOutcome::vulnerable(
        format!("{} cookie(s) without protective attributes", findings.len()),
        evidence,
        "Set HttpOnly, Secure and SameSite on session cookies",
    ))
}

pub async fn https_enforcement(client: &dyn ProbeClient, _targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let Some(response) = attempts.send(client, &ProbeRequest::get("/")).await else {
        return Ok(ProbeOutcome::unreachable());
    };

    if response.header("strict-transport-security").is_some() {
        return Ok(ProbeOutcome::secure("HSTS header present"));
    }
    let redirects_to_https = matches!(response.status, 301 | 302 | 307 | 308)
        && response
            .header("location")
            .is_some_and(|l| l.starts_with("https://"));
    if redirects_to_https {
        return Ok(ProbeOutcome::secure("plain requests redirected to https"));
    }
    Ok(ProbeOutcome::vulnerable(
        "transport security not enforced",
        format!("GET / -> {} without Strict-Transport-Security", response.status),
        "Redirect plain HTTP to HTTPS and send Strict-Transport-Security",
    ))
}

pub async fn server_banner(client: &dyn ProbeClient, _targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let Some(response) = attempts.send(client, &ProbeRequest::get("/")).await else {
        return Ok(ProbeOutcome::unreachable());
    };

    let banners: Vec<String> = ["server", "x-powered-by", "x-aspnet-version"]
        .iter()
        .filter_map(|name| {
            let value = response.header(name)?;
            VERSION_BANNER
                .is_match(value)
                .then(|| format!("{}: {}", name, value))
        })
        .collect();

    if banners.is_empty() {
        return Ok(ProbeOutcome::secure("no version banner disclosed"));
    }
    Ok(ProbeOutcome::vulnerable(
        "software versions disclosed in response headers",
        banners.join("; "),
        "Strip version numbers from Server and X-Powered-By headers",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vuln::checks::fake::{header, FakeTarget};
    use std::collections::HashMap;
    use std::time::Duration;

    fn response(headers: &[(&str, &str)]) -> ProbeResponse {
        ProbeResponse {
            status: 200,
            body: String::new(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_missing_headers() {
        assert_eq!(missing_headers(&response(&[])).len(), 3);
        let csp_only = response(&[
            ("content-security-policy", "default-src 'self'; frame-ancestors 'none'"),
            ("x-content-type-options", "nosniff"),
        ]);
        assert!(missing_headers(&csp_only).is_empty());
    }

    #[test]
    fn test_weak_cookies() {
        let header = "sid=abc; Path=/; HttpOnly; Secure; SameSite=Strict\nprefs=dark; Path=/";
        let weak = weak_cookies(header);
        assert_eq!(weak.len(), 1);
        assert_eq!(weak[0].0, "prefs");
        assert_eq!(weak[0].1, vec!["HttpOnly", "Secure", "SameSite"]);
    }

    #[tokio::test]
    async fn test_headers_probe() {
        let target = FakeTarget::new().route(|_| Some((200, vec![("X-Frame-Options", "DENY".to_string())], String::new())));
        let outcome = missing_security_headers(&target, &ProbeTargets::default())
            .await
            .unwrap();
        assert!(outcome.vulnerable);
        assert!(outcome.evidence.unwrap().contains("content-security-policy"));
    }

    #[tokio::test]
    async fn test_cors_reflection() {
        let target = FakeTarget::new().route(|req| {
            let origin = header(req, "Origin")?.to_string();
            Some((200, vec![("Access-Control-Allow-Origin", origin)], String::new()))
        });
        let outcome = cors_misconfiguration(&target, &ProbeTargets::default())
            .await
            .unwrap();
        assert!(outcome.vulnerable);
    }

    #[tokio::test]
    async fn test_plain_wildcard_cors_is_acceptable() {
        let target = FakeTarget::new()
            .route(|_| Some((200, vec![("Access-Control-Allow-Origin", "*".to_string())], String::new())));
        let outcome = cors_misconfiguration(&target, &ProbeTargets::default())
            .await
            .unwrap();
        assert!(!outcome.vulnerable);
    }

    #[tokio::test]
    async fn test_stack_trace_detected() {
        let target = FakeTarget::new().route(|req| {
            (req.path == "/api/auth/login").then(|| {
                (
                    500,
                    vec![],
                    "SyntaxError: Unexpected end of JSON input\n    at JSON.parse (<anonymous>)\n    at parse (/app/node_modules/body-parser/lib/types/json.js:89:19)".to_string(),
                )
            })
        });
        let outcome = verbose_errors(&target, &ProbeTargets::default()).await.unwrap();
        assert!(outcome.vulnerable);
    }

    #[tokio::test]
    async fn test_sensitive_files_need_fingerprint() {
        let target = FakeTarget::new().route(|req| match req.path.as_str() {
            "/.env" => Some((200, vec![], "DATABASE_URL=postgres://x\nSECRET=1".to_string())),
            "/.git/config" => Some((200, vec![], "<html>home</html>".to_string())),
            _ => None,
        });
        let outcome = sensitive_files(&target, &ProbeTargets::default()).await.unwrap();
        assert!(outcome.vulnerable);
        assert_eq!(outcome.evidence.as_deref(), Some("/.env"));
    }

    #[tokio::test]
    async fn test_hsts_or_redirect() {
        let hsts = FakeTarget::new().route(|_| {
            Some((200, vec![("Strict-Transport-Security", "max-age=63072000".to_string())], String::new()))
        });
        assert!(!https_enforcement(&hsts, &ProbeTargets::default()).await.unwrap().vulnerable);

        let redirect = FakeTarget::new().route(|_| {
            Some((301, vec![("Location", "https://fake/".to_string())], String::new()))
        });
        assert!(!https_enforcement(&redirect, &ProbeTargets::default()).await.unwrap().vulnerable);

        let plain = FakeTarget::new().route(|_| Some((200, vec![], String::new())));
        assert!(https_enforcement(&plain, &ProbeTargets::default()).await.unwrap().vulnerable);
    }

    #[tokio::test]
    async fn test_server_banner() {
        let target = FakeTarget::new().route(|_| {
            Some((200, vec![("Server", "nginx/1.18.0".to_string()), ("X-Powered-By", "Express".to_string())], String::new()))
        });
        let outcome = server_banner(&target, &ProbeTargets::default()).await.unwrap();
        assert!(outcome.vulnerable);
        assert_eq!(outcome.evidence.as_deref(), Some("server: nginx/1.18.0"));
    }

    #[tokio::test]
    async fn test_surface_probes_unreachable() {
        let target = FakeTarget::unreachable();
        let targets = ProbeTargets::default();
        assert!(!missing_security_headers(&target, &targets).await.unwrap().vulnerable);
        assert!(!https_enforcement(&target, &targets).await.unwrap().vulnerable);
        assert!(!insecure_cookies(&target, &targets).await.unwrap().vulnerable);
    }
}
