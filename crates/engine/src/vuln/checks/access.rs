//! Authentication and authorization probes.

use super::{Attempts, PROTECTED_CONTENT, SESSION_ISSUED};
use crate::client::{ProbeClient, ProbeRequest};
use crate::vuln::{ProbeOutcome, ProbeTargets};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use readyprobe_common::Result;
use serde_json::{json, Value};
use tracing::debug;

/// Credential pairs that must never be accepted.
const WEAK_CREDENTIALS: &[(&str, &str)] = &[
    ("admin", "admin"),
    ("admin", "password"),
    ("admin", "123456"),
    ("root", "root"),
    ("test", "test"),
    ("user", "user"),
];

/// Identity headers some stacks trust blindly.
const SPOOFED_IDENTITY: &[(&str, &str)] = &[
    ("X-User-Id", "2"),
    ("X-Forwarded-User", "admin"),
    ("X-Original-User", "admin"),
];

/// Encode an unsigned token with the given header and claims.
fn encode_token(header: &Value, claims: &Value, signature: &str) -> Result<String> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    Ok(format!("{}.{}.{}", header, claims, signature))
}

/// Tokens no correctly configured verifier accepts.
pub fn forged_tokens() -> Result<Vec<(&'static str, String)>> {
    let claims = json!({
        "sub": "1",
        "role": "admin",
        "admin": true,
        "exp": 4_102_444_800u64,
    });
    Ok(vec![
        (
            "alg=none",
            encode_token(&json!({ "alg": "none", "typ": "JWT" }), &claims, "")?,
        ),
        (
            "bad signature",
            encode_token(
                &json!({ "alg": "HS256", "typ": "JWT" }),
                &claims,
                "cmVhZHlwcm9iZS1mb3JnZWQ",
            )?,
        ),
        (
            "expired",
            encode_token(
                &json!({ "alg": "none", "typ": "JWT" }),
                &json!({ "sub": "1", "role": "admin", "exp": 946_684_800u64 }),
                "",
            )?,
        ),
    ])
}

/// `path` with its trailing numeric segment incremented, if it has one.
pub fn neighbour_path(path: &str) -> Option<String> {
    let (prefix, last) = path.rsplit_once('/')?;
    let id: u64 = last.parse().ok()?;
    Some(format!("{}/{}", prefix, id.checked_add(1)?))
}

pub async fn forged_jwt(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();

    for (label, token) in forged_tokens()? {
        let request = ProbeRequest::get(&targets.admin_path)
            .with_header("Authorization", format!("Bearer {}", token));
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        debug!("forged token ({}) -> {}", label, response.status);
        if response.is_success() && PROTECTED_CONTENT.is_match(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                format!("{} accepted a forged token ({})", targets.admin_path, label),
                &response.body,
                "Verify token signatures with a pinned algorithm and reject alg=none and expired tokens",
            ));
        }
    }

    Ok(attempts.conclude("forged tokens rejected"))
}

pub async fn missing_authentication(
    client: &dyn ProbeClient,
    targets: &ProbeTargets,
) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();

    for path in [&targets.admin_path, &targets.resource_path] {
        let Some(response) = attempts.send(client, &ProbeRequest::get(path)).await else {
            continue;
        };
        if response.is_success() && PROTECTED_CONTENT.is_match(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                format!("{} served protected data without credentials", path),
                &response.body,
                "Require authentication on every endpoint that returns user or admin data",
            ));
        }
    }

    Ok(attempts.conclude("protected endpoints refused anonymous access"))
}

pub async fn idor(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let Some(neighbour) = neighbour_path(&targets.resource_path) else {
        return Ok(ProbeOutcome::secure(format!(
            "{} has no numeric identifier to enumerate",
            targets.resource_path
        )));
    };

    for (name, value) in SPOOFED_IDENTITY {
        let request = ProbeRequest::get(&neighbour).with_header(*name, *value);
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        if response.is_success() && PROTECTED_CONTENT.is_match(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                format!("{} served another user's record when {} was set", neighbour, name),
                &response.body,
                "Authorize every object access against the authenticated principal, not client headers",
            ));
        }
    }

    Ok(attempts.conclude("neighbouring records were not served to a spoofed identity"))
}

pub async fn brute_force(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();
    let mut rejected = 0u32;

    for attempt in 0..targets.brute_force_attempts {
        let request = ProbeRequest::post(&targets.login_path).with_json(&json!({
            "username": "admin",
            "password": format!("readyprobe-wrong-{}", attempt),
        }));
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        match response.status {
            429 | 423 => {
                return Ok(ProbeOutcome::secure(format!(
                    "login throttled after {} attempt(s)",
                    attempt + 1
                )));
            }
            404 | 405 if attempt == 0 => {
                return Ok(ProbeOutcome::secure(format!(
                    "no login endpoint at {}",
                    targets.login_path
                )));
            }
            _ => rejected += 1,
        }
    }

    if attempts.answered() == 0 {
        return Ok(ProbeOutcome::unreachable());
    }
    if rejected < targets.brute_force_attempts {
        return Ok(ProbeOutcome::secure(format!(
            "only {} of {} attempts answered",
            rejected, targets.brute_force_attempts
        )));
    }
    Ok(ProbeOutcome::vulnerable(
        format!("{} failed logins accepted without throttling", rejected),
        format!("POST {} x{} never returned 429 or 423", targets.login_path, rejected),
        "Rate-limit authentication attempts and lock accounts after repeated failures",
    ))
}

pub async fn weak_credentials(client: &dyn ProbeClient, targets: &ProbeTargets) -> Result<ProbeOutcome> {
    let mut attempts = Attempts::default();

    for (username, password) in WEAK_CREDENTIALS {
        let request = ProbeRequest::post(&targets.login_path)
            .with_json(&json!({ "username": username, "password": password }));
        let Some(response) = attempts.send(client, &request).await else {
            continue;
        };
        if response.status == 429 {
            break;
        }
        if response.is_success() && SESSION_ISSUED.is_match(&response.body) {
            return Ok(ProbeOutcome::vulnerable(
                format!("default credential {}/{} accepted", username, password),
                format!("{}:{} -> {}", username, password, response.status),
                "Remove default accounts and enforce a password policy",
            ));
        }
    }

    Ok(attempts.conclude("common credentials rejected"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vuln::checks::fake::{header, FakeTarget};

    const USERS: &str = r#"[{"id":1,"email":"alice@example.com","role":"admin"}]"#;

    #[test]
    fn test_forged_tokens_shape() {
        let tokens = forged_tokens().unwrap();
        assert_eq!(tokens.len(), 3);
        let (_, none) = &tokens[0];
        let parts: Vec<&str> = none.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], "");
        let header = URL_SAFE_NO_PAD.decode(parts[0]).unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&header).unwrap()["alg"],
            "none"
        );
    }

    #[test]
    fn test_neighbour_path() {
        assert_eq!(neighbour_path("/api/users/1").as_deref(), Some("/api/users/2"));
        assert_eq!(neighbour_path("/api/users/me"), None);
        assert_eq!(neighbour_path("42"), None);
    }

    #[tokio::test]
    async fn test_forged_token_accepted() {
        let target = FakeTarget::new().route(|req| {
            header(req, "Authorization")
                .is_some()
                .then(|| (200, vec![], USERS.to_string()))
        });
        let outcome = forged_jwt(&target, &ProbeTargets::default()).await.unwrap();
        assert!(outcome.vulnerable);
        assert!(outcome.details.contains("alg=none"));
    }

    #[tokio::test]
    async fn test_plain_ok_without_protected_content_is_not_a_finding() {
        let target = FakeTarget::new().route(|_| Some((200, vec![], "{\"status\":\"ok\"}".to_string())));
        let targets = ProbeTargets::default();
        assert!(!forged_jwt(&target, &targets).await.unwrap().vulnerable);
        assert!(!missing_authentication(&target, &targets).await.unwrap().vulnerable);
        assert!(!idor(&target, &targets).await.unwrap().vulnerable);
    }

    #[tokio::test]
    async fn test_anonymous_admin_listing() {
        let target = FakeTarget::new().route(|req| {
            (req.path == "/api/admin/users").then(|| (200, vec![], USERS.to_string()))
        });
        let outcome = missing_authentication(&target, &ProbeTargets::default())
            .await
            .unwrap();
        assert!(outcome.vulnerable);
    }

    #[tokio::test]
    async fn test_idor_with_spoofed_header() {
        let target = FakeTarget::new().route(|req| {
            (req.path == "/api/users/2" && header(req, "X-User-Id").is_some())
                .then(|| (200, vec![], r#"{"id":2,"email":"bob@example.com"}"#.to_string()))
        });
        let outcome = idor(&target, &ProbeTargets::default()).await.unwrap();
        assert!(outcome.vulnerable);
    }

    #[tokio::test]
    async fn test_brute_force_throttled() {
        let count = std::sync::atomic::AtomicU32::new(0);
        let target = FakeTarget::new().route(move |_| {
            let n = count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Some((if n >= 4 { 429 } else { 401 }, vec![], String::new()))
        });
        let outcome = brute_force(&target, &ProbeTargets::default()).await.unwrap();
        assert!(!outcome.vulnerable);
        assert!(outcome.details.contains("throttled after 5"));
    }

    #[tokio::test]
    async fn test_brute_force_unthrottled() {
        let target = FakeTarget::new().route(|_| Some((401, vec![], String::new())));
        let outcome = brute_force(&target, &ProbeTargets::default()).await.unwrap();
        assert!(outcome.vulnerable);
        assert_eq!(target.requests(), 10);
    }

    #[tokio::test]
    async fn test_brute_force_without_login_endpoint() {
        let target = FakeTarget::new();
        let outcome = brute_force(&target, &ProbeTargets::default()).await.unwrap();
        assert!(!outcome.vulnerable);
        assert_eq!(target.requests(), 1);
    }

    #[tokio::test]
    async fn test_weak_credentials_accepted() {
        let target = FakeTarget::new().route(|req| {
            let body = req.body.as_deref().unwrap_or_default();
            body.contains("\"password\":\"admin\"")
                .then(|| (200, vec![], r#"{"token":"abc"}"#.to_string()))
        });
        let outcome = weak_credentials(&target, &ProbeTargets::default())
            .await
            .unwrap();
        assert!(outcome.vulnerable);
        assert!(outcome.details.contains("admin/admin"));
    }
}
