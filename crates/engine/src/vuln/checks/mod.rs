//! Built-in probe checks, grouped by the surface they exercise.

pub mod access;
pub mod injection;
pub mod surface;

use super::ProbeOutcome;
use crate::client::{ProbeClient, ProbeRequest, ProbeResponse};
use regex::Regex;
use std::sync::LazyLock;

/// Body markers of records that must not be served to anonymous callers.
pub(crate) static PROTECTED_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"(email|role|roles|users|password|password_hash|ssn|token|admin|is_admin)"\s*:"#)
        .unwrap()
});

/// Body markers of an issued session or token.
pub(crate) static SESSION_ISSUED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"(token|access_token|id_token|session|session_id|jwt)"\s*:\s*"[^"]+""#)
        .unwrap()
});

/// Tracks whether the target answered at least one request of a probe.
#[derive(Debug, Default)]
pub(crate) struct Attempts {
    answered: usize,
}

impl Attempts {
    /// Send `request`; `None` if the exchange produced no response.
    pub(crate) async fn send(
        &mut self,
        client: &dyn ProbeClient,
        request: &ProbeRequest,
    ) -> Option<ProbeResponse> {
        let response = client.send(request).await.ok()?;
        self.answered += 1;
        Some(response)
    }

    pub(crate) fn answered(&self) -> usize {
        self.answered
    }

    /// Outcome for a probe whose signal never showed up.
    pub(crate) fn conclude(&self, details: impl Into<String>) -> ProbeOutcome {
        if self.answered == 0 {
            ProbeOutcome::unreachable()
        } else {
            ProbeOutcome::secure(details)
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Route-table fake target shared by the check tests.

    use crate::client::{Exchange, ExchangeFailure, FailureKind, ProbeClient, ProbeRequest, ProbeResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    type Handler = Box<dyn Fn(&ProbeRequest) -> Option<(u16, Vec<(&'static str, String)>, String)> + Send + Sync>;

    /// Answers requests with the first matching handler, 404 otherwise.
    pub struct FakeTarget {
        handlers: Vec<Handler>,
        pub seen: Mutex<Vec<ProbeRequest>>,
        unreachable: bool,
    }

    impl FakeTarget {
        pub fn new() -> Self {
            Self {
                handlers: Vec::new(),
                seen: Mutex::new(Vec::new()),
                unreachable: false,
            }
        }

        pub fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Self::new()
            }
        }

        pub fn route<F>(mut self, handler: F) -> Self
        where
            F: Fn(&ProbeRequest) -> Option<(u16, Vec<(&'static str, String)>, String)>
                + Send
                + Sync
                + 'static,
        {
            self.handlers.push(Box::new(handler));
            self
        }

        pub fn requests(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProbeClient for FakeTarget {
        async fn send(&self, request: &ProbeRequest) -> Exchange {
            self.seen.lock().unwrap().push(request.clone());
            if self.unreachable {
                return Err(ExchangeFailure {
                    kind: FailureKind::Connect,
                    message: "request failed".to_string(),
                    elapsed: Duration::from_millis(1),
                });
            }
            let (status, headers, body) = self
                .handlers
                .iter()
                .find_map(|handler| handler(request))
                .unwrap_or((404, Vec::new(), String::new()));
            let mut map: HashMap<String, String> = HashMap::new();
            for (name, value) in headers {
                map.entry(name.to_ascii_lowercase())
                    .and_modify(|existing| {
                        existing.push('\n');
                        existing.push_str(&value);
                    })
                    .or_insert(value);
            }
            Ok(ProbeResponse {
                status,
                body,
                headers: map,
                elapsed: Duration::from_millis(1),
            })
        }

        fn base_url(&self) -> &str {
            "http://fake"
        }
    }

    /// Value of query parameter `key`, if present.
    pub fn query<'a>(request: &'a ProbeRequest, key: &str) -> Option<&'a str> {
        request
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of request header `name`, case-insensitive.
    pub fn header<'a>(request: &'a ProbeRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_content_markers() {
        assert!(PROTECTED_CONTENT.is_match(r#"[{"id":1,"email":"a@b.c"}]"#));
        assert!(PROTECTED_CONTENT.is_match(r#"{"Role" : "admin"}"#));
        assert!(!PROTECTED_CONTENT.is_match(r#"{"status":"ok"}"#));
        assert!(!PROTECTED_CONTENT.is_match("email me"));
    }

    #[test]
    fn test_session_issued_markers() {
        assert!(SESSION_ISSUED.is_match(r#"{"access_token":"abc.def"}"#));
        assert!(!SESSION_ISSUED.is_match(r#"{"token":""}"#));
        assert!(!SESSION_ISSUED.is_match(r#"{"error":"invalid credentials"}"#));
    }

    #[tokio::test]
    async fn test_attempts_conclude_unreachable() {
        let target = fake::FakeTarget::unreachable();
        let mut attempts = Attempts::default();
        assert!(attempts.send(&target, &ProbeRequest::get("/")).await.is_none());
        assert_eq!(attempts.answered(), 0);
        assert!(attempts.conclude("clean").details.contains("unreachable"));
    }
}
