//! Probe client: one timed HTTP exchange against the target service.

use async_trait::async_trait;
use readyprobe_common::{Error, Result};
use reqwest::Method;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One request to send to the target.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: Method,
    /// Path relative to the base address (e.g. "/api/users").
    pub path: String,
    /// Query parameters, encoded by the client.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ProbeRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a JSON body and the matching content type.
    pub fn with_json(self, body: &serde_json::Value) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }
}

/// A response received from the target.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    /// Header names are lowercased; repeated headers are joined with '\n'.
    pub headers: HashMap<String, String>,
    pub elapsed: Duration,
}

impl ProbeResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Why an exchange produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connect,
    Protocol,
}

/// A failed exchange. Returned as a value, never raised.
#[derive(Debug, Clone)]
pub struct ExchangeFailure {
    pub kind: FailureKind,
    pub message: String,
    pub elapsed: Duration,
}

/// Outcome of one exchange.
pub type Exchange = std::result::Result<ProbeResponse, ExchangeFailure>;

/// Elapsed time of an exchange, whether or not it produced a response.
pub fn elapsed_of(exchange: &Exchange) -> Duration {
    match exchange {
        Ok(response) => response.elapsed,
        Err(failure) => failure.elapsed,
    }
}

/// Trait for issuing requests against the target.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Perform one exchange.
    async fn send(&self, request: &ProbeRequest) -> Exchange;

    /// Base address requests are resolved against.
    fn base_url(&self) -> &str;
}

/// HTTP client backed by reqwest.
pub struct HttpProbeClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpProbeClient {
    /// Create a client for `base_url` with a per-call `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "target must be an http(s) URL: {}",
                base_url
            )));
        }

        // Redirects are surfaced to the probes rather than followed.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("readyprobe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url,
            timeout,
            client,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn send(&self, request: &ProbeRequest) -> Exchange {
        let url = self.url_for(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Err(classify_failure(&e, start.elapsed())),
        };

        let status = response.status().as_u16();
        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push('\n');
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(classify_failure(&e, start.elapsed())),
        };

        Ok(ProbeResponse {
            status,
            body,
            headers,
            elapsed: start.elapsed(),
        })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn classify_failure(error: &reqwest::Error, elapsed: Duration) -> ExchangeFailure {
    let kind = if error.is_timeout() {
        FailureKind::Timeout
    } else if error.is_connect() {
        FailureKind::Connect
    } else {
        FailureKind::Protocol
    };
    debug!("exchange failed ({:?}): {}", kind, error);
    ExchangeFailure {
        kind,
        message: "request failed".to_string(),
        elapsed,
    }
}
