//! HTTP transport with a bounded wait.
//!
//! [`HttpClient::request_with_timeout`] races the request against a timer.
//! When the timer wins, the in-flight request future is dropped, which
//! aborts the connection at the transport level. The timer itself lives
//! inside the race and is dropped with it on every path (success, timeout,
//! or transport error), so nothing is left scheduled.
//!
//! The same bound is set as reqwest's per-request timeout, which keeps
//! running while the response body is read. A relay that sends headers and
//! then stalls still fails with [`HttpError::Timeout`].

use std::fmt;
use std::time::Duration;

use reqwest::{Method, Response};
use tracing::warn;

/// Client-side bound for relay calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(12_000);

/// User-facing text for [`HttpError::Timeout`]. Always carries a retry hint.
pub const TIMEOUT_MESSAGE: &str = "Request timeout. Please try again.";

// ---------------------------------------------------------------------------
// HttpError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum HttpError {
    /// The request did not settle within the bound and was aborted.
    Timeout { after: Duration },
    /// Any other transport failure; displayed verbatim.
    Network(reqwest::Error),
}

impl HttpError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// Classify a reqwest failure from a request bounded by `after`.
    pub fn from_reqwest(e: reqwest::Error, after: Duration) -> Self {
        if e.is_timeout() {
            HttpError::Timeout { after }
        } else {
            HttpError::Network(e)
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Timeout { .. } => f.write_str(TIMEOUT_MESSAGE),
            HttpError::Network(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpError::Timeout { .. } => None,
            HttpError::Network(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestOptions
// ---------------------------------------------------------------------------

/// Method, headers and body for one request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    /// `POST` with `Content-Type: application/json` and the given body.
    pub fn post_json(body: Vec<u8>) -> Self {
        Self::new(Method::POST)
            .header("Content-Type", "application/json")
            .body(body)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

// ---------------------------------------------------------------------------
// HttpClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Issue a request, aborting it if it has not produced a response
    /// within `timeout`.
    ///
    /// # Errors
    /// - [`HttpError::Timeout`] when the bound is exceeded.
    /// - [`HttpError::Network`] for every other transport failure, with the
    ///   underlying error preserved.
    pub async fn request_with_timeout(
        &self,
        url: &str,
        options: RequestOptions,
        timeout: Duration,
    ) -> Result<Response, HttpError> {
        let mut req = self.http.request(options.method, url).timeout(timeout);
        for (name, value) in options.headers {
            req = req.header(name, value);
        }
        if let Some(body) = options.body {
            req = req.body(body);
        }

        match tokio::time::timeout(timeout, req.send()).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(e)) => {
                let err = HttpError::from_reqwest(e, timeout);
                if err.is_timeout() {
                    warn!(url, timeout_ms = timeout.as_millis() as u64, "transport timeout");
                }
                Err(err)
            }
            Err(_elapsed) => {
                warn!(url, timeout_ms = timeout.as_millis() as u64, "request aborted after timeout");
                Err(HttpError::Timeout { after: timeout })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
