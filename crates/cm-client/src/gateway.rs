//! Try-on gateway boundary.
//!
//! [`TryOnGateway`] is the seam between the orchestration layer and the
//! image service. [`HttpTryOnGateway`] talks to the relay; [`MockTryOnGateway`]
//! simulates it locally for offline development.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use cm_core::{TryOnRequestPayload, TryOnResult};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::{HttpClient, HttpError, RequestOptions, DEFAULT_TIMEOUT};

/// Header carrying the correlation id end to end.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum GatewayError {
    /// Transport failure or timeout.
    Http(HttpError),
    /// Non-success HTTP status; `message` is the extracted, non-empty text.
    Status { status: u16, message: String },
    /// A success response whose body is not JSON.
    Decode(String),
    /// The payload could not be encoded.
    Encode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Http(e) => write!(f, "{e}"),
            GatewayError::Status { message, .. } => f.write_str(message),
            GatewayError::Decode(msg) => write!(f, "invalid try-on response: {msg}"),
            GatewayError::Encode(msg) => write!(f, "could not encode try-on request: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HttpError> for GatewayError {
    fn from(e: HttpError) -> Self {
        GatewayError::Http(e)
    }
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Performs one try-on attempt.
///
/// Object-safe so callers can hold a `Box<dyn TryOnGateway>` chosen at
/// startup from configuration.
#[async_trait]
pub trait TryOnGateway: Send + Sync {
    /// Short identifier used in logs (e.g. `"http"`, `"mock"`).
    fn name(&self) -> &'static str;

    async fn perform_try_on(
        &self,
        payload: &TryOnRequestPayload,
    ) -> Result<TryOnResult, GatewayError>;
}

// ---------------------------------------------------------------------------
// HTTP gateway
// ---------------------------------------------------------------------------

/// Relay-backed gateway: `POST {base_url}/try-on`.
#[derive(Debug, Clone)]
pub struct HttpTryOnGateway {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl HttpTryOnGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(HttpClient::new(), base_url)
    }

    pub fn with_client(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/try-on", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TryOnGateway for HttpTryOnGateway {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn perform_try_on(
        &self,
        payload: &TryOnRequestPayload,
    ) -> Result<TryOnResult, GatewayError> {
        let body = serde_json::to_vec(payload).map_err(|e| GatewayError::Encode(e.to_string()))?;
        let options =
            RequestOptions::post_json(body).header(REQUEST_ID_HEADER, payload.request_id.as_str());

        let resp = self
            .http
            .request_with_timeout(&self.endpoint(), options, self.timeout)
            .await?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| HttpError::from_reqwest(e, self.timeout));
        if let Err(e) = &bytes {
            if e.is_timeout() {
                warn!(request_id = %payload.request_id, "try-on response body stalled");
            }
        }

        if !status.is_success() {
            // A stalled body is still a timeout; any other unreadable body is
            // treated like an unparsable one.
            let bytes = match bytes {
                Ok(b) => b,
                Err(e) if e.is_timeout() => return Err(e.into()),
                Err(_) => Default::default(),
            };
            let message = extract_error_message(status, &bytes);
            warn!(
                request_id = %payload.request_id,
                status = status.as_u16(),
                %message,
                "try-on rejected"
            );
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value =
            serde_json::from_slice(&bytes?).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let result = map_wire_response(&value);
        debug!(
            request_id = %payload.request_id,
            processing_ms = ?result.processing_ms,
            "try-on response mapped"
        );
        Ok(result)
    }
}

/// Human-readable text for a non-success response.
///
/// 1. A JSON body with a non-empty string `message` → that message.
/// 2. A JSON body without one → `Error {status}`.
/// 3. A body that is not JSON (or JSON `null`) → the status text, or
///    `Error {status}` when the status has no reason phrase.
pub fn extract_error_message(status: StatusCode, body: &[u8]) -> String {
    let generic = format!("Error {}", status.as_u16());
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Null) | Err(_) => status
            .canonical_reason()
            .filter(|r| !r.is_empty())
            .map_or(generic, str::to_string),
        Ok(v) => v
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map_or(generic, str::to_string),
    }
}

/// Rename wire fields to internal ones. Missing or mistyped fields become
/// `None`; this is renaming, not schema validation.
pub fn map_wire_response(v: &Value) -> TryOnResult {
    let text = |key: &str| v.get(key).and_then(Value::as_str).map(str::to_string);
    let processing_ms = v.get("processing_ms").and_then(|n| {
        n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        })
    });

    TryOnResult {
        image_url: text("image_url"),
        processing_ms,
        color: text("color"),
        request_id: text("request_id"),
    }
}

// ---------------------------------------------------------------------------
// Mock gateway
// ---------------------------------------------------------------------------

/// Offline gateway: waits `latency`, then echoes the request.
///
/// The "processed" image is a data URI of the submitted selfie.
#[derive(Debug, Clone)]
pub struct MockTryOnGateway {
    latency: Duration,
}

impl Default for MockTryOnGateway {
    fn default() -> Self {
        Self::new(Duration::from_millis(800))
    }
}

impl MockTryOnGateway {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TryOnGateway for MockTryOnGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn perform_try_on(
        &self,
        payload: &TryOnRequestPayload,
    ) -> Result<TryOnResult, GatewayError> {
        tokio::time::sleep(self.latency).await;
        Ok(TryOnResult {
            image_url: Some(format!("data:image/jpeg;base64,{}", payload.selfie)),
            processing_ms: Some(self.latency.as_millis() as u64),
            color: Some(payload.color.clone()),
            request_id: Some(payload.request_id.clone()),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
