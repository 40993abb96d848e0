//! Request and response types for the relay's HTTP endpoints.
//!
//! No business logic lives here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// /api/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// /api/try-on
// ---------------------------------------------------------------------------

/// Body forwarded to the image engine.
///
/// `selfie` and `color` are passed through untouched; fields the client
/// omitted stay omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selfie: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,
    pub intensity: Value,
    pub request_id: String,
}

/// Every relay-origin failure, sent with HTTP 500.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub request_id: String,
}
