//! Axum router and HTTP handlers for cm-relay.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! CORS. Request-id stamping, request tracing, the body limit and the
//! security headers are applied here. The trace layer sits inside the
//! request-id layer so every request span carries the `request_id` field.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, DefaultBodyLimit, Extension, State},
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Number, Value};
use tower_http::{
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, info_span, warn, Level, Span};

use crate::{
    api_types::{EngineRequest, ErrorEnvelope, HealthResponse},
    request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER},
    state::AppState,
};

pub const INTERNAL_ERROR_CODE: &str = "INTERNAL_ERROR";
/// The only failure text a client ever sees from the relay.
pub const INTERNAL_ERROR_MESSAGE: &str = "There was a problem processing your request.";
pub const DEFAULT_INTENSITY: i64 = 50;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete relay router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/try-on", post(try_on))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

/// Span for one HTTP request. Runs after the request-id middleware, so the
/// extension is always present on routed requests.
pub fn request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(RequestId::as_str)
        .unwrap_or("-");
    info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %request_id,
    )
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /api/try-on
// ---------------------------------------------------------------------------

pub(crate) async fn try_on(
    State(st): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = request_id.0;

    let body = match body {
        Ok(b) => b,
        Err(rejection) => {
            warn!(request_id = %request_id, error = %rejection, "try-on body rejected");
            return internal_error(&request_id);
        }
    };

    let fields = match parse_body(&body) {
        Ok(map) => map,
        Err(err) => {
            warn!(request_id = %request_id, error = %err, "try-on body is not a JSON object");
            return internal_error(&request_id);
        }
    };

    let forward = EngineRequest {
        selfie: fields.get("selfie").cloned(),
        color: fields.get("color").cloned(),
        intensity: normalize_intensity(fields.get("intensity")),
        request_id: request_id.clone(),
    };
    info!(
        request_id = %request_id,
        color = ?forward.color,
        intensity = %forward.intensity,
        "forwarding try-on to engine"
    );

    let sent = st
        .http
        .post(&st.config.engine_url)
        .header(REQUEST_ID_HEADER, request_id.as_str())
        .timeout(st.config.upstream_timeout)
        .json(&forward)
        .send()
        .await;

    let resp = match sent {
        Ok(r) => r,
        Err(err) => {
            error!(request_id = %request_id, error = %err, timeout = err.is_timeout(), "engine call failed");
            return internal_error(&request_id);
        }
    };

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        error!(
            request_id = %request_id,
            status = status.as_u16(),
            detail = %detail,
            "engine returned an error"
        );
        return internal_error(&request_id);
    }

    match resp.bytes().await {
        Ok(payload) => {
            info!(request_id = %request_id, bytes = payload.len(), "engine responded");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                payload,
            )
                .into_response()
        }
        Err(err) => {
            error!(request_id = %request_id, error = %err, "engine response body unreadable");
            internal_error(&request_id)
        }
    }
}

/// Empty bodies count as `{}`; anything other than a JSON object is refused.
fn parse_body(body: &[u8]) -> Result<Map<String, Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::de::Error::custom(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Numeric coercion of the client's intensity with falsy inputs defaulting.
///
/// Missing, `null`, `false`, `0` and `""` become [`DEFAULT_INTENSITY`].
/// Numeric strings are parsed. Values with no numeric reading become `null`.
pub fn normalize_intensity(raw: Option<&Value>) -> Value {
    let n = match raw {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Value::from(DEFAULT_INTENSITY),
        Some(Value::Bool(true)) => 1.0,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => f,
            None => return Value::Null,
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if s.is_empty() {
                return Value::from(DEFAULT_INTENSITY);
            }
            if trimmed.is_empty() {
                0.0
            } else {
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => f,
                    _ => return Value::Null,
                }
            }
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => return Value::Null,
    };

    if n == 0.0 && !matches!(raw, Some(Value::String(_))) {
        return Value::from(DEFAULT_INTENSITY);
    }
    number_value(n)
}

fn number_value(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn internal_error(request_id: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorEnvelope {
            code: INTERNAL_ERROR_CODE.to_string(),
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            request_id: request_id.to_string(),
        }),
    )
        .into_response()
}
