//! Correlation-id middleware.
//!
//! Reads `x-request-id` from the inbound request, or mints a UUID v4 when it
//! is absent or unusable. The id is stored as a [`RequestId`] extension,
//! written back onto the inbound headers, and stamped on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation id for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let id = incoming.unwrap_or_else(|| Uuid::new_v4().to_string());

    // Inbound ids that survive to_str() are visible ASCII, and UUIDs always
    // are, so this only fails for ids we would not want to echo anyway.
    let header = HeaderValue::from_str(&id).ok();
    if let Some(value) = &header {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }
    req.extensions_mut().insert(RequestId(id));

    let mut resp = next.run(req).await;
    if let Some(value) = header {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}
