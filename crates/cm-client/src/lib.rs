//! cm-client
//!
//! Async side of the try-on client: the timeout-bounded HTTP transport, the
//! relay gateway (plus an offline mock), the media-source capability, and
//! the session flows that drive `cm-core`'s state machine across the
//! network boundary.

pub mod config;
pub mod gateway;
pub mod http;
pub mod media;
pub mod session;

pub use config::ClientConfig;
pub use gateway::{
    extract_error_message, map_wire_response, GatewayError, HttpTryOnGateway, MockTryOnGateway,
    TryOnGateway,
};
pub use http::{HttpClient, HttpError, RequestOptions};
pub use media::{FileMediaSource, MediaError, MediaSource};
pub use session::{
    apply_color, select_selfie, AlertSink, ApplyOutcome, LogAlerts, SelectOutcome, TryOnSession,
};
