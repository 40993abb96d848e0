//! Client configuration resolved from the environment.
//!
//! Read once at startup via [`ClientConfig::from_env`] and passed into
//! constructors; nothing else in the client calls `std::env::var`.

use std::time::Duration;

use anyhow::{Context, Result};
use cm_core::MAX_SELFIE_BYTES;

use crate::gateway::{HttpTryOnGateway, MockTryOnGateway, TryOnGateway};
use crate::http::DEFAULT_TIMEOUT;

pub const ENV_RELAY_BASE_URL: &str = "CM_RELAY_BASE_URL";
pub const ENV_ENABLE_MOCK: &str = "CM_ENABLE_MOCK";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "CM_REQUEST_TIMEOUT_MS";
pub const ENV_MAX_SELFIE_BYTES: &str = "CM_MAX_SELFIE_BYTES";

/// Android emulator loopback to a relay on the host machine.
pub const DEFAULT_RELAY_BASE_URL: &str = "http://10.0.2.2:3000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub relay_base_url: String,
    pub enable_mock: bool,
    pub request_timeout: Duration,
    pub max_selfie_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_base_url: DEFAULT_RELAY_BASE_URL.to_string(),
            enable_mock: false,
            request_timeout: DEFAULT_TIMEOUT,
            max_selfie_bytes: MAX_SELFIE_BYTES,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(url) = get(ENV_RELAY_BASE_URL) {
            cfg.relay_base_url = url;
        }
        cfg.enable_mock = get(ENV_ENABLE_MOCK).as_deref() == Some("true");
        if let Some(ms) = get(ENV_REQUEST_TIMEOUT_MS) {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("{ENV_REQUEST_TIMEOUT_MS} must be an integer, got '{ms}'"))?;
            cfg.request_timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = get(ENV_MAX_SELFIE_BYTES) {
            cfg.max_selfie_bytes = bytes.trim().parse().with_context(|| {
                format!("{ENV_MAX_SELFIE_BYTES} must be an integer, got '{bytes}'")
            })?;
        }

        Ok(cfg)
    }

    /// The gateway this configuration selects.
    pub fn gateway(&self) -> Box<dyn TryOnGateway> {
        if self.enable_mock {
            Box::new(MockTryOnGateway::default())
        } else {
            Box::new(
                HttpTryOnGateway::new(self.relay_base_url.clone())
                    .with_timeout(self.request_timeout),
            )
        }
    }
}
