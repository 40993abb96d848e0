//! Shared runtime state for cm-relay.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The relay keeps no
//! per-request state of its own; this is configuration plus the pooled
//! upstream HTTP client.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::RelayConfig;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub build: BuildInfo,
    pub config: RelayConfig,
    /// Connection-pooled client for the image engine.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build upstream http client")?;

        Ok(Self {
            build: BuildInfo {
                service: "cm-relay",
                version: env!("CARGO_PKG_VERSION"),
            },
            config,
            http,
        })
    }
}
