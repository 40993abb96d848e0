//! Relay configuration resolved from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const ENV_RELAY_ADDR: &str = "CM_RELAY_ADDR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ENGINE_URL: &str = "ML_API_URL";
pub const ENV_ALLOWED_ORIGIN: &str = "ALLOWED_ORIGIN";
pub const ENV_UPSTREAM_TIMEOUT_MS: &str = "CM_UPSTREAM_TIMEOUT_MS";

pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8000/try-on";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_millis(25_000);
/// Request bodies above this are refused before they reach a handler.
pub const BODY_LIMIT_BYTES: usize = 6 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
    /// Full URL of the engine's try-on endpoint.
    pub engine_url: String,
    /// CORS allow-list; `None` allows any origin.
    pub allowed_origins: Option<Vec<String>>,
    pub upstream_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            allowed_origins: None,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            body_limit_bytes: BODY_LIMIT_BYTES,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self::default();

        if let Some(addr) = get(ENV_RELAY_ADDR) {
            cfg.bind_addr = addr
                .parse()
                .with_context(|| format!("{ENV_RELAY_ADDR} is not a socket address: '{addr}'"))?;
        } else if let Some(port) = get(ENV_PORT) {
            let port: u16 = port
                .parse()
                .with_context(|| format!("{ENV_PORT} is not a port number: '{port}'"))?;
            cfg.bind_addr.set_port(port);
        }

        if let Some(url) = get(ENV_ENGINE_URL) {
            cfg.engine_url = url;
        }

        cfg.allowed_origins = get(ENV_ALLOWED_ORIGIN).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect()
        });

        if let Some(ms) = get(ENV_UPSTREAM_TIMEOUT_MS) {
            let ms: u64 = ms.parse().with_context(|| {
                format!("{ENV_UPSTREAM_TIMEOUT_MS} must be an integer, got '{ms}'")
            })?;
            cfg.upstream_timeout = Duration::from_millis(ms);
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(pairs: &[(&str, &str)]) -> Result<RelayConfig> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        RelayConfig::from_lookup(|k| map.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn defaults() {
        let cfg = resolve(&[]).unwrap();
        assert_eq!(cfg, RelayConfig::default());
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.upstream_timeout, Duration::from_secs(25));
        assert_eq!(cfg.body_limit_bytes, 6 * 1024 * 1024);
    }

    #[test]
    fn port_only_keeps_wildcard_host() {
        let cfg = resolve(&[(ENV_PORT, "8080")]).unwrap();
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
    }

    #[test]
    fn explicit_addr_wins_over_port() {
        let cfg = resolve(&[(ENV_RELAY_ADDR, "127.0.0.1:9000"), (ENV_PORT, "8080")]).unwrap();
        assert_eq!(cfg.bind_addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let cfg = resolve(&[(ENV_ALLOWED_ORIGIN, "https://a.example, https://b.example,,")]).unwrap();
        assert_eq!(
            cfg.allowed_origins,
            Some(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }

    #[test]
    fn engine_url_and_timeout_overrides() {
        let cfg = resolve(&[
            (ENV_ENGINE_URL, "http://ml:8000/try-on"),
            (ENV_UPSTREAM_TIMEOUT_MS, "1500"),
        ])
        .unwrap();
        assert_eq!(cfg.engine_url, "http://ml:8000/try-on");
        assert_eq!(cfg.upstream_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(resolve(&[(ENV_PORT, "http")]).is_err());
        assert!(resolve(&[(ENV_RELAY_ADDR, "nowhere")]).is_err());
        assert!(resolve(&[(ENV_UPSTREAM_TIMEOUT_MS, "-1")]).is_err());
    }
}
