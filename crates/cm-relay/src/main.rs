//! cm-relay entry point.
//!
//! Sets up tracing, resolves configuration, wires CORS around the router, and
//! serves until Ctrl-C. Request tracing is part of `routes::build_router`.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use cm_relay::{config::RelayConfig, request_id::REQUEST_ID_HEADER, routes, state};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = RelayConfig::from_env().context("invalid relay configuration")?;
    let addr = config.bind_addr;
    let cors = cors_from_config(&config);
    info!(
        engine_url = %config.engine_url,
        upstream_timeout_ms = config.upstream_timeout.as_millis() as u64,
        "relay configured"
    );

    let shared = Arc::new(state::AppState::new(config)?);

    let app = routes::build_router(Arc::clone(&shared)).layer(cors);

    info!("cm-relay listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS from `ALLOWED_ORIGIN`: unset or `*` allows any origin.
fn cors_from_config(config: &RelayConfig) -> CorsLayer {
    let allow_origin = match &config.allowed_origins {
        Some(list) if !list.iter().any(|o| o == "*") => {
            let origins: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!(origin = %o, "ignoring unusable CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        }
        _ => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([REQUEST_ID_HEADER])
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
