//! `cm try-on`: pick a selfie from disk and run one apply-color attempt.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use cm_client::{
    apply_color, select_selfie, ApplyOutcome, ClientConfig, FileMediaSource, LogAlerts,
    SelectOutcome, TryOnSession,
};
use cm_core::{default_color, find_palette_color};
use tracing::info;

pub struct TryOnArgs {
    pub selfie: PathBuf,
    pub color: Option<String>,
    pub intensity: Option<f64>,
    pub mock: bool,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

pub async fn run(args: TryOnArgs) -> Result<()> {
    let mut config = ClientConfig::from_env().context("invalid client configuration")?;
    if args.mock {
        config.enable_mock = true;
    }
    if let Some(url) = args.base_url {
        config.relay_base_url = url;
    }
    if let Some(ms) = args.timeout_ms {
        config.request_timeout = Duration::from_millis(ms);
    }

    let color = match args.color.as_deref() {
        Some(name) => find_palette_color(name)
            .ok_or_else(|| anyhow!("unknown shade '{name}' (see `cm palette`)"))?,
        None => default_color(),
    };

    let mut session = TryOnSession::new(config.max_selfie_bytes);
    let alerts = LogAlerts;

    let media = FileMediaSource::new(args.selfie.clone());
    match select_selfie(&mut session, &media, &alerts).await {
        SelectOutcome::Accepted => {}
        SelectOutcome::Cancelled => bail!("no selfie selected"),
        SelectOutcome::Rejected(reason) => bail!("selfie rejected: {reason}"),
        SelectOutcome::Failed(err) => {
            return Err(err).with_context(|| format!("read selfie {}", args.selfie.display()))
        }
    }

    session.select_color(color);
    if let Some(v) = args.intensity {
        session.set_intensity(v);
    }

    let gateway = config.gateway();
    info!(gateway = gateway.name(), color = color.name, "running try-on");

    match apply_color(&mut session, gateway.as_ref(), &alerts).await {
        ApplyOutcome::Succeeded(result) => {
            println!("status=success");
            println!(
                "request_id={}",
                result.request_id.as_deref().unwrap_or("unknown")
            );
            println!("color={}", result.color.as_deref().unwrap_or(color.name));
            println!("intensity={}", session.state().intensity);
            if let Some(ms) = result.processing_ms {
                println!("processing_ms={ms}");
            }
            println!("image_url={}", result.image_url.as_deref().unwrap_or(""));
            if let Some(msg) = session.state().status_message() {
                println!("message={msg}");
            }
            Ok(())
        }
        ApplyOutcome::Failed(err) => bail!(
            "try-on failed: {} (request_id={})",
            err.message,
            err.request_id.as_deref().unwrap_or("unknown")
        ),
        ApplyOutcome::Rejected(reason) => bail!("try-on refused: {reason}"),
        ApplyOutcome::Busy(err) => bail!("try-on refused: {err}"),
    }
}
